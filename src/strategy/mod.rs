//! Masking Strategy module
//!
//! Turns one page raster into a masked copy using one of three policies,
//! chosen once per run:
//!
//! - **green** ([`GreenStrategy`]) - cover every coloured mark wherever it is
//! - **column** ([`ColumnStrategy`]) - cover the whole answer column
//! - **replicate** ([`ReplicateStrategy`], default) - cover the mark's column
//!   on every option row found on the page
//!
//! Each strategy is a pure `page -> plan` function. A page either gets masked,
//! is left untouched because there was nothing to cover, or is skipped with a
//! reason when detection falls short. Skips never abort a run.
//!
//! # Example
//!
//! ```rust,no_run
//! use answer_mask::{Dispatcher, MaskConfig, MaskStrategy};
//!
//! let page = image::open("page_004.png").unwrap().to_rgb8();
//! let dispatcher = Dispatcher::new(&MaskConfig::default());
//! let masked = dispatcher.apply(&page);
//! println!("{:?}", masked.outcome);
//! ```

mod column;
mod green;
mod replicate;
mod types;

use clap::ValueEnum;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::MaskConfig;

// Re-export public API
pub use column::{ColumnOptions, ColumnStrategy};
pub use green::GreenStrategy;
pub use replicate::{replicate_boxes, ReplicateOptions, ReplicateStrategy, MIN_BOX_SIDE};
pub use types::{composite, MaskOp, MaskRect, MaskedPage, PageOutcome, PagePlan, SkipReason, MASK_COLOR};

/// Masking policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MaskMode {
    /// Cover every coloured mark
    Green,
    /// Cover the whole answer column
    Column,
    /// Cover the mark's column on every option row
    #[default]
    Replicate,
}

impl MaskMode {
    pub fn name(&self) -> &'static str {
        match self {
            MaskMode::Green => "green",
            MaskMode::Column => "column",
            MaskMode::Replicate => "replicate",
        }
    }
}

impl fmt::Display for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Page masking policy: raster in, masked raster out
pub trait MaskStrategy {
    /// Policy implemented by this strategy
    fn mode(&self) -> MaskMode;

    /// Decide what to cover on a page
    fn plan(&self, image: &RgbImage) -> PagePlan;

    /// Plan and composite onto a copy of the page
    fn apply(&self, image: &RgbImage) -> MaskedPage {
        MaskedPage::from_plan(image, self.plan(image))
    }
}

/// Strategy selected for a run
#[derive(Debug, Clone)]
pub enum Dispatcher {
    Green(GreenStrategy),
    Column(ColumnStrategy),
    Replicate(ReplicateStrategy),
}

impl Dispatcher {
    /// Build the strategy named by `config.mode`
    pub fn new(config: &MaskConfig) -> Self {
        match config.mode {
            MaskMode::Green => Dispatcher::Green(GreenStrategy {
                color: config.color,
                blob: config.blob,
                lines: config.lines,
            }),
            MaskMode::Column => Dispatcher::Column(ColumnStrategy {
                color: config.color,
                blob: config.blob,
                column: config.column,
            }),
            MaskMode::Replicate => Dispatcher::Replicate(ReplicateStrategy {
                color: config.color,
                blob: config.blob,
                anchor: config.anchor,
                replicate: config.replicate,
            }),
        }
    }

    fn strategy(&self) -> &dyn MaskStrategy {
        match self {
            Dispatcher::Green(s) => s,
            Dispatcher::Column(s) => s,
            Dispatcher::Replicate(s) => s,
        }
    }
}

impl MaskStrategy for Dispatcher {
    fn mode(&self) -> MaskMode {
        self.strategy().mode()
    }

    fn plan(&self, image: &RgbImage) -> PagePlan {
        self.strategy().plan(image)
    }
}
