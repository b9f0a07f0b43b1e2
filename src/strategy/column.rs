//! `column` strategy: cover the whole answer column.
//!
//! The bar is centred on the mark when one is found, and on a fixed fraction
//! of the page width otherwise. Less precise than `replicate`, but it does not
//! depend on finding option markers.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{MaskOp, MaskRect, PagePlan};
use super::{MaskMode, MaskStrategy};
use crate::blob::{BlobLocalizer, BlobOptions};
use crate::segment::{ColorRange, ColorSegmenter};

const DEFAULT_X_PERCENT: f32 = 82.0;
const DEFAULT_WIDTH: u32 = 120;
const DEFAULT_TOP_PERCENT: f32 = 20.0;
const DEFAULT_BOTTOM_PERCENT: f32 = 65.0;

/// Vertical bar placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOptions {
    /// Fallback bar centre as a percentage of page width
    pub x_perc: f32,
    /// Bar width in pixels
    pub width: u32,
    /// Bar top as a percentage of page height
    pub top_perc: f32,
    /// Bar bottom as a percentage of page height
    pub bottom_perc: f32,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            x_perc: DEFAULT_X_PERCENT,
            width: DEFAULT_WIDTH,
            top_perc: DEFAULT_TOP_PERCENT,
            bottom_perc: DEFAULT_BOTTOM_PERCENT,
        }
    }
}

impl ColumnOptions {
    /// Bar rectangle for a page, centred at `center_x`
    pub fn bar(&self, center_x: f32, width: u32, height: u32) -> Option<MaskRect> {
        let x1 = (center_x - self.width as f32 / 2.0).round() as i64;
        let y1 = (height as f32 * self.top_perc / 100.0).round() as i64;
        let y2 = (height as f32 * self.bottom_perc / 100.0).round() as i64 - 1;
        MaskRect::clipped(x1, y1, x1 + self.width as i64 - 1, y2, width, height)
    }

    /// Bar centre when no mark is found
    pub fn fallback_x(&self, width: u32) -> f32 {
        width as f32 * self.x_perc / 100.0
    }
}

/// Whole-column masking
#[derive(Debug, Clone)]
pub struct ColumnStrategy {
    pub color: ColorRange,
    pub blob: BlobOptions,
    pub column: ColumnOptions,
}

impl MaskStrategy for ColumnStrategy {
    fn mode(&self) -> MaskMode {
        MaskMode::Column
    }

    fn plan(&self, image: &RgbImage) -> PagePlan {
        let (width, height) = image.dimensions();
        let mask = ColorSegmenter::segment(image, &self.color);

        let center_x = match BlobLocalizer::largest(&mask, self.blob.min_area) {
            Some(blob) => {
                debug!(?blob, "column centred on mark");
                blob.center_x()
            }
            None => {
                let x = self.column.fallback_x(width);
                debug!(x, "no mark, column at fallback position");
                x
            }
        };

        PagePlan::Ops(
            self.column
                .bar(center_x, width, height)
                .map(MaskOp::Rect)
                .into_iter()
                .collect(),
        )
    }
}
