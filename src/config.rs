//! Configuration module
//!
//! Run-scoped settings, loaded once and passed down explicitly.
//!
//! # Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config <path>`, else `./answer-mask.toml`, else
//!    `<config dir>/answer-mask/config.toml`
//! 3. Command-line overrides ([`CliOverrides`])
//!
//! The merged result is validated before any page is touched.
//!
//! # Example file
//!
//! ```toml
//! dpi = 220
//! skip_pages = 3
//!
//! [mask]
//! mode = "replicate"
//!
//! [mask.color]
//! h_low = 35
//! h_high = 85
//!
//! [mask.replicate]
//! expand = 1.4
//! x_shift = -4
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::anchor::{AnchorOptions, MAX_RADIUS_LIMIT};
use crate::blob::BlobOptions;
use crate::lines::LineOptions;
use crate::segment::{ColorRange, HUE_MAX};
use crate::strategy::{ColumnOptions, MaskMode, ReplicateOptions};

// ============================================================
// Constants
// ============================================================

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "answer-mask.toml";

/// Sub-directory of the user config dir
pub const CONFIG_DIR_NAME: &str = "answer-mask";

/// Default rasterization DPI for masking
pub const DEFAULT_DPI: u32 = 220;

/// Default rasterization DPI for flashcards
pub const DEFAULT_DECK_DPI: u32 = 300;

/// Cover pages skipped per exam when building flashcards
pub const DEFAULT_DECK_SKIP: usize = 3;

/// Default flashcard deck name
pub const DEFAULT_DECK_NAME: &str = "Exams";

/// Anki deck id; keep it stable so re-imports update the same deck
pub const DEFAULT_DECK_ID: i64 = 2025102309;

// ============================================================
// Error Types
// ============================================================

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid hue range: low {low} > high {high}")]
    HueRange { low: u8, high: u8 },

    #[error("Invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.into(),
    }
}

// ============================================================
// Mask Config
// ============================================================

/// Everything the masking core needs for one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub mode: MaskMode,
    pub color: ColorRange,
    pub blob: BlobOptions,
    pub lines: LineOptions,
    pub anchor: AnchorOptions,
    pub replicate: ReplicateOptions,
    pub column: ColumnOptions,
}

impl MaskConfig {
    /// Check every bound, naming the first one that is wrong
    pub fn validate(&self) -> Result<()> {
        let c = &self.color;
        if c.h_high > HUE_MAX {
            return Err(invalid("color.h_high", format!("{} exceeds {}", c.h_high, HUE_MAX)));
        }
        if c.h_low > c.h_high {
            return Err(ConfigError::HueRange {
                low: c.h_low,
                high: c.h_high,
            });
        }

        let l = &self.lines;
        if !(l.canny_low >= 0.0 && l.canny_low < l.canny_high) {
            return Err(invalid(
                "lines.canny_low",
                format!("must be >= 0 and below canny_high ({} vs {})", l.canny_low, l.canny_high),
            ));
        }
        if l.thickness == 0 {
            return Err(invalid("lines.thickness", "must be at least 1"));
        }
        if l.vote_threshold == 0 {
            return Err(invalid("lines.vote_threshold", "must be at least 1"));
        }

        let a = &self.anchor;
        if !(a.dp >= 1.0) {
            return Err(invalid("anchor.dp", format!("must be >= 1.0, got {}", a.dp)));
        }
        if !(a.min_dist >= 0.0) {
            return Err(invalid("anchor.min_dist", format!("must be >= 0, got {}", a.min_dist)));
        }
        if !(a.param1 > 0.0) {
            return Err(invalid("anchor.param1", format!("must be > 0, got {}", a.param1)));
        }
        if a.max_radius > MAX_RADIUS_LIMIT {
            return Err(invalid(
                "anchor.max_radius",
                format!("must be at most {}, got {}", MAX_RADIUS_LIMIT, a.max_radius),
            ));
        }
        if a.min_radius > a.max_radius {
            return Err(invalid(
                "anchor.min_radius",
                format!("{} exceeds max_radius {}", a.min_radius, a.max_radius),
            ));
        }
        if a.max_anchors == 0 {
            return Err(invalid("anchor.max_anchors", "must be at least 1"));
        }

        let r = &self.replicate;
        if !(r.expand > 0.0) {
            return Err(invalid("replicate.expand", format!("must be > 0, got {}", r.expand)));
        }
        if r.min_anchors > a.max_anchors {
            return Err(invalid(
                "replicate.min_anchors",
                format!("{} exceeds anchor.max_anchors {}", r.min_anchors, a.max_anchors),
            ));
        }

        let col = &self.column;
        for (field, value) in [
            ("column.x_perc", col.x_perc),
            ("column.top_perc", col.top_perc),
            ("column.bottom_perc", col.bottom_perc),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(field, format!("{} is outside 0-100", value)));
            }
        }
        if col.top_perc >= col.bottom_perc {
            return Err(invalid(
                "column.top_perc",
                format!("{} is not above bottom_perc {}", col.top_perc, col.bottom_perc),
            ));
        }
        if col.width == 0 {
            return Err(invalid("column.width", "must be at least 1"));
        }

        Ok(())
    }
}

// ============================================================
// Deck Config
// ============================================================

/// Flashcard building settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Deck name written to the manifest and the Anki package
    pub name: String,
    /// Anki deck id
    pub deck_id: i64,
    /// Rasterization DPI for card images
    pub dpi: u32,
    /// Leading pages skipped when no override matches
    pub default_skip: usize,
    /// Title substring -> pages to skip
    pub skip_overrides: BTreeMap<String, usize>,
    /// Lowest filename similarity accepted as a pair
    pub min_similarity: f64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DECK_NAME.to_string(),
            deck_id: DEFAULT_DECK_ID,
            dpi: DEFAULT_DECK_DPI,
            default_skip: DEFAULT_DECK_SKIP,
            skip_overrides: BTreeMap::new(),
            min_similarity: 0.3,
        }
    }
}

// ============================================================
// Run Config
// ============================================================

/// File-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Rasterization DPI
    pub dpi: u32,
    /// Leading pages left out of the output
    pub skip_pages: usize,
    /// Worker threads (None = all cores)
    pub threads: Option<usize>,
    /// Write per-page masked PNGs next to the PDF
    pub save_images: bool,
    pub mask: MaskConfig,
    pub deck: DeckConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            skip_pages: 0,
            threads: None,
            save_images: true,
            mask: MaskConfig::default(),
            deck: DeckConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load from the first config file found, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Candidate config file locations, in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Load from a specific TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line overrides on top of this config
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> RunConfig {
        let mut merged = self.clone();

        if let Some(dpi) = cli.dpi {
            merged.dpi = dpi;
        }
        if let Some(skip) = cli.skip_pages {
            merged.skip_pages = skip;
        }
        if cli.threads.is_some() {
            merged.threads = cli.threads;
        }
        if let Some(save) = cli.save_images {
            merged.save_images = save;
        }

        let mask = &mut merged.mask;
        if let Some(mode) = cli.mode {
            mask.mode = mode;
        }
        if let Some(v) = cli.h_low {
            mask.color.h_low = v;
        }
        if let Some(v) = cli.h_high {
            mask.color.h_high = v;
        }
        if let Some(v) = cli.s_low {
            mask.color.s_low = v;
        }
        if let Some(v) = cli.v_low {
            mask.color.v_low = v;
        }
        if let Some(v) = cli.min_area {
            mask.blob.min_area = v;
        }
        if let Some(v) = cli.canny_low {
            mask.lines.canny_low = v;
        }
        if let Some(v) = cli.canny_high {
            mask.lines.canny_high = v;
        }
        if let Some(v) = cli.line_thickness {
            mask.lines.thickness = v;
        }
        if let Some(v) = cli.expand {
            mask.replicate.expand = v;
        }
        if let Some(v) = cli.x_shift {
            mask.replicate.x_shift = v;
        }
        if let Some(v) = cli.y_shift {
            mask.replicate.y_shift = v;
        }
        if let Some(v) = cli.min_anchors {
            mask.replicate.min_anchors = v;
        }
        if let Some(v) = cli.max_anchors {
            mask.anchor.max_anchors = v;
        }
        if let Some(v) = cli.col_x_perc {
            mask.column.x_perc = v;
        }
        if let Some(v) = cli.col_width {
            mask.column.width = v;
        }
        if let Some(v) = cli.col_top_perc {
            mask.column.top_perc = v;
        }
        if let Some(v) = cli.col_bot_perc {
            mask.column.bottom_perc = v;
        }

        merged
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 {
            return Err(invalid("dpi", "must be at least 1"));
        }
        if self.deck.dpi == 0 {
            return Err(invalid("deck.dpi", "must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(invalid("threads", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.deck.min_similarity) {
            return Err(invalid(
                "deck.min_similarity",
                format!("must be within 0-1, got {}", self.deck.min_similarity),
            ));
        }
        self.mask.validate()
    }

    /// JSON form, embedded in run reports
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dpi: Option<u32>,
    pub skip_pages: Option<usize>,
    pub threads: Option<usize>,
    pub save_images: Option<bool>,
    pub mode: Option<MaskMode>,
    pub h_low: Option<u8>,
    pub h_high: Option<u8>,
    pub s_low: Option<u8>,
    pub v_low: Option<u8>,
    pub min_area: Option<u32>,
    pub canny_low: Option<f32>,
    pub canny_high: Option<f32>,
    pub line_thickness: Option<u32>,
    pub expand: Option<f32>,
    pub x_shift: Option<i32>,
    pub y_shift: Option<i32>,
    pub min_anchors: Option<usize>,
    pub max_anchors: Option<usize>,
    pub col_x_perc: Option<f32>,
    pub col_width: Option<u32>,
    pub col_top_perc: Option<f32>,
    pub col_bot_perc: Option<f32>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}
