//! answer-mask - hide the marked answers in scanned multiple-choice exams
//!
//! Exam PDFs with the correct option marked in colour (usually green) are
//! turned into practice copies: each page is rasterized, the mark is located,
//! and a black box is painted so the page no longer tells which option is
//! right.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`segment`] | HSV colour segmentation of the mark |
//! | [`blob`] | Bounding boxes of connected mark regions |
//! | [`lines`] | Edge and line-segment detection for strokes |
//! | [`anchor`] | Option marker (circle) detection |
//! | [`strategy`] | The three masking policies and their dispatcher |
//! | [`document`] | PDF rasterization, parallel masking, PDF output |
//! | [`pairing`] | Question / answer-key file pairing |
//! | [`deck`] | Flashcard images, manifest and Anki package |
//! | [`config`] | TOML configuration and CLI overrides |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use answer_mask::{Dispatcher, MaskConfig, MaskStrategy};
//!
//! let page = image::open("page_004.png").unwrap().to_rgb8();
//! let masked = Dispatcher::new(&MaskConfig::default()).apply(&page);
//! masked.image.save("page_004_masked.png").unwrap();
//! ```

pub mod anchor;
pub mod blob;
pub mod cli;
pub mod config;
pub mod deck;
pub mod document;
pub mod lines;
pub mod pairing;
pub mod progress;
pub mod segment;
pub mod strategy;

// Re-exports for convenience
pub use anchor::{Anchor, AnchorLocator, AnchorOptions, AnchorOptionsBuilder};
pub use blob::{Blob, BlobLocalizer, BlobOptions};
pub use cli::{exit_codes, Cli, Commands, DeckArgs, MaskArgs, PairsArgs};
pub use config::{CliOverrides, ConfigError, DeckConfig, MaskConfig, RunConfig};
pub use deck::{
    write_package, Card, DeckBuilder, DeckError, DeckManifest, APKG_FILE, MANIFEST_FILE,
};
pub use document::{
    list_images, DocumentError, JobReport, MaskJob, PageRaster, PageReport, PdfAssembler,
    PdfRasterizer,
};
pub use lines::{LineDetector, LineOptions, LineSegment};
pub use pairing::{guess_skip, ExamPair, NameMatcher, PairingError, PairingResult};
pub use progress::{OutputMode, ProcessingStage, ProgressCallback, SilentProgress};
pub use segment::{ColorRange, ColorRangeBuilder, ColorSegmenter};
pub use strategy::{
    composite, ColumnOptions, ColumnStrategy, Dispatcher, GreenStrategy, MaskMode, MaskOp,
    MaskRect, MaskStrategy, MaskedPage, PageOutcome, PagePlan, ReplicateOptions,
    ReplicateStrategy, SkipReason,
};
