//! Progress reporting for masking runs.
//!
//! The document driver reports stages and per-page events through
//! [`ProgressCallback`]; the binary renders them, tests use [`SilentProgress`].

use std::fmt;

use crate::strategy::SkipReason;

/// Processing stages of a masking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    #[default]
    Initializing,
    /// Rendering PDF pages to images
    Rasterizing,
    /// Applying the masking strategy
    Masking,
    /// Writing per-page PNGs
    WritingImages,
    /// Rebuilding the PDF
    WritingPdf,
    Completed,
}

impl ProcessingStage {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "Initializing",
            ProcessingStage::Rasterizing => "Rasterizing",
            ProcessingStage::Masking => "Masking",
            ProcessingStage::WritingImages => "WritingImages",
            ProcessingStage::WritingPdf => "WritingPdf",
            ProcessingStage::Completed => "Completed",
        }
    }

    /// Short human description
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "preparing",
            ProcessingStage::Rasterizing => "rendering pages",
            ProcessingStage::Masking => "masking answers",
            ProcessingStage::WritingImages => "saving page images",
            ProcessingStage::WritingPdf => "building PDF",
            ProcessingStage::Completed => "done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Errors only
    Quiet,
    /// Stages and summary
    #[default]
    Normal,
    /// Page-level progress
    Verbose,
    /// Everything, including per-page detections
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from `-v` count and `--quiet`
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return OutputMode::Quiet;
        }
        match verbose {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Default `tracing` filter directive for this mode
    pub fn log_directive(&self) -> &'static str {
        match self {
            OutputMode::Quiet => "warn",
            OutputMode::Normal => "info",
            OutputMode::Verbose => "debug",
            OutputMode::VeryVerbose => "trace",
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

/// Receiver of run progress events.
///
/// Called from worker threads during masking, hence `Sync`.
pub trait ProgressCallback: Sync {
    /// A new stage started; `total` is the number of pages it covers
    fn on_stage(&self, stage: ProcessingStage, total: usize);

    /// One more page finished in the current stage
    fn on_page(&self, page_index: usize);

    /// A page was passed through unmodified
    fn on_skip(&self, page_index: usize, reason: &SkipReason);
}

/// Progress callback that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_stage(&self, _stage: ProcessingStage, _total: usize) {}
    fn on_page(&self, _page_index: usize) {}
    fn on_skip(&self, _page_index: usize, _reason: &SkipReason) {}
}
