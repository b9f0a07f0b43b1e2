//! Common types for the document module

use image::RgbImage;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::strategy::{MaskMode, PageOutcome};

/// Document processing error types
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Required tool not found: {0}")]
    ToolNotFound(&'static str),

    #[error("Failed to read PDF: {0}")]
    PdfRead(#[from] lopdf::Error),

    #[error("Rasterization failed: {0}")]
    RasterizeFailed(String),

    #[error("Failed to write PDF: {0}")]
    PdfWrite(String),

    #[error("No pages to process")]
    NoPages,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// One rendered page, tagged with its 1-based position in the source
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub index: usize,
    pub image: RgbImage,
}

/// Per-page entry of a [`JobReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub index: usize,
    pub outcome: PageOutcome,
}

/// Summary of one masking run
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub input: PathBuf,
    pub mode: MaskMode,
    pub dpi: u32,
    pub output_pdf: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub pages: Vec<PageReport>,
}

impl JobReport {
    pub fn total(&self) -> usize {
        self.pages.len()
    }

    pub fn masked_count(&self) -> usize {
        self.pages.iter().filter(|p| p.outcome.is_masked()).count()
    }

    pub fn untouched_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.outcome == PageOutcome::Untouched)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.outcome.skip_reason().is_some())
            .count()
    }

    /// Pretty JSON form, written by `--report`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
