//! Document module
//!
//! Drives a masking run over whole documents: renders PDF pages with
//! `pdftoppm`, masks them in parallel and rebuilds a PDF from the result.
//!
//! # Example
//!
//! ```rust,no_run
//! use answer_mask::{MaskJob, RunConfig, SilentProgress};
//! use std::path::Path;
//!
//! let job = MaskJob::new(RunConfig::default());
//! let report = job
//!     .run(Path::new("exam.pdf"), Path::new("out"), &SilentProgress)
//!     .unwrap();
//! println!("{} of {} pages masked", report.masked_count(), report.total());
//! ```

mod assemble;
mod job;
mod rasterize;
mod types;

pub use assemble::PdfAssembler;
pub use job::{list_images, MaskJob, IMAGE_DIR_NAME};
pub use rasterize::{PdfRasterizer, PDFTOPPM};
pub use types::{DocumentError, JobReport, PageRaster, PageReport, Result};
