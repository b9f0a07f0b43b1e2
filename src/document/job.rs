//! Masking job: rasterize, mask in parallel, write images and PDF.

use image::RgbImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::assemble::PdfAssembler;
use super::rasterize::PdfRasterizer;
use super::types::{DocumentError, JobReport, PageRaster, PageReport, Result};
use crate::config::RunConfig;
use crate::progress::{ProcessingStage, ProgressCallback};
use crate::strategy::{Dispatcher, MaskStrategy};

/// Sub-directory for per-page PNGs
pub const IMAGE_DIR_NAME: &str = "masked_images";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Masked page ready for output
#[derive(Debug, Clone)]
struct MaskedRaster {
    index: usize,
    name: String,
    image: RgbImage,
    report: PageReport,
}

/// One masking run over a PDF or an image directory
#[derive(Debug, Clone)]
pub struct MaskJob {
    config: RunConfig,
    dispatcher: Dispatcher,
}

impl MaskJob {
    /// Build a job from a validated configuration
    pub fn new(config: RunConfig) -> Self {
        let dispatcher = Dispatcher::new(&config.mask);
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Mask a PDF into `<output_dir>/<stem>_masked.pdf`
    pub fn run(
        &self,
        input: &Path,
        output_dir: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<JobReport> {
        progress.on_stage(ProcessingStage::Initializing, 0);
        if !input.exists() {
            return Err(DocumentError::InputNotFound(input.to_path_buf()));
        }

        progress.on_stage(ProcessingStage::Rasterizing, 0);
        info!(input = %input.display(), dpi = self.config.dpi, skip = self.config.skip_pages, "rasterizing");
        let rasterizer = PdfRasterizer::new(self.config.dpi)?;
        let pages = rasterizer.rasterize(input, self.config.skip_pages)?;

        let named = pages
            .into_iter()
            .map(|page| (format!("page_{:03}_masked.png", page.index), page))
            .collect();
        self.finish(input, named, output_dir, progress)
    }

    /// Mask every PNG/JPEG in `input_dir`, in file name order
    pub fn mask_images(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<JobReport> {
        progress.on_stage(ProcessingStage::Initializing, 0);
        let paths = list_images(input_dir)?;
        progress.on_stage(ProcessingStage::Rasterizing, paths.len());

        let mut named = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            let image = image::open(path)?.to_rgb8();
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("page_{:03}", i + 1));
            named.push((
                format!("{}_masked.png", stem),
                PageRaster {
                    index: i + 1,
                    image,
                },
            ));
            progress.on_page(i + 1);
        }
        self.finish(input_dir, named, output_dir, progress)
    }

    /// Apply the strategy to every page on the job's thread pool.
    ///
    /// Output order follows input order.
    pub fn mask_pages(
        &self,
        pages: &[PageRaster],
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<(RgbImage, PageReport)>> {
        progress.on_stage(ProcessingStage::Masking, pages.len());
        info!(pages = pages.len(), mode = %self.dispatcher.mode(), "masking");

        let threads = self.config.threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

        let results: Vec<(RgbImage, PageReport)> = pool.install(|| {
            pages
                .par_iter()
                .map(|page| {
                    let masked = self.dispatcher.apply(&page.image);
                    match masked.outcome.skip_reason() {
                        Some(reason) => {
                            warn!(page = page.index, %reason, "page left unmasked");
                            progress.on_skip(page.index, &reason);
                        }
                        None => debug!(page = page.index, outcome = ?masked.outcome, "page done"),
                    }
                    progress.on_page(page.index);
                    (
                        masked.image,
                        PageReport {
                            index: page.index,
                            outcome: masked.outcome,
                        },
                    )
                })
                .collect()
        });
        Ok(results)
    }

    fn finish(
        &self,
        input: &Path,
        named: Vec<(String, PageRaster)>,
        output_dir: &Path,
        progress: &dyn ProgressCallback,
    ) -> Result<JobReport> {
        if named.is_empty() {
            return Err(DocumentError::NoPages);
        }
        let (names, pages): (Vec<String>, Vec<PageRaster>) = named.into_iter().unzip();

        let masked: Vec<MaskedRaster> = self
            .mask_pages(&pages, progress)?
            .into_iter()
            .zip(names)
            .map(|((image, report), name)| MaskedRaster {
                index: report.index,
                name,
                image,
                report,
            })
            .collect();
        drop(pages);

        std::fs::create_dir_all(output_dir)?;

        let image_dir = if self.config.save_images {
            let dir = output_dir.join(IMAGE_DIR_NAME);
            std::fs::create_dir_all(&dir)?;
            progress.on_stage(ProcessingStage::WritingImages, masked.len());
            for page in &masked {
                page.image.save(dir.join(&page.name))?;
                progress.on_page(page.index);
            }
            info!(dir = %dir.display(), "page images written");
            Some(dir)
        } else {
            None
        };

        progress.on_stage(ProcessingStage::WritingPdf, masked.len());
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let pdf_path = output_dir.join(format!("{}_masked.pdf", stem));
        let images: Vec<&RgbImage> = masked.iter().map(|p| &p.image).collect();
        PdfAssembler::new(self.config.dpi, stem).write(&images, &pdf_path)?;
        info!(pdf = %pdf_path.display(), "masked PDF written");

        progress.on_stage(ProcessingStage::Completed, masked.len());
        Ok(JobReport {
            input: input.to_path_buf(),
            mode: self.dispatcher.mode(),
            dpi: self.config.dpi,
            output_pdf: Some(pdf_path),
            image_dir,
            pages: masked.into_iter().map(|p| p.report).collect(),
        })
    }
}

/// Page images in a directory, sorted by file name
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DocumentError::InputNotFound(dir.to_path_buf()));
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}
