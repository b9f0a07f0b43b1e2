//! PDF page rendering through poppler's `pdftoppm`

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use super::types::{DocumentError, PageRaster, Result};

/// External renderer binary
pub const PDFTOPPM: &str = "pdftoppm";

/// Renders PDF pages to RGB rasters
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    dpi: u32,
    tool: PathBuf,
}

impl PdfRasterizer {
    /// Locate `pdftoppm` on `PATH`
    pub fn new(dpi: u32) -> Result<Self> {
        let tool = which::which(PDFTOPPM).map_err(|_| DocumentError::ToolNotFound(PDFTOPPM))?;
        Ok(Self { dpi, tool })
    }

    pub fn is_available() -> bool {
        which::which(PDFTOPPM).is_ok()
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Number of pages in a PDF
    pub fn page_count(pdf: &Path) -> Result<usize> {
        if !pdf.exists() {
            return Err(DocumentError::InputNotFound(pdf.to_path_buf()));
        }
        let doc = lopdf::Document::load(pdf)?;
        Ok(doc.get_pages().len())
    }

    /// Render every page after the first `skip_pages`.
    ///
    /// Returns an empty list when the skip covers the whole document.
    pub fn rasterize(&self, pdf: &Path, skip_pages: usize) -> Result<Vec<PageRaster>> {
        let total = Self::page_count(pdf)?;
        if skip_pages >= total {
            warn!(pdf = %pdf.display(), total, skip_pages, "no pages left after skip");
            return Ok(Vec::new());
        }

        let work = tempfile::tempdir()?;
        let prefix = work.path().join("page");
        let output = Command::new(&self.tool)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg("-f")
            .arg((skip_pages + 1).to_string())
            .arg(pdf)
            .arg(&prefix)
            .output()?;

        if !output.status.success() {
            return Err(DocumentError::RasterizeFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mut pages = Vec::with_capacity(total - skip_pages);
        for entry in std::fs::read_dir(work.path())? {
            let path = entry?.path();
            let Some(index) = rendered_page_index(&path) else {
                continue;
            };
            let image = image::open(&path)?.to_rgb8();
            debug!(index, width = image.width(), height = image.height(), "page rendered");
            pages.push(PageRaster { index, image });
        }
        pages.sort_by_key(|p| p.index);

        if pages.is_empty() {
            return Err(DocumentError::RasterizeFailed(format!(
                "{} produced no images for {}",
                PDFTOPPM,
                pdf.display()
            )));
        }
        Ok(pages)
    }
}

/// Page number from a `pdftoppm` output name such as `page-007.png`
fn rendered_page_index(path: &Path) -> Option<usize> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_page_index() {
        assert_eq!(rendered_page_index(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(rendered_page_index(Path::new("page-007.png")), Some(7));
        assert_eq!(rendered_page_index(Path::new("page-12.ppm")), None);
        assert_eq!(rendered_page_index(Path::new("cover.png")), None);
    }

    #[test]
    fn test_page_count_missing_file() {
        let result = PdfRasterizer::page_count(Path::new("/nonexistent/exam.pdf"));
        assert!(matches!(result, Err(DocumentError::InputNotFound(_))));
    }

    #[test]
    fn test_page_count_invalid_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(
            PdfRasterizer::page_count(&path),
            Err(DocumentError::PdfRead(_))
        ));
    }
}
