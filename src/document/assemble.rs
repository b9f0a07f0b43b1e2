//! Rebuilds a PDF from page rasters with `printpdf`

use image::RgbImage;
use printpdf::{ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument, Px};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use super::types::{DocumentError, Result};

const MM_PER_INCH: f32 = 25.4;
const LAYER_NAME: &str = "page";

/// Writes one PDF page per raster at a fixed DPI
#[derive(Debug, Clone)]
pub struct PdfAssembler {
    dpi: u32,
    title: String,
}

impl PdfAssembler {
    pub fn new(dpi: u32, title: impl Into<String>) -> Self {
        Self {
            dpi,
            title: title.into(),
        }
    }

    /// Physical page size in millimetres for a raster of `width` x `height` pixels
    pub fn page_size_mm(width: u32, height: u32, dpi: u32) -> (f32, f32) {
        let scale = MM_PER_INCH / dpi as f32;
        (width as f32 * scale, height as f32 * scale)
    }

    pub fn write(&self, pages: &[&RgbImage], path: &Path) -> Result<()> {
        let (first, rest) = pages.split_first().ok_or(DocumentError::NoPages)?;

        let (w, h) = Self::page_size_mm(first.width(), first.height(), self.dpi);
        let (doc, page, layer) = PdfDocument::new(&self.title, Mm(w), Mm(h), LAYER_NAME);
        self.place(first, doc.get_page(page).get_layer(layer));

        for image in rest {
            let (w, h) = Self::page_size_mm(image.width(), image.height(), self.dpi);
            let (page, layer) = doc.add_page(Mm(w), Mm(h), LAYER_NAME);
            self.place(image, doc.get_page(page).get_layer(layer));
        }

        let mut writer = BufWriter::new(File::create(path)?);
        doc.save(&mut writer)
            .map_err(|e| DocumentError::PdfWrite(e.to_string()))?;
        debug!(path = %path.display(), pages = pages.len(), "pdf written");
        Ok(())
    }

    fn place(&self, image: &RgbImage, layer: printpdf::PdfLayerReference) {
        let xobject = ImageXObject {
            width: Px(image.width() as usize),
            height: Px(image.height() as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: image.as_raw().clone(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };
        Image::from(xobject).add_to_layer(
            layer,
            ImageTransform {
                dpi: Some(self.dpi as f32),
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfRasterizer;
    use image::Rgb;

    #[test]
    fn test_page_size_mm() {
        let (w, h) = PdfAssembler::page_size_mm(1700, 2200, 200);
        assert!((w - 215.9).abs() < 0.01);
        assert!((h - 279.4).abs() < 0.01);
    }

    #[test]
    fn test_write_empty_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = PdfAssembler::new(100, "empty").write(&[], &dir.path().join("out.pdf"));
        assert!(matches!(result, Err(DocumentError::NoPages)));
    }

    #[test]
    fn test_write_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let a = RgbImage::from_pixel(120, 160, Rgb([255, 255, 255]));
        let b = RgbImage::from_pixel(160, 120, Rgb([0, 0, 0]));

        PdfAssembler::new(100, "test").write(&[&a, &b], &path).unwrap();

        assert!(path.exists());
        assert_eq!(PdfRasterizer::page_count(&path).unwrap(), 2);
    }
}
