//! `green` strategy: cover every coloured mark wherever it is.
//!
//! Each blob above the area threshold is filled, and straight strokes found on
//! the colour mask are painted with a thick line so thin checkmarks are
//! fully covered as well.

use image::RgbImage;
use tracing::debug;

use super::types::{MaskOp, MaskRect, PagePlan};
use super::MaskStrategy;
use super::MaskMode;
use crate::blob::{BlobLocalizer, BlobOptions};
use crate::lines::{LineDetector, LineOptions};
use crate::segment::{ColorRange, ColorSegmenter};

/// Layout-independent colour masking
#[derive(Debug, Clone)]
pub struct GreenStrategy {
    pub color: ColorRange,
    pub blob: BlobOptions,
    pub lines: LineOptions,
}

impl MaskStrategy for GreenStrategy {
    fn mode(&self) -> MaskMode {
        MaskMode::Green
    }

    fn plan(&self, image: &RgbImage) -> PagePlan {
        let (width, height) = image.dimensions();
        let mask = ColorSegmenter::segment(image, &self.color);

        let blobs = BlobLocalizer::find_all(&mask, self.blob.min_area);
        let segments = LineDetector::detect(&mask, &self.lines);
        debug!(blobs = blobs.len(), segments = segments.len(), "green detections");

        // Box corners are drawn inclusive of x + w and y + h
        let mut ops: Vec<MaskOp> = blobs
            .iter()
            .filter_map(|b| {
                MaskRect::clipped(
                    b.x as i64,
                    b.y as i64,
                    (b.x + b.width) as i64,
                    (b.y + b.height) as i64,
                    width,
                    height,
                )
            })
            .map(MaskOp::Rect)
            .collect();

        ops.extend(segments.into_iter().map(|segment| MaskOp::Stroke {
            segment,
            thickness: self.lines.thickness,
        }));

        PagePlan::Ops(ops)
    }
}
