//! `replicate` strategy: mask the mark's column on every option row.
//!
//! The mark tells us the answer column; the option circles tell us where the
//! rows are. One box the size of the (expanded) mark is stamped at the mark's
//! x on each row, so the page no longer reveals which row was marked.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{MaskOp, MaskRect, PagePlan, SkipReason};
use super::{MaskMode, MaskStrategy};
use crate::anchor::{Anchor, AnchorLocator, AnchorOptions};
use crate::blob::{Blob, BlobLocalizer, BlobOptions};
use crate::segment::{ColorRange, ColorSegmenter};

const DEFAULT_EXPAND: f32 = 1.2;
const DEFAULT_MIN_ANCHORS: usize = 3;

/// Smallest masking box side (pixels)
pub const MIN_BOX_SIDE: u32 = 16;

/// Box sizing and placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateOptions {
    /// Scale factor applied to the mark's box
    pub expand: f32,
    /// Horizontal shift of every box (pixels)
    pub x_shift: i32,
    /// Vertical shift of every box (pixels)
    pub y_shift: i32,
    /// Anchors required before anything is masked
    pub min_anchors: usize,
}

impl Default for ReplicateOptions {
    fn default() -> Self {
        Self {
            expand: DEFAULT_EXPAND,
            x_shift: 0,
            y_shift: 0,
            min_anchors: DEFAULT_MIN_ANCHORS,
        }
    }
}

impl ReplicateOptions {
    /// Expanded box size for a mark, never below 16x16
    pub fn box_size(&self, blob: &Blob) -> (u32, u32) {
        let w = (blob.width as f32 * self.expand).round() as u32;
        let h = (blob.height as f32 * self.expand).round() as u32;
        (w.max(MIN_BOX_SIDE), h.max(MIN_BOX_SIDE))
    }
}

/// One box per anchor row at the mark's column, clipped to the raster
pub fn replicate_boxes(
    blob: &Blob,
    anchors: &[Anchor],
    options: &ReplicateOptions,
    dimensions: (u32, u32),
) -> Vec<MaskRect> {
    let (width, height) = dimensions;
    let (box_w, box_h) = options.box_size(blob);
    let cx = blob.center_x() + options.x_shift as f32;

    anchors
        .iter()
        .filter_map(|anchor| {
            let cy = anchor.y + options.y_shift as f32;
            MaskRect::centered(cx, cy, box_w, box_h, width, height)
        })
        .collect()
}

/// Mark replication across option rows
#[derive(Debug, Clone)]
pub struct ReplicateStrategy {
    pub color: ColorRange,
    pub blob: BlobOptions,
    pub anchor: AnchorOptions,
    pub replicate: ReplicateOptions,
}

impl MaskStrategy for ReplicateStrategy {
    fn mode(&self) -> MaskMode {
        MaskMode::Replicate
    }

    fn plan(&self, image: &RgbImage) -> PagePlan {
        let mask = ColorSegmenter::segment(image, &self.color);

        let Some(blob) = BlobLocalizer::largest(&mask, self.blob.min_area) else {
            return PagePlan::Skip(SkipReason::MarkNotFound);
        };

        let anchors = AnchorLocator::locate(image, &self.anchor);
        debug!(?blob, anchors = anchors.len(), "replicate detections");

        if anchors.len() < self.replicate.min_anchors {
            return PagePlan::Skip(SkipReason::InsufficientAnchors {
                found: anchors.len(),
                required: self.replicate.min_anchors,
            });
        }

        PagePlan::Ops(
            replicate_boxes(&blob, &anchors, &self.replicate, image.dimensions())
                .into_iter()
                .map(MaskOp::Rect)
                .collect(),
        )
    }
}
