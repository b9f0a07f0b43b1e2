//! Masking strategy core types
//!
//! Mask operations, per-page plans and outcomes shared by every strategy.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lines::{LineDetector, LineSegment};

// ============================================================
// Constants
// ============================================================

/// Colour stamped over masked areas
pub const MASK_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

// ============================================================
// Mask Operations
// ============================================================

/// Filled rectangle with inclusive corners, always inside the raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl MaskRect {
    /// Clip signed inclusive corners to `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the rectangle is left on the raster.
    pub fn clipped(x1: i64, y1: i64, x2: i64, y2: i64, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));
        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;

        if x2 < 0 || y2 < 0 || x1 > max_x || y1 > max_y {
            return None;
        }

        Some(Self {
            x1: x1.clamp(0, max_x) as u32,
            y1: y1.clamp(0, max_y) as u32,
            x2: x2.clamp(0, max_x) as u32,
            y2: y2.clamp(0, max_y) as u32,
        })
    }

    /// Clipped rectangle of a given size centred on a point
    pub fn centered(cx: f32, cy: f32, box_width: u32, box_height: u32, width: u32, height: u32) -> Option<Self> {
        let x1 = (cx - box_width as f32 / 2.0).round() as i64;
        let y1 = (cy - box_height as f32 / 2.0).round() as i64;
        Self::clipped(
            x1,
            y1,
            x1 + box_width as i64 - 1,
            y1 + box_height as i64 - 1,
            width,
            height,
        )
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1 + 1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1 + 1
    }

    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2 + 1) as f32 / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y1 + self.y2 + 1) as f32 / 2.0
    }

    fn to_rect(self) -> Rect {
        Rect::at(self.x1 as i32, self.y1 as i32).of_size(self.width(), self.height())
    }
}

/// One operation composited onto the output page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskOp {
    /// Opaque filled rectangle
    Rect(MaskRect),
    /// Thick line over a detected stroke
    Stroke { segment: LineSegment, thickness: u32 },
}

impl MaskOp {
    /// Paint this operation onto an image
    pub fn paint(&self, image: &mut RgbImage) {
        match self {
            MaskOp::Rect(rect) => draw_filled_rect_mut(image, rect.to_rect(), MASK_COLOR),
            MaskOp::Stroke { segment, thickness } => {
                LineDetector::draw_segment(image, segment, *thickness, MASK_COLOR)
            }
        }
    }
}

/// Composite operations, in order, onto a copy of the page
pub fn composite(image: &RgbImage, ops: &[MaskOp]) -> RgbImage {
    let mut output = image.clone();
    for op in ops {
        op.paint(&mut output);
    }
    output
}

// ============================================================
// Page Results
// ============================================================

/// Why a page was passed through unmodified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No coloured region cleared the minimum area
    MarkNotFound,
    /// Fewer option anchors than required
    InsufficientAnchors { found: usize, required: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MarkNotFound => write!(f, "no mark found"),
            SkipReason::InsufficientAnchors { found, required } => {
                write!(f, "too few anchors found ({} < {})", found, required)
            }
        }
    }
}

/// What a strategy decided for one page
#[derive(Debug, Clone, PartialEq)]
pub enum PagePlan {
    /// Operations to composite (possibly none)
    Ops(Vec<MaskOp>),
    /// Leave the page as is
    Skip(SkipReason),
}

/// Per-page result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    /// At least one operation was composited
    Masked { ops: Vec<MaskOp> },
    /// The strategy ran and found nothing to cover
    Untouched,
    /// Detection fell short; page passed through
    Skipped { reason: SkipReason },
}

impl PageOutcome {
    pub fn is_masked(&self) -> bool {
        matches!(self, PageOutcome::Masked { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            PageOutcome::Skipped { reason } => Some(*reason),
            _ => None,
        }
    }
}

/// Output raster plus its outcome
#[derive(Debug, Clone)]
pub struct MaskedPage {
    pub image: RgbImage,
    pub outcome: PageOutcome,
}

impl MaskedPage {
    /// Resolve a plan against its source page
    pub fn from_plan(image: &RgbImage, plan: PagePlan) -> Self {
        match plan {
            PagePlan::Skip(reason) => Self {
                image: image.clone(),
                outcome: PageOutcome::Skipped { reason },
            },
            PagePlan::Ops(ops) if ops.is_empty() => Self {
                image: image.clone(),
                outcome: PageOutcome::Untouched,
            },
            PagePlan::Ops(ops) => Self {
                image: composite(image, &ops),
                outcome: PageOutcome::Masked { ops },
            },
        }
    }
}
