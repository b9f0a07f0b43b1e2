//! Blob Localization module
//!
//! Finds the mark on a binary mask: every outermost connected region is
//! reduced to its axis-aligned bounding box, and boxes below the minimum area
//! are discarded.
//!
//! # Box-area heuristic
//!
//! A region's area is the area of its bounding box, not its pixel count.
//! Sparse or diagonal strokes therefore count as larger than they are. The
//! masking footprints are tuned around this, so keep it.

use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType};
use serde::{Deserialize, Serialize};

/// Default minimum bounding-box area in pixels
pub const DEFAULT_MIN_AREA: u32 = 100;

/// Blob selection options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobOptions {
    /// Minimum bounding-box area (pixels) for a region to count
    pub min_area: u32,
}

impl Default for BlobOptions {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

/// Axis-aligned bounding box of a matched region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Blob {
    /// Box area (width x height)
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Horizontal centre
    pub fn center_x(&self) -> f32 {
        self.x as f32 + self.width as f32 / 2.0
    }

    /// Vertical centre
    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.height as f32 / 2.0
    }
}

/// Region extraction over binary masks
pub struct BlobLocalizer;

impl BlobLocalizer {
    /// Bounding boxes of all outermost regions, in scan order.
    ///
    /// The mask is traced inside a one-pixel background frame so regions
    /// touching the raster border are outer borders like any other.
    pub fn regions(mask: &GrayImage) -> Vec<Blob> {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let mut framed = GrayImage::new(width + 2, height + 2);
        imageops::replace(&mut framed, mask, 1, 1);

        find_contours::<i32>(&framed)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| {
                let min_x = c.points.iter().map(|p| p.x).min()?;
                let max_x = c.points.iter().map(|p| p.x).max()?;
                let min_y = c.points.iter().map(|p| p.y).min()?;
                let max_y = c.points.iter().map(|p| p.y).max()?;
                Some(Blob {
                    x: (min_x - 1) as u32,
                    y: (min_y - 1) as u32,
                    width: (max_x - min_x + 1) as u32,
                    height: (max_y - min_y + 1) as u32,
                })
            })
            .collect()
    }

    /// All regions whose box area clears `min_area`
    pub fn find_all(mask: &GrayImage, min_area: u32) -> Vec<Blob> {
        Self::regions(mask)
            .into_iter()
            .filter(|b| b.area() >= min_area as u64)
            .collect()
    }

    /// Largest region clearing `min_area`, or `None` when nothing does.
    ///
    /// Equal areas keep the first region found; callers should not depend
    /// on which one that is.
    pub fn largest(mask: &GrayImage, min_area: u32) -> Option<Blob> {
        let mut best: Option<Blob> = None;
        for blob in Self::find_all(mask, min_area) {
            match best {
                Some(b) if blob.area() <= b.area() => {}
                _ => best = Some(blob),
            }
        }
        best
    }
}
