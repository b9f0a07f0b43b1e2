//! Anchor Location module
//!
//! Detects the small circles printed next to multiple-choice options and
//! returns their centres, one per option row, top to bottom.
//!
//! # Algorithm
//!
//! 1. Grayscale + 5x5 median blur
//! 2. Hough gradient circle transform
//!    - Canny edges (high = `param1`, low = `param1 / 2`) and Sobel gradients
//!    - every edge pixel votes along both gradient directions for each radius
//!      in `[min_radius, max_radius]`, into an accumulator scaled by `1 / dp`
//!    - local maxima above `param2` become centres (strongest first, at least
//!      `min_dist` apart)
//!    - the radius with the best edge support is kept if that support reaches
//!      `param2`
//! 3. Row selection: sort by y, keep a circle only if it is at least
//!    `min_dist` away vertically from every kept circle, up to `max_anchors`
//!
//! Only vertical spacing is checked during row selection. Option rows are
//! assumed to be horizontally aligned; skewed scans break that assumption.

use image::{GrayImage, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================
// Constants
// ============================================================

const DEFAULT_DP: f32 = 1.2;
const DEFAULT_MIN_DIST: f32 = 40.0;
const DEFAULT_PARAM1: f32 = 100.0;
const DEFAULT_PARAM2: u32 = 20;
const DEFAULT_MIN_RADIUS: u32 = 8;
const DEFAULT_MAX_RADIUS: u32 = 30;

/// Largest accepted `max_radius` (pixels)
pub const MAX_RADIUS_LIMIT: u32 = 500;

/// Typical number of options in a multiple-choice question
pub const DEFAULT_MAX_ANCHORS: usize = 5;

/// Median blur radius (5x5 window)
const BLUR_RADIUS: u32 = 2;

// ============================================================
// Types
// ============================================================

/// Circle transform and row selection options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorOptions {
    /// Inverse accumulator resolution (1.0 = image resolution)
    pub dp: f32,
    /// Minimum distance between centres, and minimum row spacing
    pub min_dist: f32,
    /// Canny high threshold
    pub param1: f32,
    /// Accumulator / radius support threshold
    pub param2: u32,
    /// Smallest radius searched (pixels)
    pub min_radius: u32,
    /// Largest radius searched (pixels)
    pub max_radius: u32,
    /// Maximum number of anchors returned
    pub max_anchors: usize,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            dp: DEFAULT_DP,
            min_dist: DEFAULT_MIN_DIST,
            param1: DEFAULT_PARAM1,
            param2: DEFAULT_PARAM2,
            min_radius: DEFAULT_MIN_RADIUS,
            max_radius: DEFAULT_MAX_RADIUS,
            max_anchors: DEFAULT_MAX_ANCHORS,
        }
    }
}

impl AnchorOptions {
    /// Create a new options builder
    pub fn builder() -> AnchorOptionsBuilder {
        AnchorOptionsBuilder::default()
    }
}

/// Builder for AnchorOptions
#[derive(Debug, Default)]
pub struct AnchorOptionsBuilder {
    options: AnchorOptions,
}

impl AnchorOptionsBuilder {
    /// Set accumulator resolution (values below 1.0 are raised to 1.0)
    #[must_use]
    pub fn dp(mut self, dp: f32) -> Self {
        self.options.dp = dp.max(1.0);
        self
    }

    /// Set minimum centre distance
    #[must_use]
    pub fn min_dist(mut self, min_dist: f32) -> Self {
        self.options.min_dist = min_dist.max(0.0);
        self
    }

    /// Set Canny high threshold and accumulator threshold
    #[must_use]
    pub fn thresholds(mut self, param1: f32, param2: u32) -> Self {
        self.options.param1 = param1;
        self.options.param2 = param2;
        self
    }

    /// Set radius bounds
    #[must_use]
    pub fn radius(mut self, min_radius: u32, max_radius: u32) -> Self {
        self.options.min_radius = min_radius;
        self.options.max_radius = max_radius;
        self
    }

    /// Set anchor cap
    #[must_use]
    pub fn max_anchors(mut self, max_anchors: usize) -> Self {
        self.options.max_anchors = max_anchors;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> AnchorOptions {
        self.options
    }
}

/// Detected circular option marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

// ============================================================
// Anchor Locator
// ============================================================

/// Circle-based option row detection
pub struct AnchorLocator;

impl AnchorLocator {
    /// Locate option anchors on a page, ordered top to bottom
    pub fn locate(image: &RgbImage, options: &AnchorOptions) -> Vec<Anchor> {
        let gray = image::imageops::grayscale(image);
        let blurred = median_filter(&gray, BLUR_RADIUS, BLUR_RADIUS);
        let circles = Self::hough_circles(&blurred, options);
        Self::select_rows(circles, options.min_dist, options.max_anchors)
    }

    /// Hough gradient circle transform, strongest circles first
    pub fn hough_circles(gray: &GrayImage, options: &AnchorOptions) -> Vec<Anchor> {
        let (width, height) = gray.dimensions();
        if width < 3 || height < 3 || options.min_radius > options.max_radius {
            return Vec::new();
        }

        let edges = canny(gray, options.param1 / 2.0, options.param1);
        let gx = horizontal_sobel(gray);
        let gy = vertical_sobel(gray);

        let dp = options.dp.max(1.0);
        let acc_w = (width as f32 / dp).ceil() as usize + 1;
        let acc_h = (height as f32 / dp).ceil() as usize + 1;
        let mut accum = vec![0u32; acc_w * acc_h];
        let mut edge_points = Vec::new();

        let min_r = options.min_radius.max(1);
        let max_r = options.max_radius;

        for (x, y, p) in edges.enumerate_pixels() {
            if p.0[0] == 0 {
                continue;
            }
            let vx = gx.get_pixel(x, y).0[0] as f32;
            let vy = gy.get_pixel(x, y).0[0] as f32;
            let mag = (vx * vx + vy * vy).sqrt();
            if mag < 1e-3 {
                continue;
            }
            edge_points.push((x as f32, y as f32));

            let (ux, uy) = (vx / mag, vy / mag);
            for sign in [1.0f32, -1.0] {
                for r in min_r..=max_r {
                    let cx = x as f32 + sign * ux * r as f32;
                    let cy = y as f32 + sign * uy * r as f32;
                    if cx < 0.0 || cy < 0.0 || cx >= width as f32 || cy >= height as f32 {
                        // The ray only moves further out from here
                        break;
                    }
                    let ax = (cx / dp).round() as usize;
                    let ay = (cy / dp).round() as usize;
                    accum[ay * acc_w + ax] += 1;
                }
            }
        }

        // Local maxima above the accumulator threshold
        let mut centers: Vec<(usize, u32)> = Vec::new();
        for ay in 1..acc_h - 1 {
            for ax in 1..acc_w - 1 {
                let idx = ay * acc_w + ax;
                let v = accum[idx];
                if v > options.param2
                    && v > accum[idx - 1]
                    && v >= accum[idx + 1]
                    && v > accum[idx - acc_w]
                    && v >= accum[idx + acc_w]
                {
                    centers.push((idx, v));
                }
            }
        }
        centers.sort_by(|a, b| b.1.cmp(&a.1));

        let min_dist_sq = options.min_dist * options.min_dist;
        let mut circles: Vec<Anchor> = Vec::new();

        for (idx, _) in centers {
            let cx = (idx % acc_w) as f32 * dp;
            let cy = (idx / acc_w) as f32 * dp;

            let crowded = circles.iter().any(|c| {
                let dx = c.x - cx;
                let dy = c.y - cy;
                dx * dx + dy * dy < min_dist_sq
            });
            if crowded {
                continue;
            }

            if let Some(radius) = Self::estimate_radius(&edge_points, cx, cy, min_r, max_r, options.param2) {
                circles.push(Anchor { x: cx, y: cy, radius });
            }
        }

        circles
    }

    /// Radius with the best edge support around a centre.
    ///
    /// Support for radius `r` counts edge points at distance `[r - 1, r + 1)`,
    /// scored by support per unit radius.
    fn estimate_radius(
        edge_points: &[(f32, f32)],
        cx: f32,
        cy: f32,
        min_r: u32,
        max_r: u32,
        min_support: u32,
    ) -> Option<f32> {
        let reach = max_r as f32 + 1.0;
        let mut hist = vec![0u32; max_r as usize + 2];

        for &(x, y) in edge_points {
            let dx = x - cx;
            let dy = y - cy;
            if dx.abs() > reach || dy.abs() > reach {
                continue;
            }
            let d = (dx * dx + dy * dy).sqrt();
            if d + 1.0 < min_r as f32 || d >= reach {
                continue;
            }
            hist[d as usize] += 1;
        }

        let mut best: Option<(u32, u32)> = None;
        for r in min_r..=max_r {
            let support = hist[r as usize - 1] + hist[r as usize];
            let better = match best {
                None => true,
                Some((best_r, best_support)) => support as u64 * best_r as u64 > best_support as u64 * r as u64,
            };
            if better {
                best = Some((r, support));
            }
        }

        best.filter(|&(_, support)| support >= min_support)
            .map(|(r, _)| r as f32)
    }

    /// One anchor per option row: ascending y, spaced by `min_dist`, capped
    pub fn select_rows(mut candidates: Vec<Anchor>, min_dist: f32, max_anchors: usize) -> Vec<Anchor> {
        candidates.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal));

        let mut rows: Vec<Anchor> = Vec::new();
        for candidate in candidates {
            if rows.len() >= max_anchors {
                break;
            }
            if rows.iter().all(|kept| (candidate.y - kept.y).abs() >= min_dist) {
                rows.push(candidate);
            }
        }
        rows
    }
}
