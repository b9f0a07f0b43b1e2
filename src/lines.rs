//! Edge and Line Detection module
//!
//! Thin checkmarks drawn with a few pen strokes are badly covered by a single
//! bounding box. This module finds the straight strokes on the colour mask so
//! they can be painted over with a thick line.
//!
//! # Algorithm
//!
//! 1. Canny edge detection on the binary mask
//! 2. Progressive probabilistic Hough transform (rho = 1px, theta = 1 degree)
//!    - each remaining edge point votes once
//!    - once a cell reaches the vote threshold, walk along that line in both
//!      directions, tolerating gaps up to `max_gap`
//!    - the walked points are removed; if the segment is long enough its
//!      votes are withdrawn and it is emitted
//!
//! Edge points are visited in raster order, so the output is deterministic.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::edges::canny;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

// ============================================================
// Constants
// ============================================================

const DEFAULT_CANNY_LOW: f32 = 20.0;
const DEFAULT_CANNY_HIGH: f32 = 80.0;
const DEFAULT_VOTE_THRESHOLD: u32 = 30;
const DEFAULT_MIN_LENGTH: u32 = 20;
const DEFAULT_MAX_GAP: u32 = 3;
const DEFAULT_THICKNESS: u32 = 12;

/// Angular resolution of the accumulator (1 degree)
const THETA_STEPS: usize = 180;

// ============================================================
// Types
// ============================================================

/// Edge and line detection options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineOptions {
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Accumulator votes needed before a line is traced
    pub vote_threshold: u32,
    /// Minimum segment extent along x or y (pixels)
    pub min_length: u32,
    /// Largest run of missing edge pixels bridged inside a segment
    pub max_gap: u32,
    /// Stroke thickness used to paint detected segments
    pub thickness: u32,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            vote_threshold: DEFAULT_VOTE_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
            max_gap: DEFAULT_MAX_GAP,
            thickness: DEFAULT_THICKNESS,
        }
    }
}

/// Straight segment between two pixel positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Euclidean length
    pub fn length(&self) -> f32 {
        let dx = (self.x2 - self.x1) as f32;
        let dy = (self.y2 - self.y1) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

// ============================================================
// Line Detector
// ============================================================

/// Canny + probabilistic Hough line extraction
pub struct LineDetector;

impl LineDetector {
    /// Detect stroke segments on a binary colour mask
    pub fn detect(mask: &GrayImage, options: &LineOptions) -> Vec<LineSegment> {
        if mask.width() == 0 || mask.height() == 0 {
            return Vec::new();
        }
        let edges = canny(mask, options.canny_low, options.canny_high);
        Self::probabilistic_hough(&edges, options)
    }

    /// Progressive probabilistic Hough transform over an edge map
    pub fn probabilistic_hough(edges: &GrayImage, options: &LineOptions) -> Vec<LineSegment> {
        let (width, height) = edges.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let w = width as i32;
        let h = height as i32;
        let rho_offset = w + h;
        let num_rho = (2 * rho_offset + 1) as usize;

        let trig: Vec<(f32, f32)> = (0..THETA_STEPS)
            .map(|t| {
                let theta = (t as f32).to_radians();
                (theta.cos(), theta.sin())
            })
            .collect();

        let rho_index = |x: i32, y: i32, t: usize| -> usize {
            let (c, s) = trig[t];
            let rho = (x as f32 * c + y as f32 * s).round() as i32 + rho_offset;
            t * num_rho + rho as usize
        };

        let mut accum = vec![0u32; THETA_STEPS * num_rho];
        let mut remaining = vec![false; (width * height) as usize];
        let mut voted = vec![false; (width * height) as usize];
        let mut points = Vec::new();

        for (x, y, p) in edges.enumerate_pixels() {
            if p.0[0] > 0 {
                remaining[(y * width + x) as usize] = true;
                points.push((x as i32, y as i32));
            }
        }

        let threshold = options.vote_threshold.max(1);
        let max_gap = options.max_gap as i32;
        let min_length = options.min_length as i32;
        let mut segments = Vec::new();

        for &(px, py) in &points {
            let idx = (py * w + px) as usize;
            if !remaining[idx] {
                continue;
            }

            let mut best_votes = 0u32;
            let mut best_theta = 0usize;
            for t in 0..THETA_STEPS {
                let cell = &mut accum[rho_index(px, py, t)];
                *cell += 1;
                if *cell > best_votes {
                    best_votes = *cell;
                    best_theta = t;
                }
            }
            voted[idx] = true;

            if best_votes < threshold {
                continue;
            }

            // Direction along the line is perpendicular to the normal (cos, sin)
            let (c, s) = trig[best_theta];
            let (dx, dy) = (-s, c);
            let (step_x, step_y) = if dx.abs() > dy.abs() {
                (dx.signum(), dy / dx.abs())
            } else {
                (dx / dy.abs(), dy.signum())
            };

            let mut ends = [(px, py); 2];
            for (k, sign) in [1.0f32, -1.0].into_iter().enumerate() {
                let mut gap = 0;
                let (mut fx, mut fy) = (px as f32, py as f32);
                loop {
                    fx += sign * step_x;
                    fy += sign * step_y;
                    let (ix, iy) = (fx.round() as i32, fy.round() as i32);
                    if ix < 0 || iy < 0 || ix >= w || iy >= h {
                        break;
                    }
                    if remaining[(iy * w + ix) as usize] {
                        gap = 0;
                        ends[k] = (ix, iy);
                    } else {
                        gap += 1;
                        if gap > max_gap {
                            break;
                        }
                    }
                }
            }

            let good = (ends[0].0 - ends[1].0).abs() >= min_length
                || (ends[0].1 - ends[1].1).abs() >= min_length;

            let mut consume = |ix: i32, iy: i32| {
                let i = (iy * w + ix) as usize;
                if !remaining[i] {
                    return;
                }
                if good && voted[i] {
                    for t in 0..THETA_STEPS {
                        let cell = &mut accum[rho_index(ix, iy, t)];
                        *cell = cell.saturating_sub(1);
                    }
                }
                remaining[i] = false;
            };

            consume(px, py);
            for (k, sign) in [1.0f32, -1.0].into_iter().enumerate() {
                if ends[k] == (px, py) {
                    continue;
                }
                let (mut fx, mut fy) = (px as f32, py as f32);
                loop {
                    fx += sign * step_x;
                    fy += sign * step_y;
                    let (ix, iy) = (fx.round() as i32, fy.round() as i32);
                    if ix < 0 || iy < 0 || ix >= w || iy >= h {
                        break;
                    }
                    consume(ix, iy);
                    if (ix, iy) == ends[k] {
                        break;
                    }
                }
            }

            if good {
                segments.push(LineSegment::new(ends[1].0, ends[1].1, ends[0].0, ends[0].1));
            }
        }

        segments
    }

    /// Paint a segment with the given stroke thickness (round caps)
    pub fn draw_segment(image: &mut RgbImage, segment: &LineSegment, thickness: u32, color: Rgb<u8>) {
        let radius = thickness as f32 / 2.0;
        let (x1, y1) = (segment.x1 as f32, segment.y1 as f32);
        let (x2, y2) = (segment.x2 as f32, segment.y2 as f32);
        let length = segment.length();

        if length >= 1.0 {
            let nx = (-(y2 - y1) / length * radius).round();
            let ny = ((x2 - x1) / length * radius).round();

            if nx == 0.0 && ny == 0.0 {
                draw_line_segment_mut(image, (x1, y1), (x2, y2), color);
            } else {
                let body = [
                    Point::new((x1 + nx) as i32, (y1 + ny) as i32),
                    Point::new((x2 + nx) as i32, (y2 + ny) as i32),
                    Point::new((x2 - nx) as i32, (y2 - ny) as i32),
                    Point::new((x1 - nx) as i32, (y1 - ny) as i32),
                ];
                draw_polygon_mut(image, &body, color);
            }
        }

        let cap = radius.round() as i32;
        draw_filled_circle_mut(image, (segment.x1, segment.y1), cap, color);
        draw_filled_circle_mut(image, (segment.x2, segment.y2), cap, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn edge_map_with_row(width: u32, height: u32, y: u32, x0: u32, x1: u32) -> GrayImage {
        let mut edges = GrayImage::new(width, height);
        for x in x0..x1 {
            edges.put_pixel(x, y, Luma([255]));
        }
        edges
    }

    #[test]
    fn test_line_options_default() {
        let opts = LineOptions::default();
        assert_eq!(opts.canny_low, 20.0);
        assert_eq!(opts.canny_high, 80.0);
        assert_eq!(opts.vote_threshold, 30);
        assert_eq!(opts.min_length, 20);
        assert_eq!(opts.max_gap, 3);
        assert_eq!(opts.thickness, 12);
    }

    #[test]
    fn test_segment_length() {
        assert_eq!(LineSegment::new(0, 0, 3, 4).length(), 5.0);
    }

    #[test]
    fn test_empty_edges_no_lines() {
        let edges = GrayImage::new(80, 60);
        assert!(LineDetector::probabilistic_hough(&edges, &LineOptions::default()).is_empty());
    }

    #[test]
    fn test_detect_on_empty_raster() {
        let mask = GrayImage::new(0, 0);
        assert!(LineDetector::detect(&mask, &LineOptions::default()).is_empty());
    }

    #[test]
    fn test_horizontal_run_is_one_segment() {
        let edges = edge_map_with_row(100, 40, 20, 10, 61);
        let segments = LineDetector::probabilistic_hough(&edges, &LineOptions::default());

        assert_eq!(segments.len(), 1);
        let seg = segments[0];
        assert_eq!(seg.y1, 20);
        assert_eq!(seg.y2, 20);
        assert_eq!(seg.x1.min(seg.x2), 10);
        assert_eq!(seg.x1.max(seg.x2), 60);
    }

    #[test]
    fn test_short_run_is_ignored() {
        let edges = edge_map_with_row(100, 40, 20, 10, 22);
        assert!(LineDetector::probabilistic_hough(&edges, &LineOptions::default()).is_empty());
    }

    #[test]
    fn test_small_gap_is_bridged() {
        let mut edges = edge_map_with_row(100, 40, 20, 10, 40);
        for x in 42..70 {
            edges.put_pixel(x, 20, Luma([255]));
        }
        let segments = LineDetector::probabilistic_hough(&edges, &LineOptions::default());
        assert_eq!(segments.len(), 1);
        assert!((segments[0].x1 - segments[0].x2).abs() >= 55);
    }

    #[test]
    fn test_detect_on_bar_mask() {
        let mut mask = GrayImage::new(140, 60);
        for y in 25..33 {
            for x in 20..120 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let segments = LineDetector::detect(&mask, &LineOptions::default());
        assert!(!segments.is_empty());
        assert!(segments.iter().any(|s| (s.x1 - s.x2).abs() >= 50));
    }

    #[test]
    fn test_draw_segment_thickness() {
        let mut image = RgbImage::from_pixel(60, 30, Rgb([255, 255, 255]));
        let black = Rgb([0, 0, 0]);
        LineDetector::draw_segment(&mut image, &LineSegment::new(10, 15, 40, 15), 6, black);

        assert_eq!(*image.get_pixel(25, 15), black);
        assert_eq!(*image.get_pixel(25, 17), black);
        assert_eq!(*image.get_pixel(25, 25), Rgb([255, 255, 255]));
        // Round cap reaches past the endpoint
        assert_eq!(*image.get_pixel(8, 15), black);
    }

    #[test]
    fn test_draw_segment_clips_at_edges() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        LineDetector::draw_segment(
            &mut image,
            &LineSegment::new(-10, 5, 30, 5),
            4,
            Rgb([0, 0, 0]),
        );
        assert_eq!(*image.get_pixel(0, 5), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(19, 5), Rgb([0, 0, 0]));
    }
}
