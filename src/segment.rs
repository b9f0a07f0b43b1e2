//! Color Segmentation module
//!
//! Turns an RGB page raster into a binary mask of the pixels that fall inside
//! a target HSV band (the answer mark colour).
//!
//! # Algorithm
//!
//! 1. Convert pixels to HSV on the 8-bit scale (H 0-179, S and V 0-255)
//! 2. Mark a pixel when hue is inside `[h_low, h_high]` and S/V clear their
//!    lower bounds (upper bounds are the channel maximum)
//! 3. Morphological opening with a 3x3 square to drop speckle
//! 4. One 3x3 dilation to restore and slightly grow surviving regions
//!
//! Every stage returns a new mask; the input is never touched.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use serde::{Deserialize, Serialize};

// ============================================================
// Constants
// ============================================================

/// Mask value for a matching pixel
pub const MATCH: u8 = 255;

/// Mask value for a non-matching pixel
pub const NO_MATCH: u8 = 0;

/// Largest hue on the 8-bit half-degree scale
pub const HUE_MAX: u8 = 179;

/// Default green band
const GREEN_HUE_LOW: u8 = 35;
const GREEN_HUE_HIGH: u8 = 85;
const GREEN_SAT_LOW: u8 = 40;
const GREEN_VAL_LOW: u8 = 40;

/// Chebyshev radius of the 3x3 structuring element
const KERNEL_RADIUS: u8 = 1;

// ============================================================
// Color Range
// ============================================================

/// Target colour band in 8-bit HSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRange {
    /// Hue lower bound (0-179)
    pub h_low: u8,
    /// Hue upper bound (0-179)
    pub h_high: u8,
    /// Saturation lower bound (0-255)
    pub s_low: u8,
    /// Value lower bound (0-255)
    pub v_low: u8,
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::green()
    }
}

impl ColorRange {
    /// Green pen / checkmark band
    pub fn green() -> Self {
        Self {
            h_low: GREEN_HUE_LOW,
            h_high: GREEN_HUE_HIGH,
            s_low: GREEN_SAT_LOW,
            v_low: GREEN_VAL_LOW,
        }
    }

    /// Create a builder starting from the green band
    pub fn builder() -> ColorRangeBuilder {
        ColorRangeBuilder::default()
    }

    /// Check if an 8-bit HSV triple is inside the band
    #[inline]
    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        h >= self.h_low && h <= self.h_high && s >= self.s_low && v >= self.v_low
    }
}

/// Builder for ColorRange
#[derive(Debug, Default)]
pub struct ColorRangeBuilder {
    range: ColorRange,
}

impl ColorRangeBuilder {
    /// Set hue bounds (0-179, clamped)
    #[must_use]
    pub fn hue(mut self, low: u8, high: u8) -> Self {
        self.range.h_low = low.min(HUE_MAX);
        self.range.h_high = high.min(HUE_MAX);
        self
    }

    /// Set saturation lower bound
    #[must_use]
    pub fn saturation_min(mut self, s_low: u8) -> Self {
        self.range.s_low = s_low;
        self
    }

    /// Set value lower bound
    #[must_use]
    pub fn value_min(mut self, v_low: u8) -> Self {
        self.range.v_low = v_low;
        self
    }

    /// Build the range
    #[must_use]
    pub fn build(self) -> ColorRange {
        self.range
    }
}

// ============================================================
// Color Segmenter
// ============================================================

/// Binary mask extraction for a colour band
pub struct ColorSegmenter;

impl ColorSegmenter {
    /// Threshold and clean: the mask every strategy works from
    pub fn segment(image: &RgbImage, range: &ColorRange) -> GrayImage {
        let raw = Self::in_range(image, range);
        Self::clean(&raw)
    }

    /// Raw band threshold without morphological cleanup
    pub fn in_range(image: &RgbImage, range: &ColorRange) -> GrayImage {
        let (width, height) = image.dimensions();
        let mut mask = GrayImage::new(width, height);

        for (x, y, pixel) in image.enumerate_pixels() {
            let (h, s, v) = Self::rgb_to_hsv(pixel.0[0], pixel.0[1], pixel.0[2]);
            if range.contains(h, s, v) {
                mask.put_pixel(x, y, Luma([MATCH]));
            }
        }

        mask
    }

    /// 3x3 opening followed by one 3x3 dilation
    pub fn clean(mask: &GrayImage) -> GrayImage {
        if mask.width() == 0 || mask.height() == 0 {
            return mask.clone();
        }
        let opened = morphology::open(mask, Norm::LInf, KERNEL_RADIUS);
        morphology::dilate(&opened, Norm::LInf, KERNEL_RADIUS)
    }

    /// Number of matching pixels in a mask
    pub fn match_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] != NO_MATCH).count()
    }

    /// Convert RGB to 8-bit HSV (H halved to fit 0-179)
    pub(crate) fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
        let rf = r as f32;
        let gf = g as f32;
        let bf = b as f32;

        let max = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let d = max - min;

        let s = if max == 0.0 { 0.0 } else { 255.0 * d / max };

        let h = if d == 0.0 {
            0.0
        } else if max == rf {
            60.0 * (gf - bf) / d
        } else if max == gf {
            120.0 + 60.0 * (bf - rf) / d
        } else {
            240.0 + 60.0 * (rf - gf) / d
        };
        let h = if h < 0.0 { h + 360.0 } else { h };

        // 359.x degrees rounds up to 180, which is red again
        let h = (h / 2.0).round() as u16 % 180;
        (h as u8, s.round() as u8, max as u8)
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn fill(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
        for y in y0..y1 {
            for x in x0..x1 {
                image.put_pixel(x, y, color);
            }
        }
    }

    #[test]
    fn test_color_range_default_is_green() {
        let range = ColorRange::default();
        assert_eq!(range.h_low, 35);
        assert_eq!(range.h_high, 85);
        assert_eq!(range.s_low, 40);
        assert_eq!(range.v_low, 40);
    }

    #[test]
    fn test_color_range_builder() {
        let range = ColorRange::builder()
            .hue(100, 250)
            .saturation_min(80)
            .value_min(10)
            .build();

        assert_eq!(range.h_low, 100);
        assert_eq!(range.h_high, HUE_MAX);
        assert_eq!(range.s_low, 80);
        assert_eq!(range.v_low, 10);
    }

    #[test]
    fn test_rgb_to_hsv() {
        // Pure green: 120 degrees -> 60
        assert_eq!(ColorSegmenter::rgb_to_hsv(0, 255, 0), (60, 255, 255));

        // Pure blue: 240 degrees -> 120
        assert_eq!(ColorSegmenter::rgb_to_hsv(0, 0, 255), (120, 255, 255));

        // Red
        let (h, s, v) = ColorSegmenter::rgb_to_hsv(255, 0, 0);
        assert_eq!(h, 0);
        assert_eq!(s, 255);
        assert_eq!(v, 255);

        // Grey has no saturation
        let (_, s, v) = ColorSegmenter::rgb_to_hsv(128, 128, 128);
        assert_eq!(s, 0);
        assert_eq!(v, 128);

        // Almost-red magenta wraps to 0 instead of 180
        let (h, _, _) = ColorSegmenter::rgb_to_hsv(255, 0, 1);
        assert!(h <= HUE_MAX);
    }

    #[test]
    fn test_contains() {
        let range = ColorRange::green();
        assert!(range.contains(60, 200, 200));
        assert!(range.contains(35, 40, 40));
        assert!(range.contains(85, 255, 255));
        assert!(!range.contains(34, 200, 200));
        assert!(!range.contains(60, 39, 200));
        assert!(!range.contains(60, 200, 39));
    }

    #[test]
    fn test_no_color_gives_empty_mask() {
        let mut image = white(60, 60);
        fill(&mut image, 10, 10, 30, 30, Rgb([0, 0, 0]));
        fill(&mut image, 35, 35, 50, 50, Rgb([200, 30, 30]));

        let mask = ColorSegmenter::segment(&image, &ColorRange::green());
        assert_eq!(ColorSegmenter::match_count(&mask), 0);
    }

    #[test]
    fn test_speckle_is_removed() {
        let mut image = white(40, 40);
        image.put_pixel(20, 20, Rgb([0, 200, 0]));

        let raw = ColorSegmenter::in_range(&image, &ColorRange::green());
        assert_eq!(ColorSegmenter::match_count(&raw), 1);

        let mask = ColorSegmenter::segment(&image, &ColorRange::green());
        assert_eq!(ColorSegmenter::match_count(&mask), 0);
    }

    #[test]
    fn test_solid_region_grows_by_one() {
        let mut image = white(50, 50);
        fill(&mut image, 10, 20, 30, 30, Rgb([20, 180, 40]));

        let mask = ColorSegmenter::segment(&image, &ColorRange::green());

        // 20x10 region dilated by one pixel on each side
        assert_eq!(ColorSegmenter::match_count(&mask), 22 * 12);
        assert_eq!(mask.get_pixel(9, 19).0[0], MATCH);
        assert_eq!(mask.get_pixel(30, 30).0[0], MATCH);
        assert_eq!(mask.get_pixel(8, 20).0[0], NO_MATCH);
    }

    #[test]
    fn test_segment_preserves_dimensions() {
        let image = white(17, 9);
        let mask = ColorSegmenter::segment(&image, &ColorRange::green());
        assert_eq!(mask.dimensions(), (17, 9));
    }
}
