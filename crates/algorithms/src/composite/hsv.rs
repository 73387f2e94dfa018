//! HSV terrain encoding
//!
//! Terrain orientation drives hue, steepness drives saturation and the
//! stretched hillshade drives value:
//!
//! ```text
//! hue        = (aspect mod 360) / 360
//! saturation = clamp(slope / slope_cap, 0, 1) ^ saturation_gamma * saturation_scale
//! value      = normalize(hillshade, bounds) ^ value_gamma
//! ```
//!
//! A flat, uniformly lit surface therefore comes out neutral gray.

use terraveg_core::raster::{HsvImage, Raster, RgbImage};
use terraveg_core::Result;
use tracing::debug;

use crate::imagery::band_math;
use crate::kernel::map_bands3;
use crate::stretch::{normalize, StretchBounds};

/// Parameters of the terrain → HSV mapping
#[derive(Debug, Clone, PartialEq)]
pub struct HsvEncoding {
    /// Slope (degrees) that maps to full saturation before scaling
    pub slope_cap: f64,
    pub saturation_gamma: f64,
    /// Final saturation multiplier, in [0, 1]
    pub saturation_scale: f64,
    pub value_gamma: f64,
}

impl Default for HsvEncoding {
    fn default() -> Self {
        Self {
            slope_cap: 60.0,
            saturation_gamma: 0.75,
            saturation_scale: 0.90,
            value_gamma: 1.20,
        }
    }
}

/// Hue in [0, 1] of an aspect in degrees. NaN stays NaN.
#[inline]
pub fn hue_from_aspect(aspect_deg: f64) -> f64 {
    (aspect_deg.rem_euclid(360.0) / 360.0).clamp(0.0, 1.0)
}

/// Saturation in [0, 1] of a slope in degrees. NaN stays NaN.
#[inline]
pub fn saturation_from_slope(slope_deg: f64, encoding: &HsvEncoding) -> f64 {
    let t = (slope_deg / encoding.slope_cap).clamp(0.0, 1.0);
    (t.powf(encoding.saturation_gamma) * encoding.saturation_scale).clamp(0.0, 1.0)
}

/// Value in [0, 1] of a normalized hillshade. NaN stays NaN.
#[inline]
pub fn value_from_normalized(normalized: f64, encoding: &HsvEncoding) -> f64 {
    normalized.clamp(0.0, 1.0).powf(encoding.value_gamma)
}

/// Encode the three terrain channels as an HSV image.
///
/// `bounds` are the hillshade stretch bounds; `None` (no valid samples)
/// yields a mid-gray value before gamma.
pub fn encode(
    aspect: &Raster<f64>,
    slope: &Raster<f64>,
    hillshade: &Raster<f64>,
    bounds: Option<&StretchBounds>,
    encoding: &HsvEncoding,
) -> Result<HsvImage> {
    let hue = band_math(aspect, hue_from_aspect)?;
    let saturation = band_math(slope, |s| saturation_from_slope(s, encoding))?;
    let normalized = normalize(hillshade, bounds)?;
    let value = band_math(&normalized, |n| value_from_normalized(n, encoding))?;

    debug!("encoded terrain as HSV ({}x{})", aspect.rows(), aspect.cols());
    HsvImage::new(hue, saturation, value)
}

/// Convert one HSV pixel (all components in [0, 1]) to RGB.
///
/// Any NaN component yields an all-NaN pixel.
pub fn hsv_to_rgb_pixel([h, s, v]: [f64; 3]) -> [f64; 3] {
    if h.is_nan() || s.is_nan() || v.is_nan() {
        return [f64::NAN; 3];
    }
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);

    // rem_euclid of a tiny negative hue rounds up to 1.0, which is red again
    let h6 = h.rem_euclid(1.0) * 6.0;
    let h6 = if h6 >= 6.0 { 0.0 } else { h6 };
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as u8 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Convert one RGB pixel (components in [0, 1]) to HSV. Gray pixels get hue 0.
pub fn rgb_to_hsv_pixel([r, g, b]: [f64; 3]) -> [f64; 3] {
    if r.is_nan() || g.is_nan() || b.is_nan() {
        return [f64::NAN; 3];
    }
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= 0.0 {
        return [0.0, s, max];
    }

    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    let h = (sector / 6.0).rem_euclid(1.0);
    [h, s, max]
}

/// Channel-wise HSV → RGB
pub fn hsv_to_rgb(image: &HsvImage) -> Result<RgbImage> {
    let [red, green, blue] = map_bands3(
        [&image.hue, &image.saturation, &image.value],
        hsv_to_rgb_pixel,
    )?;
    RgbImage::new(red, green, blue)
}

/// Channel-wise RGB → HSV
pub fn rgb_to_hsv(image: &RgbImage) -> Result<HsvImage> {
    let [hue, saturation, value] = map_bands3(image.bands(), rgb_to_hsv_pixel)?;
    HsvImage::new(hue, saturation, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn assert_px(actual: [f64; 3], expected: [f64; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert_relative_eq!(*a, e, epsilon = 1e-9);
        }
    }

    #[test]
    fn primary_hues() {
        assert_px(hsv_to_rgb_pixel([0.0, 1.0, 1.0]), [1.0, 0.0, 0.0]);
        assert_px(hsv_to_rgb_pixel([1.0 / 3.0, 1.0, 1.0]), [0.0, 1.0, 0.0]);
        assert_px(hsv_to_rgb_pixel([2.0 / 3.0, 1.0, 1.0]), [0.0, 0.0, 1.0]);
        assert_px(hsv_to_rgb_pixel([1.0, 1.0, 1.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn hue_just_below_zero_wraps_to_red() {
        assert_px(hsv_to_rgb_pixel([-1e-17, 1.0, 1.0]), [1.0, 0.0, 0.0]);
        assert_px(hsv_to_rgb_pixel([-f64::EPSILON / 4.0, 1.0, 0.5]), [0.5, 0.0, 0.0]);
    }

    #[test]
    fn zero_saturation_is_gray() {
        assert_px(hsv_to_rgb_pixel([0.37, 0.0, 0.6]), [0.6, 0.6, 0.6]);
        assert_px(rgb_to_hsv_pixel([0.6, 0.6, 0.6]), [0.0, 0.0, 0.6]);
    }

    #[test]
    fn nan_component_propagates() {
        assert!(hsv_to_rgb_pixel([f64::NAN, 0.5, 0.5]).iter().all(|v| v.is_nan()));
        assert!(rgb_to_hsv_pixel([0.5, f64::NAN, 0.5]).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn encoding_defaults() {
        let enc = HsvEncoding::default();
        assert_eq!(saturation_from_slope(0.0, &enc), 0.0);
        assert_relative_eq!(saturation_from_slope(60.0, &enc), 0.9, epsilon = 1e-12);
        assert_relative_eq!(saturation_from_slope(85.0, &enc), 0.9, epsilon = 1e-12);
        assert_relative_eq!(
            saturation_from_slope(30.0, &enc),
            0.5f64.powf(0.75) * 0.9,
            epsilon = 1e-12
        );
        assert_relative_eq!(value_from_normalized(0.5, &enc), 0.5f64.powf(1.2), epsilon = 1e-12);
        assert_eq!(hue_from_aspect(0.0), 0.0);
        assert_relative_eq!(hue_from_aspect(90.0), 0.25, epsilon = 1e-12);
        assert_relative_eq!(hue_from_aspect(-90.0), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn encode_flat_surface_is_gray() {
        let aspect = Raster::filled(4, 4, 0.0);
        let slope = Raster::filled(4, 4, 0.0);
        let hillshade = Raster::filled(4, 4, 180.0);
        let bounds = StretchBounds { low: 180.0, high: 180.0, samples: 16 };

        let hsv = encode(&aspect, &slope, &hillshade, Some(&bounds), &HsvEncoding::default()).unwrap();
        let rgb = hsv_to_rgb(&hsv).unwrap();

        let gray = 0.5f64.powf(1.2);
        let px = rgb.pixel(2, 2).unwrap().unwrap();
        assert_px(px, [gray, gray, gray]);
    }

    #[test]
    fn encode_propagates_gaps() {
        let mut aspect = Raster::filled(3, 3, 45.0);
        aspect.set(1, 1, f64::NAN).unwrap();
        let slope = Raster::filled(3, 3, 20.0);
        let hillshade = Raster::filled(3, 3, 200.0);

        let hsv = encode(&aspect, &slope, &hillshade, None, &HsvEncoding::default()).unwrap();
        assert!(hsv.pixel(1, 1).unwrap().is_none());
        assert!(hsv.pixel(0, 0).unwrap().is_some());

        let rgb = hsv_to_rgb(&hsv).unwrap();
        assert!(rgb.pixel(1, 1).unwrap().is_none());
    }

    #[test]
    fn image_round_trip() {
        let hue = Raster::from_vec(vec![0.1, 0.5, 0.9, 0.3], 2, 2).unwrap();
        let sat = Raster::from_vec(vec![0.2, 0.8, 1.0, 0.5], 2, 2).unwrap();
        let val = Raster::from_vec(vec![0.9, 0.4, 0.7, 1.0], 2, 2).unwrap();
        let hsv = HsvImage::new(hue, sat, val).unwrap();

        let back = rgb_to_hsv(&hsv_to_rgb(&hsv).unwrap()).unwrap();
        for row in 0..2 {
            for col in 0..2 {
                assert_px(
                    back.pixel(row, col).unwrap().unwrap(),
                    hsv.pixel(row, col).unwrap().unwrap(),
                );
            }
        }
    }

    proptest! {
        #[test]
        fn saturation_is_monotonic(a in 0.0f64..120.0, b in 0.0f64..120.0) {
            let enc = HsvEncoding::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(saturation_from_slope(lo, &enc) <= saturation_from_slope(hi, &enc));
        }

        #[test]
        fn hue_is_periodic(aspect in -720.0f64..720.0) {
            let h = hue_from_aspect(aspect);
            prop_assert!((0.0..=1.0).contains(&h));
            prop_assert!((h - hue_from_aspect(aspect + 360.0)).abs() < 1e-9);
        }

        #[test]
        fn rgb_stays_in_unit_cube(h in 0.0f64..1.0, s in 0.0f64..=1.0, v in 0.0f64..=1.0) {
            let rgb = hsv_to_rgb_pixel([h, s, v]);
            prop_assert!(rgb.iter().all(|c| (0.0..=1.0).contains(c)));
        }

        #[test]
        fn hsv_rgb_round_trip(h in 0.0f64..0.999, s in 0.01f64..=1.0, v in 0.01f64..=1.0) {
            let back = rgb_to_hsv_pixel(hsv_to_rgb_pixel([h, s, v]));
            prop_assert!((back[1] - s).abs() < 1e-9);
            prop_assert!((back[2] - v).abs() < 1e-9);
            let dh = (back[0] - h).abs();
            prop_assert!(dh.min(1.0 - dh) < 1e-9);
        }
    }
}
