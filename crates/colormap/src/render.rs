//! Raster-to-RGBA rendering using color ramps.

use terraveg_core::raster::{Raster, RasterElement, RgbImage};

use crate::scheme::{ColorRamp, Rgb};

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Ramp to render with; its domain sets the normalization range.
    pub ramp: ColorRamp,
    /// Color for nodata pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    pub fn from_ramp(ramp: ColorRamp) -> Self {
        Self {
            ramp,
            nodata_color: [0, 0, 0, 0],
        }
    }
}

fn put(rgba: &mut [u8], offset: usize, px: [u8; 4]) {
    rgba[offset..offset + 4].copy_from_slice(&px);
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns a `Vec<u8>` of length `rows * cols * 4` in row-major order.
/// Nodata pixels are rendered with `params.nodata_color`.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &ColormapParams) -> Vec<u8> {
    let nodata = raster.nodata();
    let mut rgba = vec![0u8; raster.len() * 4];

    for (i, val) in raster.data().iter().enumerate() {
        let color = if val.is_nodata(nodata) {
            None
        } else {
            val.to_f64()
                .filter(|v| v.is_finite())
                .and_then(|v| params.ramp.evaluate_rgb(v))
        };

        match color {
            Some(Rgb { r, g, b }) => put(&mut rgba, i * 4, [r, g, b, 255]),
            None => put(&mut rgba, i * 4, params.nodata_color),
        }
    }

    rgba
}

/// Render a single-band display layer (raw index, slope, aspect) with a ramp.
pub fn render_layer(raster: &Raster<f64>, ramp: &ColorRamp) -> Vec<u8> {
    raster_to_rgba(raster, &ColormapParams::from_ramp(ramp.clone()))
}

/// RGBA buffer of an RGB image. `alpha` (in [0, 1]) sets per-pixel opacity;
/// without it valid pixels are opaque. No-data pixels are transparent.
pub fn image_to_rgba(image: &RgbImage, alpha: Option<&Raster<f64>>) -> Vec<u8> {
    let (rows, cols) = image.shape();
    let mut rgba = vec![0u8; rows * cols * 4];

    for row in 0..rows {
        for col in 0..cols {
            let Ok(Some([r, g, b])) = image.pixel(row, col) else {
                continue;
            };
            let a = match alpha.map(|m| m.get(row, col)) {
                None => 255,
                Some(Ok(v)) if !v.is_nan() => (v.clamp(0.0, 1.0) * 255.0).round() as u8,
                Some(_) => 0,
            };
            let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            put(&mut rgba, (row * cols + col) * 4, [byte(r), byte(g), byte(b), a]);
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_to_rgba_basic() {
        let mut r = Raster::<f64>::new(2, 2);
        r.set(0, 0, 0.0).unwrap();
        r.set(0, 1, 0.5).unwrap();
        r.set(1, 0, 1.0).unwrap();
        r.set(1, 1, f64::NAN).unwrap();
        r.set_nodata(Some(f64::NAN));

        let gray = ColorRamp::from_colors((0.0, 1.0), &["000000", "ffffff"]).unwrap();
        let params = ColormapParams::from_ramp(gray);
        let rgba = raster_to_rgba(&r, &params);

        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[128, 128, 128, 255]);
        assert_eq!(&rgba[8..12], &[255, 255, 255, 255]);
        assert_eq!(&rgba[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn render_slope_layer() {
        let slope = Raster::from_vec(vec![0.0, 60.0, 75.0], 1, 3).unwrap();
        let rgba = render_layer(&slope, &ColorRamp::slope());
        assert_eq!(&rgba[0..4], &[255, 255, 255, 255]);
        assert_eq!(&rgba[4..8], &[165, 42, 42, 255]);
        assert_eq!(&rgba[8..12], &[165, 42, 42, 255]);
    }

    #[test]
    fn image_with_alpha() {
        let image = RgbImage::new(
            Raster::filled(1, 2, 1.0),
            Raster::filled(1, 2, 0.0),
            Raster::filled(1, 2, 0.0),
        )
        .unwrap();
        let alpha = Raster::from_vec(vec![0.5, f64::NAN], 1, 2).unwrap();

        let rgba = image_to_rgba(&image, Some(&alpha));
        assert_eq!(&rgba[0..4], &[255, 0, 0, 128]);
        assert_eq!(rgba[7], 0);

        let opaque = image_to_rgba(&image, None);
        assert_eq!(opaque[7], 255);
    }
}
