//! Masked layer mosaic over an opaque base image

use ndarray::Array2;
use terraveg_core::raster::{Raster, RgbImage};
use terraveg_core::{Error, Result};
use tracing::debug;

use crate::kernel::is_valid;

/// An overlay image with its per-pixel opacity
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub image: &'a RgbImage,
    /// Opacity in [0, 1]; values above 1 are treated as 1
    pub mask: &'a Raster<f64>,
}

impl<'a> Layer<'a> {
    pub fn new(image: &'a RgbImage, mask: &'a Raster<f64>) -> Self {
        Self { image, mask }
    }
}

/// Blend `layers` (bottom first) over `base`.
///
/// For each layer and pixel: an invalid overlay pixel, or a mask that is
/// no-data or not positive, leaves the running result untouched. Otherwise
/// `out = m * overlay + (1 - m) * out` with `m = min(mask, 1)`. Where the
/// running result is itself no-data, a contributing overlay pixel is
/// written as is.
pub fn mosaic(base: &RgbImage, layers: &[Layer<'_>]) -> Result<RgbImage> {
    let shape = base.shape();
    let [r0, g0, b0] = base.bands();
    let mut out: [Array2<f64>; 3] = [r0.data().clone(), g0.data().clone(), b0.data().clone()];

    for (i, layer) in layers.iter().enumerate() {
        if layer.image.shape() != shape {
            return Err(Error::size_mismatch(shape, layer.image.shape()));
        }
        if layer.mask.shape() != shape {
            return Err(Error::size_mismatch(shape, layer.mask.shape()));
        }

        let overlay = layer.image.bands().map(|b| b.data());
        let mask_nodata = layer.mask.nodata();
        let mut blended = 0usize;

        for ((row, col), &m) in layer.mask.data().indexed_iter() {
            if !is_valid(m, mask_nodata) || m <= 0.0 {
                continue;
            }
            let px = [overlay[0][[row, col]], overlay[1][[row, col]], overlay[2][[row, col]]];
            if px.iter().any(|v| v.is_nan()) {
                continue;
            }

            let m = m.min(1.0);
            let below_valid = out.iter().all(|band| !band[[row, col]].is_nan());
            for (band, v) in out.iter_mut().zip(px) {
                let cell = &mut band[[row, col]];
                *cell = if below_valid { m * v + (1.0 - m) * *cell } else { v };
            }
            blended += 1;
        }
        debug!("layer {}: {} pixels blended", i, blended);
    }

    let [red, green, blue] = out;
    RgbImage::new(
        r0.with_data(red, Some(f64::NAN))?,
        r0.with_data(green, Some(f64::NAN))?,
        r0.with_data(blue, Some(f64::NAN))?,
    )
}

/// Blend a single masked overlay over `base`
pub fn composite(base: &RgbImage, overlay: &RgbImage, mask: &Raster<f64>) -> Result<RgbImage> {
    mosaic(base, &[Layer::new(overlay, mask)])
}
