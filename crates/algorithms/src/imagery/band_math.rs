//! Band math operations
//!
//! Raster algebra: apply a function to every valid cell of a raster.

use terraveg_core::raster::Raster;
use terraveg_core::Result;

use crate::kernel::{build_output, fill_rows, is_valid};

/// Apply a unary function to every cell in a raster.
///
/// Nodata cells stay NaN in the output.
///
/// # Example
/// ```ignore
/// let reflectance = band_math(&digital_numbers, |v| v * 0.0001)?;
/// let boosted = band_math(&normalized, |v| v.powf(1.2))?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let data = fill_rows(rows, cols, |row, row_data| {
        for (col, out) in row_data.iter_mut().enumerate() {
            // SAFETY: fill_rows stays within the raster's shape
            let val = unsafe { raster.get_unchecked(row, col) };
            if is_valid(val, nodata) {
                *out = f(val);
            }
        }
    });

    build_output(raster, data)
}

/// Clamp `value` to `[lo, hi]`, passing NaN through
#[inline]
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.max(lo).min(hi)
    }
}
