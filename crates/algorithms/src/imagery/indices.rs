//! Spectral vegetation indices
//!
//! Indices computed from multispectral imagery. Inputs are single-band
//! rasters on the same grid, or a named band stack.

use terraveg_core::raster::{MultiBandRaster, Raster};
use terraveg_core::Result;
use tracing::debug;

use crate::kernel::{build_output, check_dimensions, fill_rows, is_valid};

/// Sums closer to zero than this leave the index undefined
pub const ZERO_SUM_EPSILON: f64 = 1e-10;

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Inputs are expected to be non-negative reflectances. Mixed-sign pairs
/// (e.g. over-corrected surface reflectance) can push the ratio outside
/// [-1, 1]; the result is clamped to that range. Pixels where the sum
/// vanishes or either band is nodata are set to NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data = fill_rows(rows, cols, |row, row_data| {
        for (col, out) in row_data.iter_mut().enumerate() {
            // SAFETY: row < rows and col < cols, shapes checked above
            let a = unsafe { band_a.get_unchecked(row, col) };
            let b = unsafe { band_b.get_unchecked(row, col) };

            if !is_valid(a, nodata_a) || !is_valid(b, nodata_b) {
                continue;
            }

            let sum = a + b;
            if sum.abs() < ZERO_SUM_EPSILON {
                continue;
            }

            *out = ((a - b) / sum).clamp(-1.0, 1.0);
        }
    });

    build_output(band_a, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized difference of two named bands from a stack
///
/// Errors with `MissingBand` if either name is absent.
pub fn normalized_difference_bands(
    bands: &MultiBandRaster,
    positive: &str,
    negative: &str,
) -> Result<Raster<f64>> {
    let a = bands.require(positive)?;
    let b = bands.require(negative)?;
    debug!("normalized difference ({} - {}) / ({} + {})", positive, negative, positive, negative);
    normalized_difference(a, b)
}
