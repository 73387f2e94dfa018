//! Shared plumbing for cell-wise kernels

use crate::maybe_rayon::*;
use ndarray::Array2;
use terraveg_core::raster::Raster;
use terraveg_core::{Error, Result};

/// Whether `value` is a usable sample given the raster's no-data value
#[inline]
pub(crate) fn is_valid(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    match nodata {
        Some(nd) if !nd.is_nan() => (value - nd).abs() >= f64::EPSILON,
        _ => true,
    }
}

/// Fill a `rows * cols` buffer row by row. Cells the closure leaves alone
/// stay NaN (no-data).
pub(crate) fn fill_rows<F>(rows: usize, cols: usize, f: F) -> Vec<f64>
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            f(row, &mut row_data);
            row_data
        })
        .collect()
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::size_mismatch(a.shape(), b.shape()));
    }
    Ok(())
}

/// Wrap kernel output in a raster on the template's grid, NaN as no-data
pub(crate) fn build_output(template: &Raster<f64>, data: Vec<f64>) -> Result<Raster<f64>> {
    let array =
        Array2::from_shape_vec(template.shape(), data).map_err(|e| Error::Other(e.to_string()))?;
    template.with_data(array, Some(f64::NAN))
}

/// Map three co-registered bands pixel by pixel into three new bands.
///
/// A pixel with any invalid input band is passed to `f` as NaN in that band.
pub(crate) fn map_bands3<F>(
    bands: [&Raster<f64>; 3],
    f: F,
) -> Result<[Raster<f64>; 3]>
where
    F: Fn([f64; 3]) -> [f64; 3],
{
    check_dimensions(bands[0], bands[1])?;
    check_dimensions(bands[0], bands[2])?;

    let shape = bands[0].shape();
    let mut out = [
        Array2::from_elem(shape, f64::NAN),
        Array2::from_elem(shape, f64::NAN),
        Array2::from_elem(shape, f64::NAN),
    ];

    for ((row, col), &a) in bands[0].data().indexed_iter() {
        let mut px = [a, bands[1].data()[[row, col]], bands[2].data()[[row, col]]];
        for (v, band) in px.iter_mut().zip(bands) {
            if !is_valid(*v, band.nodata()) {
                *v = f64::NAN;
            }
        }
        let mapped = f(px);
        for (dst, v) in out.iter_mut().zip(mapped) {
            dst[[row, col]] = v;
        }
    }

    let [r, g, b] = out;
    Ok([
        bands[0].with_data(r, Some(f64::NAN))?,
        bands[0].with_data(g, Some(f64::NAN))?,
        bands[0].with_data(b, Some(f64::NAN))?,
    ])
}
