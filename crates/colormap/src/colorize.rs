//! Single-band raster → RGB image through a color ramp

use ndarray::Array2;
use terraveg_core::raster::{Raster, RasterElement, RgbImage};
use terraveg_core::Result;

use crate::scheme::ColorRamp;

/// Colorize `values` with `ramp`. No-data cells are no-data in all three
/// bands; values outside the ramp domain take the end colors.
pub fn colorize(values: &Raster<f64>, ramp: &ColorRamp) -> Result<RgbImage> {
    let shape = values.shape();
    let nodata = values.nodata();
    let mut bands = [
        Array2::from_elem(shape, f64::NAN),
        Array2::from_elem(shape, f64::NAN),
        Array2::from_elem(shape, f64::NAN),
    ];

    for ((row, col), v) in values.data().indexed_iter() {
        if v.is_nodata(nodata) {
            continue;
        }
        let color = ramp.evaluate(*v);
        for (band, c) in bands.iter_mut().zip(color) {
            band[[row, col]] = c;
        }
    }

    let [red, green, blue] = bands;
    RgbImage::new(
        values.with_data(red, Some(f64::NAN))?,
        values.with_data(green, Some(f64::NAN))?,
        values.with_data(blue, Some(f64::NAN))?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_index() {
        let index = Raster::from_vec(vec![-1.0, 0.0, 1.0, f64::NAN, 2.0], 1, 5).unwrap();
        let image = colorize(&index, &ColorRamp::ndvi_diverging()).unwrap();

        assert_eq!(image.pixel(0, 0).unwrap(), Some([0.0, 0.0, 1.0]));
        assert_eq!(image.pixel(0, 1).unwrap(), Some([1.0, 1.0, 1.0]));
        assert_eq!(image.pixel(0, 2).unwrap(), Some([0.0, 1.0, 0.0]));
        assert_eq!(image.pixel(0, 3).unwrap(), None);
        assert_eq!(image.pixel(0, 4).unwrap(), Some([0.0, 1.0, 0.0]));
    }

    #[test]
    fn colorize_keeps_georeferencing() {
        let mut values = Raster::filled(2, 3, 30.0);
        values.set_transform(terraveg_core::GeoTransform::new(10.0, 20.0, 5.0, -5.0));
        let image = colorize(&values, &ColorRamp::slope()).unwrap();
        assert_eq!(image.red.transform(), values.transform());
        assert_eq!(image.shape(), (2, 3));
    }
}
