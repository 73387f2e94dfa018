//! Slope calculation from DEMs
//!
//! Calculates the rate of change of elevation using the Horn (1981) method,
//! which uses a 3x3 neighborhood to compute partial derivatives.

use terraveg_core::raster::Raster;
use terraveg_core::{Algorithm, Error, Result};

use super::derivatives::{extract_window, horn, scaled_cell_sizes};
use crate::kernel::{build_output, fill_rows};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent (0-infinity, typically 0-100+)
    Percent,
    /// Radians (0-π/2)
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    /// Output units
    pub units: SlopeUnits,
    /// Z-factor for unit conversion (default 1.0)
    /// Use ~111320 for lat/lon DEMs with meters elevation
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Calculate slope (rate of change of elevation) from a DEM using Horn's method"
    }

    fn execute(&self, input: &Self::Input, params: &Self::Params) -> Result<Self::Output> {
        slope(input, params)
    }
}

/// Calculate slope from a DEM
///
/// slope = atan(sqrt(dz/dx² + dz/dy²)) with Horn's gradient. Edge cells
/// reuse the center value for missing neighbours; any no-data in the window
/// yields NaN.
///
/// # Arguments
/// * `dem` - Input DEM raster
/// * `params` - Slope calculation parameters
///
/// # Returns
/// Raster with slope values in the specified units
pub fn slope(dem: &Raster<f64>, params: &SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let (dx, dy) = scaled_cell_sizes(dem, params.z_factor);
    let units = params.units;

    let output_data = fill_rows(rows, cols, |row, row_data| {
        for (col, out) in row_data.iter_mut().enumerate() {
            let Some(window) = extract_window(dem, row, col) else {
                continue;
            };
            let slope_rad = horn(window, dx, dy).slope_radians();

            *out = match units {
                SlopeUnits::Degrees => slope_rad.to_degrees(),
                SlopeUnits::Percent => slope_rad.tan() * 100.0,
                SlopeUnits::Radians => slope_rad,
            };
        }
    });

    build_output(dem, output_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terraveg_core::GeoTransform;

    fn create_test_dem() -> Raster<f64> {
        // Tilted plane: z = row + col
        let mut dem = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, (row + col) as f64).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_slope_flat() {
        let mut dem: Raster<f64> = Raster::filled(10, 10, 100.0);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        let result = slope(&dem, &SlopeParams::default()).unwrap();

        for row in 0..10 {
            for col in 0..10 {
                assert_eq!(result.get(row, col).unwrap(), 0.0);
            }
        }
    }

    #[test]
    fn test_slope_tilted() {
        let dem = create_test_dem();
        let result = slope(&dem, &SlopeParams::default()).unwrap();

        // Gradient of (1, 1) per unit cell
        let expected = 2f64.sqrt().atan().to_degrees();
        assert_relative_eq!(result.get(3, 3).unwrap(), expected, epsilon = 1e-9);
        assert_relative_eq!(result.get(5, 5).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_slope_edges_are_valid() {
        let dem = create_test_dem();
        let result = slope(&dem, &SlopeParams::default()).unwrap();

        assert_eq!(result.valid_count(), 100);
        let corner = result.get(0, 0).unwrap();
        assert!(corner > 0.0 && corner < 90.0);
    }

    #[test]
    fn test_slope_nodata_gap() {
        let mut dem = create_test_dem();
        dem.set(4, 4, f64::NAN).unwrap();
        let result = slope(&dem, &SlopeParams::default()).unwrap();

        for row in 3..=5 {
            for col in 3..=5 {
                assert!(result.get(row, col).unwrap().is_nan());
            }
        }
        assert!(!result.get(0, 0).unwrap().is_nan());
        assert!(!result.get(7, 7).unwrap().is_nan());
    }

    #[test]
    fn test_slope_units() {
        let dem = create_test_dem();

        let deg = slope(&dem, &SlopeParams { units: SlopeUnits::Degrees, z_factor: 1.0 }).unwrap();
        let rad = slope(&dem, &SlopeParams { units: SlopeUnits::Radians, z_factor: 1.0 }).unwrap();
        let pct = slope(&dem, &SlopeParams { units: SlopeUnits::Percent, z_factor: 1.0 }).unwrap();

        let deg_val = deg.get(5, 5).unwrap();
        let rad_val = rad.get(5, 5).unwrap();
        let pct_val = pct.get(5, 5).unwrap();

        assert_relative_eq!(deg_val, rad_val.to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(pct_val, rad_val.tan() * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slope_algorithm_trait() {
        let dem = create_test_dem();
        let via_trait = Slope.execute_default(&dem).unwrap();
        let direct = slope(&dem, &SlopeParams::default()).unwrap();
        assert_eq!(via_trait.get(2, 2).unwrap(), direct.get(2, 2).unwrap());
        assert_eq!(Slope.name(), "Slope");
    }
}
