//! Aspect calculation from DEMs
//!
//! Calculates the direction of the steepest descent using the Horn (1981) method.

use terraveg_core::raster::Raster;
use terraveg_core::{Algorithm, Error, Result};

use super::derivatives::{extract_window, horn, scaled_cell_sizes};
use crate::kernel::{build_output, fill_rows};

/// Output format for aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectOutput {
    /// Degrees (0-360, 0=North, clockwise)
    #[default]
    Degrees,
    /// Radians (0-2π)
    Radians,
}

/// Parameters for aspect calculation
#[derive(Debug, Clone)]
pub struct AspectParams {
    pub output: AspectOutput,
    /// Z-factor applied to the cell size, as for slope
    pub z_factor: f64,
}

impl Default for AspectParams {
    fn default() -> Self {
        Self {
            output: AspectOutput::Degrees,
            z_factor: 1.0,
        }
    }
}

/// Aspect algorithm
#[derive(Debug, Clone, Default)]
pub struct Aspect;

impl Algorithm for Aspect {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = AspectParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Aspect"
    }

    fn description(&self) -> &'static str {
        "Calculate aspect (direction of steepest descent) from a DEM"
    }

    fn execute(&self, input: &Self::Input, params: &Self::Params) -> Result<Self::Output> {
        aspect(input, params)
    }
}

/// Calculate aspect from a DEM
///
/// Aspect is measured clockwise from north:
/// - 0° = North
/// - 90° = East
/// - 180° = South
/// - 270° = West
///
/// Values lie in [0, 360). Flat cells get 0, which is a valid value, so a
/// flat DEM produces no gaps.
pub fn aspect(dem: &Raster<f64>, params: &AspectParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let (dx, dy) = scaled_cell_sizes(dem, params.z_factor);
    let output = params.output;

    let output_data = fill_rows(rows, cols, |row, row_data| {
        for (col, out) in row_data.iter_mut().enumerate() {
            let Some(window) = extract_window(dem, row, col) else {
                continue;
            };
            let bearing = horn(window, dx, dy).aspect_radians();

            *out = match output {
                AspectOutput::Degrees => {
                    let deg = bearing.to_degrees();
                    // 2π - ε rounds up to 360 in degrees
                    if deg >= 360.0 {
                        0.0
                    } else {
                        deg
                    }
                }
                AspectOutput::Radians => bearing,
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

    fn plane(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(7, 7);
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        for row in 0..7 {
            for col in 0..7 {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_aspect_cardinal_directions() {
        // Elevation decreasing eastward: faces east
        let east = plane(|_, c| 100.0 - c as f64);
        // Elevation increasing southward (rows go south): faces north
        let north = plane(|r, _| 100.0 + r as f64);
        // Elevation decreasing southward: faces south
        let south = plane(|r, _| 100.0 - r as f64);
        // Elevation increasing eastward: faces west
        let west = plane(|_, c| 100.0 + c as f64);

        let params = AspectParams::default();
        assert_relative_eq!(aspect(&east, &params).unwrap().get(3, 3).unwrap(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(aspect(&north, &params).unwrap().get(3, 3).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(aspect(&south, &params).unwrap().get(3, 3).unwrap(), 180.0, epsilon = 1e-9);
        assert_relative_eq!(aspect(&west, &params).unwrap().get(3, 3).unwrap(), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aspect_flat_is_zero_and_valid() {
        let dem = plane(|_, _| 42.0);
        let result = aspect(&dem, &AspectParams::default()).unwrap();
        assert_eq!(result.valid_count(), 49);
        for row in 0..7 {
            for col in 0..7 {
                assert_eq!(result.get(row, col).unwrap(), 0.0);
            }
        }
    }

    #[test]
    fn test_aspect_range() {
        let dem = plane(|r, c| ((r * 7 + c) as f64 * 0.7).sin() * 20.0);
        let result = aspect(&dem, &AspectParams::default()).unwrap();
        for row in 0..7 {
            for col in 0..7 {
                let v = result.get(row, col).unwrap();
                assert!((0.0..360.0).contains(&v), "aspect {} out of range", v);
            }
        }
    }

    #[test]
    fn test_aspect_radians() {
        let dem = plane(|r, _| 100.0 - r as f64);
        let params = AspectParams {
            output: AspectOutput::Radians,
            ..Default::default()
        };
        let result = Aspect.execute(&dem, &params).unwrap();
        assert_relative_eq!(result.get(3, 3).unwrap(), std::f64::consts::PI, epsilon = 1e-9);
    }
}
