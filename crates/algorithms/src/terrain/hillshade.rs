//! Hillshade (shaded relief) calculation
//!
//! Creates a shaded relief visualization from a DEM based on
//! illumination angle and direction.

use terraveg_core::raster::Raster;
use terraveg_core::{Algorithm, Error, Result};

use super::derivatives::{extract_window, horn, scaled_cell_sizes};
use crate::kernel::{build_output, fill_rows};

/// Parameters for hillshade calculation
#[derive(Debug, Clone)]
pub struct HillshadeParams {
    /// Sun azimuth in degrees (0 = North, clockwise)
    pub azimuth: f64,
    /// Sun altitude in degrees above horizon (0-90)
    pub altitude: f64,
    /// Z-factor for vertical exaggeration
    pub z_factor: f64,
    /// Output range: false = 0-255, true = 0.0-1.0
    pub normalized: bool,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 270.0, // W illumination
            altitude: 45.0,
            z_factor: 1.0,
            normalized: false,
        }
    }
}

/// Hillshade algorithm
#[derive(Debug, Clone, Default)]
pub struct Hillshade;

impl Algorithm for Hillshade {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = HillshadeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Hillshade"
    }

    fn description(&self) -> &'static str {
        "Calculate shaded relief from a DEM"
    }

    fn execute(&self, input: &Self::Input, params: &Self::Params) -> Result<Self::Output> {
        hillshade(input, params)
    }
}

/// Calculate hillshade from a DEM
///
/// ```text
/// shade = cos(zenith) * cos(slope) + sin(zenith) * sin(slope) * cos(azimuth - aspect)
/// ```
///
/// clamped below at 0 and scaled to 0-255 (or left in 0-1 when
/// `normalized`). No-data cells and windows touching no-data are NaN.
pub fn hillshade(dem: &Raster<f64>, params: &HillshadeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let (dx, dy) = scaled_cell_sizes(dem, params.z_factor);

    let azimuth_rad = params.azimuth.to_radians();
    let zenith_rad = (90.0 - params.altitude).to_radians();
    let cos_zenith = zenith_rad.cos();
    let sin_zenith = zenith_rad.sin();
    let scale = if params.normalized { 1.0 } else { 255.0 };

    let output_data = fill_rows(rows, cols, |row, row_data| {
        for (col, out) in row_data.iter_mut().enumerate() {
            let Some(window) = extract_window(dem, row, col) else {
                continue;
            };
            let gradient = horn(window, dx, dy);
            let slope_rad = gradient.slope_radians();
            let aspect_rad = gradient.aspect_radians();

            let shade = cos_zenith * slope_rad.cos()
                + sin_zenith * slope_rad.sin() * (azimuth_rad - aspect_rad).cos();

            *out = shade.clamp(0.0, 1.0) * scale;
        }
    });

    build_output(dem, output_data)
}
