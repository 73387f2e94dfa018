//! Three-band color images
//!
//! Both image types hold `f64` bands in [0, 1] on a shared grid. A pixel is
//! valid only when all three bands are valid; a NaN in any band marks the
//! whole pixel as no-data.

use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster};

fn check_bands(a: &Raster<f64>, b: &Raster<f64>, c: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::size_mismatch(a.shape(), b.shape()));
    }
    if a.shape() != c.shape() {
        return Err(Error::size_mismatch(a.shape(), c.shape()));
    }
    Ok(())
}

fn pixel_of(bands: [&Raster<f64>; 3], row: usize, col: usize) -> Result<Option<[f64; 3]>> {
    let px = [
        bands[0].get(row, col)?,
        bands[1].get(row, col)?,
        bands[2].get(row, col)?,
    ];
    if px.iter().any(|v| v.is_nan()) {
        Ok(None)
    } else {
        Ok(Some(px))
    }
}

/// Hue-saturation-value image
#[derive(Debug, Clone)]
pub struct HsvImage {
    pub hue: Raster<f64>,
    pub saturation: Raster<f64>,
    pub value: Raster<f64>,
}

impl HsvImage {
    pub fn new(hue: Raster<f64>, saturation: Raster<f64>, value: Raster<f64>) -> Result<Self> {
        check_bands(&hue, &saturation, &value)?;
        Ok(Self {
            hue,
            saturation,
            value,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.hue.shape()
    }

    pub fn grid(&self) -> GridSpec {
        self.hue.grid()
    }

    /// `[h, s, v]` at (row, col), `None` where any band is no-data
    pub fn pixel(&self, row: usize, col: usize) -> Result<Option<[f64; 3]>> {
        pixel_of([&self.hue, &self.saturation, &self.value], row, col)
    }
}

/// Red-green-blue image with bands in [0, 1]
#[derive(Debug, Clone)]
pub struct RgbImage {
    pub red: Raster<f64>,
    pub green: Raster<f64>,
    pub blue: Raster<f64>,
}

impl RgbImage {
    pub fn new(red: Raster<f64>, green: Raster<f64>, blue: Raster<f64>) -> Result<Self> {
        check_bands(&red, &green, &blue)?;
        Ok(Self { red, green, blue })
    }

    /// Image on `grid` where every pixel is no-data
    pub fn nodata_on(grid: &GridSpec) -> Self {
        Self {
            red: Raster::nodata_on(grid),
            green: Raster::nodata_on(grid),
            blue: Raster::nodata_on(grid),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.red.shape()
    }

    pub fn grid(&self) -> GridSpec {
        self.red.grid()
    }

    pub fn bands(&self) -> [&Raster<f64>; 3] {
        [&self.red, &self.green, &self.blue]
    }

    /// `[r, g, b]` at (row, col), `None` where any band is no-data
    pub fn pixel(&self, row: usize, col: usize) -> Result<Option<[f64; 3]>> {
        pixel_of(self.bands(), row, col)
    }

    /// Interleaved 8-bit RGB, row-major, `rows * cols * 3` bytes.
    ///
    /// Bands are clamped to [0, 1] and scaled to 0..=255; no-data pixels
    /// are written as `nodata_color`.
    pub fn to_rgb8(&self, nodata_color: [u8; 3]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.red.len() * 3);
        let zipped = self
            .red
            .data()
            .iter()
            .zip(self.green.data().iter())
            .zip(self.blue.data().iter());

        for ((&r, &g), &b) in zipped {
            if r.is_nan() || g.is_nan() || b.is_nan() {
                out.extend_from_slice(&nodata_color);
            } else {
                out.extend_from_slice(&[to_byte(r), to_byte(g), to_byte(b)]);
            }
        }
        out
    }
}

fn to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
