//! Horn (1981) surface gradient from 3×3 DEM windows
//!
//! ```text
//! 3×3 window indexing:
//!
//!   z1 z2 z3      (NW) (N) (NE)
//!   z4 z5 z6  →   (W)  (C) (E)
//!   z7 z8 z9      (SW) (S) (SE)
//! ```
//!
//! Slope, aspect and hillshade all derive from the same gradient so the
//! three terrain channels agree cell for cell.
//!
//! Reference:
//! Horn, B.K.P. (1981). Hill shading and the reflectance map. IEEE.

use std::f64::consts::PI;
use terraveg_core::raster::Raster;

use crate::kernel::is_valid;

/// Gradients below this magnitude are treated as flat
pub const FLAT_THRESHOLD: f64 = 1e-10;

/// First-order surface gradient in geographic orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    /// ∂z/∂x, positive when elevation rises to the east
    pub east: f64,
    /// ∂z/∂y, positive when elevation rises to the north
    pub north: f64,
}

impl Gradient {
    /// Gradient magnitude √(p² + q²)
    #[inline]
    pub fn magnitude(&self) -> f64 {
        (self.east * self.east + self.north * self.north).sqrt()
    }

    /// Slope angle in radians, [0, π/2)
    #[inline]
    pub fn slope_radians(&self) -> f64 {
        self.magnitude().atan()
    }

    #[inline]
    pub fn is_flat(&self) -> bool {
        self.east.abs() < FLAT_THRESHOLD && self.north.abs() < FLAT_THRESHOLD
    }

    /// Downslope compass bearing in radians: 0 = north, clockwise, [0, 2π).
    ///
    /// Flat cells face north (0).
    #[inline]
    pub fn aspect_radians(&self) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        let bearing = (-self.east).atan2(-self.north);
        if bearing < 0.0 {
            bearing + 2.0 * PI
        } else {
            bearing
        }
    }
}

/// Horn gradient of a window with cell sizes `dx` (east) and `dy` (north).
#[inline]
pub fn horn(z: [f64; 9], dx: f64, dy: f64) -> Gradient {
    let [z1, z2, z3, z4, _z5, z6, z7, z8, z9] = z;

    Gradient {
        east: ((z3 + 2.0 * z6 + z9) - (z1 + 2.0 * z4 + z7)) / (8.0 * dx),
        // Rows grow southward, so the north gradient is top minus bottom.
        north: ((z1 + 2.0 * z2 + z3) - (z7 + 2.0 * z8 + z9)) / (8.0 * dy),
    }
}

/// 3×3 window around (row, col) in row-major order [NW, N, NE, W, C, E, SW, S, SE].
///
/// Neighbours beyond the raster edge take the center value. Returns `None`
/// if the center or any in-bounds neighbour is no-data.
#[inline]
pub fn extract_window(dem: &Raster<f64>, row: usize, col: usize) -> Option<[f64; 9]> {
    let (rows, cols) = dem.shape();
    let nodata = dem.nodata();
    let data = dem.data();

    let center = data[[row, col]];
    if !is_valid(center, nodata) {
        return None;
    }

    let mut window = [center; 9];
    for (i, (dr, dc)) in [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 0),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ]
    .into_iter()
    .enumerate()
    {
        let r = row as isize + dr;
        let c = col as isize + dc;
        if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
            continue;
        }
        let v = data[[r as usize, c as usize]];
        if !is_valid(v, nodata) {
            return None;
        }
        window[i] = v;
    }

    Some(window)
}

/// Cell sizes `(dx, dy)` of a DEM scaled by `z_factor`
pub(crate) fn scaled_cell_sizes(dem: &Raster<f64>, z_factor: f64) -> (f64, f64) {
    let (dx, dy) = dem.transform().cell_sizes();
    (dx * z_factor, dy * z_factor)
}
