//! Imagery analysis algorithms
//!
//! Algorithms for remote sensing and spectral analysis:
//! - Normalized difference: generic two-band index, NDVI
//! - Band math: cell-wise raster algebra

mod band_math;
mod indices;

pub use band_math::{band_math, clamp};
pub use indices::{ndvi, normalized_difference, normalized_difference_bands, ZERO_SUM_EPSILON};
