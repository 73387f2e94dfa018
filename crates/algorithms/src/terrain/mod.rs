//! Terrain analysis algorithms
//!
//! Algorithms for analyzing Digital Elevation Models (DEMs):
//! - Slope: rate of change of elevation
//! - Aspect: direction of steepest descent
//! - Hillshade: shaded relief visualization

mod aspect;
pub mod derivatives;
mod hillshade;
mod slope;

pub use aspect::{aspect, Aspect, AspectOutput, AspectParams};
pub use derivatives::Gradient;
pub use hillshade::{hillshade, Hillshade, HillshadeParams};
pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
