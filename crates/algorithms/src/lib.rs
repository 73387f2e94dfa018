//! # terraveg Algorithms
//!
//! Eager raster kernels behind the terrain–vegetation composite.
//!
//! ## Available Algorithm Categories
//!
//! - **terrain**: Slope, aspect, hillshade (Horn gradient)
//! - **imagery**: Normalized difference, NDVI, band math
//! - **stretch**: Region percentile bounds and linear normalization
//! - **composite**: HSV encoding, alpha masks, layer mosaic
//!
//! Kernels run row-parallel with the `parallel` feature and sequentially
//! otherwise.

mod kernel;
mod maybe_rayon;

pub mod composite;
pub mod imagery;
pub mod stretch;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::composite::{
        alpha_mask, composite, encode, hsv_to_rgb, mosaic, rgb_to_hsv, AlphaParams, HsvEncoding,
        Layer,
    };
    pub use crate::imagery::{band_math, ndvi, normalized_difference};
    pub use crate::stretch::{compute_bounds, normalize, StretchBounds, StretchParams};
    pub use crate::terrain::{
        aspect, hillshade, slope, Aspect, AspectOutput, AspectParams, Hillshade, HillshadeParams,
        Slope, SlopeParams, SlopeUnits,
    };
    pub use terraveg_core::prelude::*;
}
