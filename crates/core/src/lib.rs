//! # terraveg Core
//!
//! Core types, traits and I/O shared by the terraveg crates.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced single-band grid with a no-data convention
//! - `GeoTransform` / `GridSpec`: affine georeferencing and sampling grids
//! - `MultiBandRaster`: named, co-registered band stacks (spectral composites)
//! - `HsvImage` / `RgbImage`: three-band color images with bands in [0, 1]
//! - `Region`: the immutable area of interest every raster is clipped to
//! - GeoTIFF reading and writing

pub mod error;
pub mod io;
pub mod raster;
pub mod region;

pub use error::{Error, Result};
pub use raster::{
    GeoTransform, GridSpec, HsvImage, MultiBandRaster, Raster, RasterElement, RgbImage,
};
pub use region::Region;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        GeoTransform, GridSpec, HsvImage, MultiBandRaster, Raster, RasterElement, RgbImage,
    };
    pub use crate::region::Region;
    pub use crate::Algorithm;
}

/// Core trait for raster algorithms.
///
/// Algorithms are pure functions of their input and parameters: they never
/// modify the input and always return a freshly allocated output.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: &Self::Input,
        params: &Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: &Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, &Self::Params::default())
    }
}
