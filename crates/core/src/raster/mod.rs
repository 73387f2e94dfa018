//! Raster data structures

mod bands;
mod element;
mod geotransform;
mod grid;
mod image;

pub use bands::MultiBandRaster;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{GridSpec, Raster, RasterStatistics};
pub use image::{HsvImage, RgbImage};
