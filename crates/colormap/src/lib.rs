//! # terraveg Colormap
//!
//! Color ramps, colorization and legend metadata for terraveg.
//!
//! A [`ColorRamp`] stretches a multi-stop palette over a value domain.
//! [`colorize`] turns a single-band raster into an `RgbImage` for
//! compositing, [`render_layer`] / [`raster_to_rgba`] produce RGBA buffers
//! for display, and [`DisplayMetadata`] carries the legend as data.
//!
//! ## Usage
//!
//! ```ignore
//! use terraveg_colormap::{colorize, ColorRamp};
//!
//! let overlay = colorize(&ndvi, &ColorRamp::ndvi_diverging())?;
//! ```

mod colorize;
mod legend;
mod render;
mod scheme;

pub use colorize::colorize;
pub use legend::{DisplayMetadata, EncodingLegend, LegendEntry, LegendSpec};
pub use render::{image_to_rgba, raster_to_rgba, render_layer, ColormapParams};
pub use scheme::{ColorRamp, ColorStop, Rgb};
