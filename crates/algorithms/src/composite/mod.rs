//! Terrain–vegetation compositing
//!
//! - HSV encoding of terrain channels and HSV ↔ RGB conversion
//! - Alpha masks from a vegetation index
//! - Masked mosaic of overlay layers onto an opaque base

pub mod alpha;
pub mod hsv;
pub mod mosaic;

pub use alpha::{alpha_mask, AlphaParams};
pub use hsv::{
    encode, hsv_to_rgb, hsv_to_rgb_pixel, hue_from_aspect, rgb_to_hsv, rgb_to_hsv_pixel,
    saturation_from_slope, value_from_normalized, HsvEncoding,
};
pub use mosaic::{composite, mosaic, Layer};
