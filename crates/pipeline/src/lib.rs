//! # terraveg Pipeline
//!
//! Terrain–vegetation compositing as a deferred raster graph.
//!
//! A [`CompositePipeline`] is built from an immutable [`PipelineConfig`] and
//! a [`RasterSource`]. For a [`Region`](terraveg_core::Region) it yields a
//! [`CompositeGraph`] whose nodes compute nothing until materialized:
//!
//! ```ignore
//! use std::sync::Arc;
//! use terraveg_pipeline::{CompositePipeline, PipelineConfig, SceneManifest};
//!
//! let catalog = SceneManifest::from_file("scenes.toml")?.load()?;
//! let pipeline = CompositePipeline::new(PipelineConfig::default(), Arc::new(catalog))?;
//! let products = pipeline.run(&region)?;
//! println!("{}", products.metadata.to_json()?);
//! ```

pub mod config;
pub mod deferred;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod source;

pub use config::{
    AlphaConfig, CollectionConfig, EncodingConfig, LegendConfig, PipelineConfig, RegionConfig,
    StretchConfig, TerrainConfig, VegetationConfig,
};
pub use deferred::{Deferred, Evaluator, NodeId};
pub use error::{ConfigError, PipelineError, Result};
pub use manifest::{SceneEntry, SceneManifest};
pub use pipeline::{CompositeGraph, CompositePipeline, CompositeProducts, DisplayLayer, DisplayRamps};
pub use source::{median_composite, DateRange, RasterSource, Scene, SceneCatalog};
