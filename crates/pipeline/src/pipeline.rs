//! Terrain–vegetation composite pipeline
//!
//! [`CompositePipeline::build`] wires the stages into a [`CompositeGraph`]
//! of deferred nodes:
//!
//! ```text
//! dem ─┬─ slope ──────┐
//!      ├─ aspect ─────┼─ base (HSV → RGB) ─┐
//!      └─ hillshade ──┤                    ├─ composite
//!                     └─ bounds            │
//! spectral ── index ─┬─ overlay ───────────┤
//!                    └─ alpha ─────────────┘
//! ```
//!
//! Nothing is read or computed until [`CompositeGraph::materialize`] (or a
//! single node's `evaluate`) runs.

use std::sync::Arc;
use terraveg_algorithms::composite::{alpha_mask, encode, hsv_to_rgb, mosaic, Layer};
use terraveg_algorithms::imagery::normalized_difference_bands;
use terraveg_algorithms::stretch::{compute_bounds, StretchBounds};
use terraveg_algorithms::terrain::{Aspect, Hillshade, Slope};
use terraveg_colormap::{colorize, render_layer, ColorRamp, DisplayMetadata, LegendSpec};
use terraveg_core::raster::{GridSpec, MultiBandRaster, Raster, RgbImage};
use terraveg_core::region::apply_mask;
use terraveg_core::{Algorithm, Region};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::deferred::{Deferred, Evaluator};
use crate::error::{PipelineError, Result};
use crate::source::RasterSource;

/// Ramps used for the composite overlay and the optional display layers
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRamps {
    pub vegetation: ColorRamp,
    pub aspect: ColorRamp,
    pub slope: ColorRamp,
}

/// Independently renderable single-band products
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLayer {
    Vegetation,
    Aspect,
    Slope,
}

/// Configured pipeline bound to a raster source
pub struct CompositePipeline {
    config: Arc<PipelineConfig>,
    source: Arc<dyn RasterSource>,
    ramps: Arc<DisplayRamps>,
}

impl CompositePipeline {
    /// Validate `config` and bind it to `source`. Malformed configuration
    /// fails here, before any raster is touched.
    pub fn new(config: PipelineConfig, source: Arc<dyn RasterSource>) -> Result<Self> {
        config.validate()?;
        let ramps = DisplayRamps {
            vegetation: config.vegetation.ramp()?,
            aspect: ColorRamp::aspect_wheel(),
            slope: ColorRamp::slope(),
        };
        Ok(Self {
            config: Arc::new(config),
            source,
            ramps: Arc::new(ramps),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ramps(&self) -> &DisplayRamps {
        &self.ramps
    }

    /// Describe the composite for `region` without computing anything
    pub fn build(&self, region: &Region) -> CompositeGraph {
        let config = &self.config;

        let dem = {
            let source = Arc::clone(&self.source);
            let scale = config.stretch.scale;
            Deferred::source("dem", move |ev| {
                if let Some(dem) = source.elevation(ev.region())? {
                    // Sources are not required to clip
                    let mask = ev.mask_for(&dem.grid());
                    return Ok(apply_mask(&dem, &mask)?);
                }
                warn!("no elevation coverage, terrain channels will be empty");
                let bounds = ev
                    .region()
                    .bounds()
                    .ok_or_else(|| PipelineError::Source("region has no extent".into()))?;
                Ok(Raster::nodata_on(&GridSpec::covering(bounds, scale)?))
            })
        };

        let slope = {
            let params = config.terrain.slope_params();
            dem.map("slope", move |d| Ok(Slope.execute(d, &params)?))
        };
        let aspect = {
            let params = config.terrain.aspect_params();
            dem.map("aspect", move |d| Ok(Aspect.execute(d, &params)?))
        };
        let hillshade = {
            let params = config.terrain.hillshade_params();
            dem.map("hillshade", move |d| Ok(Hillshade.execute(d, &params)?))
        };

        let bounds = {
            let hillshade = hillshade.clone();
            let params = config.stretch.params();
            Deferred::source("bounds", move |ev| {
                let channel = hillshade.evaluate(ev)?;
                let mask = ev.mask_for(&channel.grid());
                let bounds = compute_bounds(&channel, Some(&mask), &params)?;
                match &bounds {
                    Some(b) if b.is_degenerate() => {
                        warn!("hillshade is constant over the region ({:.3})", b.low)
                    }
                    Some(_) => {}
                    None => warn!("no valid hillshade samples, stretch bounds undefined"),
                }
                Ok(bounds)
            })
        };

        let base = {
            let (aspect, slope, hillshade, bounds) =
                (aspect.clone(), slope.clone(), hillshade.clone(), bounds.clone());
            let encoding = config.encoding.encoding();
            Deferred::source("base", move |ev| {
                let (a, s, h) = (aspect.evaluate(ev)?, slope.evaluate(ev)?, hillshade.evaluate(ev)?);
                let b = bounds.evaluate(ev)?;
                let hsv = encode(&a, &s, &h, (*b).as_ref(), &encoding)?;
                Ok(hsv_to_rgb(&hsv)?)
            })
        };

        let spectral = {
            let source = Arc::clone(&self.source);
            let range = config.collection.date_range();
            let threshold = config.collection.cloud_threshold;
            let bands = config.requested_bands();
            Deferred::source("spectral", move |ev| {
                let composite = source.spectral_bands(ev.region(), &range, threshold, &bands)?;
                if composite.is_none() {
                    warn!(
                        "no scenes in {}..{} below {}% cloud, vegetation overlay is empty",
                        range.start, range.end, threshold
                    );
                }
                Ok(composite)
            })
        };

        let index = {
            let (dem, spectral) = (dem.clone(), spectral.clone());
            let nir = config.vegetation.nir_band.clone();
            let red = config.vegetation.red_band.clone();
            Deferred::source("index", move |ev| {
                let grid = dem.evaluate(ev)?.grid();
                let composite = spectral.evaluate(ev)?;
                let Some(bands) = &*composite else {
                    return Ok(Raster::nodata_on(&grid));
                };
                let index = normalized_difference_bands(bands, &nir, &red)?.resample_nearest(&grid);
                let mask = ev.mask_for(&grid);
                Ok(apply_mask(&index, &mask)?)
            })
        };

        let overlay = {
            let ramps = Arc::clone(&self.ramps);
            index.map("overlay", move |i| Ok(colorize(i, &ramps.vegetation)?))
        };
        let alpha = {
            let params = config.alpha.params();
            index.map("alpha", move |i| Ok(alpha_mask(i, &params)?))
        };

        let composite = base.zip3(&overlay, &alpha, "composite", |b, o, a| {
            Ok(mosaic(b, &[Layer::new(o, a)])?)
        });

        let metadata = {
            let ramps = Arc::clone(&self.ramps);
            let slope_cap = config.encoding.slope_cap;
            let attribution = config.legend.attribution.clone();
            bounds.map("metadata", move |b| {
                Ok(DisplayMetadata::for_composite(&LegendSpec {
                    vegetation: &ramps.vegetation,
                    aspect: &ramps.aspect,
                    slope: &ramps.slope,
                    slope_cap,
                    value_bounds: b.map(|b| (b.low, b.high)),
                    attribution: attribution.clone(),
                }))
            })
        };

        CompositeGraph {
            region: region.clone(),
            ramps: Arc::clone(&self.ramps),
            dem,
            slope,
            aspect,
            hillshade,
            bounds,
            base,
            spectral,
            index,
            overlay,
            alpha,
            composite,
            metadata,
        }
    }

    /// Build and materialize in one step
    pub fn run(&self, region: &Region) -> Result<CompositeProducts> {
        self.build(region).materialize()
    }
}

/// Deferred nodes of one composite
#[derive(Debug, Clone)]
pub struct CompositeGraph {
    region: Region,
    ramps: Arc<DisplayRamps>,
    pub dem: Deferred<Raster<f64>>,
    pub slope: Deferred<Raster<f64>>,
    pub aspect: Deferred<Raster<f64>>,
    pub hillshade: Deferred<Raster<f64>>,
    pub bounds: Deferred<Option<StretchBounds>>,
    pub base: Deferred<RgbImage>,
    pub spectral: Deferred<Option<MultiBandRaster>>,
    pub index: Deferred<Raster<f64>>,
    pub overlay: Deferred<RgbImage>,
    pub alpha: Deferred<Raster<f64>>,
    pub composite: Deferred<RgbImage>,
    pub metadata: Deferred<DisplayMetadata>,
}

fn owned<T: Clone>(value: Arc<T>) -> T {
    Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone())
}

impl CompositeGraph {
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Fresh evaluator for this graph's region
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.region.clone())
    }

    /// Evaluate every product
    pub fn materialize(&self) -> Result<CompositeProducts> {
        let mut ev = self.evaluator();
        info!("materializing composite");

        let composite = self.composite.evaluate(&mut ev)?;
        let terrain_rgb = self.base.evaluate(&mut ev)?;
        let vegetation_index = self.index.evaluate(&mut ev)?;
        let alpha = self.alpha.evaluate(&mut ev)?;
        let slope = self.slope.evaluate(&mut ev)?;
        let aspect = self.aspect.evaluate(&mut ev)?;
        let hillshade = self.hillshade.evaluate(&mut ev)?;
        let bounds = self.bounds.evaluate(&mut ev)?;
        let metadata = self.metadata.evaluate(&mut ev)?;

        info!(
            "composite ready: {}x{}, {} nodes evaluated",
            composite.shape().0,
            composite.shape().1,
            ev.cached()
        );
        drop(ev);

        Ok(CompositeProducts {
            composite: owned(composite),
            terrain_rgb: owned(terrain_rgb),
            vegetation_index: owned(vegetation_index),
            alpha: owned(alpha),
            slope: owned(slope),
            aspect: owned(aspect),
            hillshade: owned(hillshade),
            bounds: *bounds,
            metadata: owned(metadata),
            ramps: (*self.ramps).clone(),
        })
    }
}

/// Everything a renderer needs from one composite
#[derive(Debug, Clone)]
pub struct CompositeProducts {
    pub composite: RgbImage,
    /// Terrain base before the vegetation overlay
    pub terrain_rgb: RgbImage,
    pub vegetation_index: Raster<f64>,
    pub alpha: Raster<f64>,
    /// Degrees
    pub slope: Raster<f64>,
    /// Degrees clockwise from north
    pub aspect: Raster<f64>,
    pub hillshade: Raster<f64>,
    pub bounds: Option<StretchBounds>,
    pub metadata: DisplayMetadata,
    pub ramps: DisplayRamps,
}

impl CompositeProducts {
    /// RGBA buffer of a single-band display layer with its legend ramp
    pub fn display_layer(&self, layer: DisplayLayer) -> Vec<u8> {
        match layer {
            DisplayLayer::Vegetation => render_layer(&self.vegetation_index, &self.ramps.vegetation),
            DisplayLayer::Aspect => render_layer(&self.aspect, &self.ramps.aspect),
            DisplayLayer::Slope => render_layer(&self.slope, &self.ramps.slope),
        }
    }
}
