//! Raster sources
//!
//! A [`RasterSource`] hands the pipeline an elevation model and a
//! cloud-filtered spectral composite for a region. `Ok(None)` means the
//! source has no coverage, which the pipeline handles by substitution.
//!
//! [`SceneCatalog`] is the in-memory implementation: a DEM plus a list of
//! dated scenes, reduced to a per-pixel median composite.

use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use terraveg_core::raster::{MultiBandRaster, Raster};
use terraveg_core::Region;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Acquisition window, start inclusive and end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(PipelineError::Source(format!(
                "empty date range {} .. {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Provider of elevation and spectral imagery for a region
pub trait RasterSource: Send + Sync {
    /// Elevation in meters over the region, `None` without coverage
    fn elevation(&self, region: &Region) -> Result<Option<Raster<f64>>>;

    /// Median composite of the scenes acquired within `range` with cloud
    /// cover strictly below `cloud_threshold` percent, restricted to
    /// `bands`. `None` when no scene qualifies.
    fn spectral_bands(
        &self,
        region: &Region,
        range: &DateRange,
        cloud_threshold: f64,
        bands: &[String],
    ) -> Result<Option<MultiBandRaster>>;
}

/// One multispectral acquisition
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub acquired: NaiveDate,
    /// Scene-level cloud cover, percent
    pub cloud_cover: f64,
    pub bands: MultiBandRaster,
}

/// In-memory elevation model and scene collection
#[derive(Debug, Clone, Default)]
pub struct SceneCatalog {
    elevation: Option<Raster<f64>>,
    scenes: Vec<Scene>,
}

impl SceneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elevation(mut self, dem: Raster<f64>) -> Self {
        self.elevation = Some(dem);
        self
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn add_scene(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Scenes passing the date and cloud filters, in catalog order
    pub fn filter<'a>(
        &'a self,
        range: &'a DateRange,
        cloud_threshold: f64,
    ) -> impl Iterator<Item = &'a Scene> + 'a {
        self.scenes
            .iter()
            .filter(move |s| range.contains(s.acquired) && s.cloud_cover < cloud_threshold)
    }
}

/// Median of the valid values, `NaN` if there are none
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Per-pixel median of co-registered rasters, ignoring no-data
pub fn median_composite(layers: &[&Raster<f64>]) -> Result<Option<Raster<f64>>> {
    let Some(first) = layers.first() else {
        return Ok(None);
    };
    let shape = first.shape();
    if let Some(bad) = layers.iter().find(|l| l.shape() != shape) {
        return Err(terraveg_core::Error::size_mismatch(shape, bad.shape()).into());
    }

    let mut buf = Vec::with_capacity(layers.len());
    let data = Array2::from_shape_fn(shape, |(row, col)| {
        buf.clear();
        for layer in layers {
            let v = layer.data()[[row, col]];
            if !layer.is_nodata(v) {
                buf.push(v);
            }
        }
        median(&mut buf)
    });

    Ok(Some(first.with_data(data, Some(f64::NAN))?))
}

impl RasterSource for SceneCatalog {
    fn elevation(&self, region: &Region) -> Result<Option<Raster<f64>>> {
        let Some(dem) = &self.elevation else {
            return Ok(None);
        };
        let clipped = region.clip(dem)?;
        if clipped.valid_count() == 0 {
            warn!("elevation model does not intersect the region");
            return Ok(None);
        }
        Ok(Some(clipped))
    }

    fn spectral_bands(
        &self,
        region: &Region,
        range: &DateRange,
        cloud_threshold: f64,
        bands: &[String],
    ) -> Result<Option<MultiBandRaster>> {
        let selected: Vec<&Scene> = self.filter(range, cloud_threshold).collect();
        debug!(
            "{} of {} scenes pass {}..{} with cloud < {}%",
            selected.len(),
            self.scenes.len(),
            range.start,
            range.end,
            cloud_threshold
        );
        let Some(reference) = selected.first() else {
            return Ok(None);
        };
        let Some(grid) = reference.bands.grid() else {
            return Ok(None);
        };

        let mut composite = Vec::with_capacity(bands.len());
        for name in bands {
            let layers = selected
                .iter()
                .map(|s| s.bands.require(name).map(|b| b.resample_nearest(&grid)))
                .collect::<terraveg_core::Result<Vec<_>>>()?;
            let refs: Vec<&Raster<f64>> = layers.iter().collect();
            if let Some(band) = median_composite(&refs)? {
                composite.push((name.clone(), region.clip(&band)?));
            }
        }

        Ok(Some(MultiBandRaster::new(composite)?))
    }
}
