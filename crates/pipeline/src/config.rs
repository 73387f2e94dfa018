//! Pipeline configuration
//!
//! One immutable [`PipelineConfig`] is handed to the pipeline at
//! construction. Every table is optional in TOML and falls back to the
//! defaults of the reference figure:
//!
//! ```toml
//! [terrain]
//! sun_azimuth = 270.0
//! sun_elevation = 45.0
//!
//! [stretch]
//! low_percentile = 2.0
//! high_percentile = 98.0
//! scale = 90.0
//!
//! [vegetation]
//! palette = ["0000ff", "ffffff", "00ff00"]
//!
//! [collection]
//! start = "2023-01-01"
//! end = "2024-01-01"
//! cloud_threshold = 10.0
//!
//! [region]
//! bbox = [-70.8, -33.6, -70.4, -33.3]
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use terraveg_algorithms::composite::{AlphaParams, HsvEncoding};
use terraveg_algorithms::stretch::StretchParams;
use terraveg_algorithms::terrain::{AspectParams, HillshadeParams, SlopeParams};
use terraveg_colormap::{ColorRamp, Rgb};
use terraveg_core::Region;

use crate::error::ConfigError;
use crate::source::DateRange;

/// Sun position and vertical scaling for the terrain channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Degrees clockwise from north
    pub sun_azimuth: f64,
    /// Degrees above the horizon
    pub sun_elevation: f64,
    pub z_factor: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            sun_azimuth: 270.0,
            sun_elevation: 45.0,
            z_factor: 1.0,
        }
    }
}

impl TerrainConfig {
    pub fn slope_params(&self) -> SlopeParams {
        SlopeParams {
            z_factor: self.z_factor,
            ..Default::default()
        }
    }

    pub fn aspect_params(&self) -> AspectParams {
        AspectParams {
            z_factor: self.z_factor,
            ..Default::default()
        }
    }

    pub fn hillshade_params(&self) -> HillshadeParams {
        HillshadeParams {
            azimuth: self.sun_azimuth,
            altitude: self.sun_elevation,
            z_factor: self.z_factor,
            normalized: false,
        }
    }
}

/// Hillshade percentile stretch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchConfig {
    pub low_percentile: f64,
    pub high_percentile: f64,
    /// Sampling scale in map units
    pub scale: f64,
    pub max_samples: usize,
    pub best_effort: bool,
}

impl Default for StretchConfig {
    fn default() -> Self {
        let p = StretchParams::default();
        Self {
            low_percentile: p.percentiles.0,
            high_percentile: p.percentiles.1,
            scale: p.scale,
            max_samples: p.max_samples,
            best_effort: p.best_effort,
        }
    }
}

impl StretchConfig {
    pub fn params(&self) -> StretchParams {
        StretchParams {
            percentiles: (self.low_percentile, self.high_percentile),
            scale: self.scale,
            max_samples: self.max_samples,
            best_effort: self.best_effort,
        }
    }
}

/// Terrain → HSV mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub slope_cap: f64,
    pub saturation_gamma: f64,
    pub saturation_scale: f64,
    pub value_gamma: f64,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let e = HsvEncoding::default();
        Self {
            slope_cap: e.slope_cap,
            saturation_gamma: e.saturation_gamma,
            saturation_scale: e.saturation_scale,
            value_gamma: e.value_gamma,
        }
    }
}

impl EncodingConfig {
    pub fn encoding(&self) -> HsvEncoding {
        HsvEncoding {
            slope_cap: self.slope_cap,
            saturation_gamma: self.saturation_gamma,
            saturation_scale: self.saturation_scale,
            value_gamma: self.value_gamma,
        }
    }
}

/// Vegetation index bands and its diverging color ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    pub nir_band: String,
    pub red_band: String,
    pub domain_min: f64,
    pub domain_max: f64,
    /// CSS colors, evenly spaced over the domain
    pub palette: Vec<String>,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            nir_band: "B8".to_string(),
            red_band: "B4".to_string(),
            domain_min: -1.0,
            domain_max: 1.0,
            palette: ColorRamp::ndvi_diverging().palette(),
        }
    }
}

impl VegetationConfig {
    pub fn ramp(&self) -> Result<ColorRamp, ConfigError> {
        ColorRamp::from_colors((self.domain_min, self.domain_max), &self.palette)
            .map_err(|e| ConfigError::invalid("vegetation.palette", self.palette.join(","), e.to_string()))
    }
}

/// Overlay opacity ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaConfig {
    pub low_cut: f64,
    pub span: f64,
    pub cap: f64,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        let a = AlphaParams::default();
        Self {
            low_cut: a.low_cut,
            span: a.span,
            cap: a.cap,
        }
    }
}

impl AlphaConfig {
    pub fn params(&self) -> AlphaParams {
        AlphaParams {
            low_cut: self.low_cut,
            span: self.span,
            cap: self.cap,
        }
    }
}

/// Which scenes feed the spectral composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// First acquisition date included
    pub start: NaiveDate,
    /// First acquisition date excluded
    pub end: NaiveDate,
    /// Scenes must be strictly below this cloud percentage
    pub cloud_threshold: f64,
    pub bands: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            cloud_threshold: 10.0,
            bands: ["B2", "B3", "B4", "B8"].iter().map(|b| b.to_string()).collect(),
        }
    }
}

impl CollectionConfig {
    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Area of interest: a bbox or an exterior ring with optional holes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// `[min_x, min_y, max_x, max_y]`
    pub bbox: Option<[f64; 4]>,
    pub exterior: Option<Vec<[f64; 2]>>,
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl RegionConfig {
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        Self {
            bbox: Some(bbox),
            ..Default::default()
        }
    }

    pub fn is_set(&self) -> bool {
        self.bbox.is_some() || self.exterior.is_some()
    }

    /// Build the region. A polygon takes precedence over a bbox.
    pub fn to_region(&self) -> Result<Region, ConfigError> {
        let pairs = |ring: &[[f64; 2]]| ring.iter().map(|p| (p[0], p[1])).collect::<Vec<_>>();
        let region = match (&self.exterior, self.bbox) {
            (Some(exterior), _) => {
                let holes: Vec<_> = self.holes.iter().map(|h| pairs(h.as_slice())).collect();
                Region::from_rings(&pairs(exterior.as_slice()), &holes)
            }
            (None, Some([min_x, min_y, max_x, max_y])) => Region::from_bbox(min_x, min_y, max_x, max_y),
            (None, None) => {
                return Err(ConfigError::invalid("region", "<unset>", "set region.bbox or region.exterior"))
            }
        };
        region.map_err(|e| ConfigError::invalid("region", format!("{:?}", self), e.to_string()))
    }
}

/// Legend text that does not derive from the ramps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub attribution: String,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            attribution: "Data: Sentinel-2 (2023) • SRTM 30m".to_string(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub terrain: TerrainConfig,
    pub stretch: StretchConfig,
    pub encoding: EncodingConfig,
    pub vegetation: VegetationConfig,
    pub alpha: AlphaConfig,
    pub collection: CollectionConfig,
    pub region: RegionConfig,
    pub legend: LegendConfig,
}

fn check(ok: bool, field: &'static str, value: impl ToString, reason: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, value, reason))
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject malformed values, naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.terrain;
        check(
            t.sun_azimuth.is_finite(),
            "terrain.sun_azimuth",
            t.sun_azimuth,
            "must be finite",
        )?;
        check(
            (0.0..=90.0).contains(&t.sun_elevation),
            "terrain.sun_elevation",
            t.sun_elevation,
            "must be within [0, 90]",
        )?;
        check(t.z_factor > 0.0, "terrain.z_factor", t.z_factor, "must be positive")?;

        let s = &self.stretch;
        check(
            (0.0..=100.0).contains(&s.low_percentile),
            "stretch.low_percentile",
            s.low_percentile,
            "must be within [0, 100]",
        )?;
        check(
            (0.0..=100.0).contains(&s.high_percentile),
            "stretch.high_percentile",
            s.high_percentile,
            "must be within [0, 100]",
        )?;
        check(
            s.low_percentile < s.high_percentile,
            "stretch.low_percentile",
            s.low_percentile,
            "must be below stretch.high_percentile",
        )?;
        check(s.scale > 0.0, "stretch.scale", s.scale, "must be positive")?;
        check(s.max_samples > 0, "stretch.max_samples", s.max_samples, "must be positive")?;

        let e = &self.encoding;
        check(e.slope_cap > 0.0, "encoding.slope_cap", e.slope_cap, "must be positive")?;
        check(
            e.saturation_gamma > 0.0,
            "encoding.saturation_gamma",
            e.saturation_gamma,
            "must be positive",
        )?;
        check(
            (0.0..=1.0).contains(&e.saturation_scale),
            "encoding.saturation_scale",
            e.saturation_scale,
            "must be within [0, 1]",
        )?;
        check(e.value_gamma > 0.0, "encoding.value_gamma", e.value_gamma, "must be positive")?;

        let v = &self.vegetation;
        check(!v.nir_band.is_empty(), "vegetation.nir_band", "\"\"", "must not be empty")?;
        check(!v.red_band.is_empty(), "vegetation.red_band", "\"\"", "must not be empty")?;
        check(
            v.domain_min < v.domain_max,
            "vegetation.domain_min",
            v.domain_min,
            "must be below vegetation.domain_max",
        )?;
        check(
            v.palette.len() >= 2,
            "vegetation.palette",
            v.palette.len(),
            "needs at least two colors",
        )?;
        for color in &v.palette {
            Rgb::parse(color)
                .map_err(|e| ConfigError::invalid("vegetation.palette", color, e.to_string()))?;
        }

        let a = &self.alpha;
        check(a.span > 0.0, "alpha.span", a.span, "must be positive")?;
        check((0.0..=1.0).contains(&a.cap), "alpha.cap", a.cap, "must be within [0, 1]")?;
        check(a.low_cut.is_finite(), "alpha.low_cut", a.low_cut, "must be finite")?;

        let c = &self.collection;
        check(
            (0.0..=100.0).contains(&c.cloud_threshold),
            "collection.cloud_threshold",
            c.cloud_threshold,
            "must be within [0, 100]",
        )?;
        check(
            c.start < c.end,
            "collection.start",
            c.start,
            "must be before collection.end",
        )?;
        check(
            c.bands.iter().all(|b| !b.is_empty()),
            "collection.bands",
            c.bands.join(","),
            "band names must not be empty",
        )?;

        if self.region.is_set() {
            self.region.to_region()?;
        }
        Ok(())
    }

    /// Bands to request from the source: the collection bands plus the two
    /// index bands, without duplicates.
    pub fn requested_bands(&self) -> Vec<String> {
        let mut bands = self.collection.bands.clone();
        for b in [&self.vegetation.nir_band, &self.vegetation.red_band] {
            if !bands.contains(b) {
                bands.push(b.clone());
            }
        }
        bands
    }
}
