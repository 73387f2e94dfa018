//! Legend and display metadata
//!
//! Everything a renderer needs to draw the composite's legend: palettes,
//! value ranges and labels. Pure data, serialized as JSON.

use serde::{Deserialize, Serialize};

use crate::scheme::ColorRamp;

/// One colorbar in the legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    /// Stable identifier (`ndvi`, `aspect`, `slope`)
    pub key: String,
    pub title: String,
    /// Hex colors, evenly spaced from `min` to `max`
    pub palette: Vec<String>,
    pub min: f64,
    pub max: f64,
    pub min_label: String,
    pub max_label: String,
}

impl LegendEntry {
    pub fn from_ramp<L: Into<String>, H: Into<String>>(
        key: &str,
        title: &str,
        ramp: &ColorRamp,
        labels: (L, H),
    ) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            palette: ramp.palette(),
            min: ramp.domain.0,
            max: ramp.domain.1,
            min_label: labels.0.into(),
            max_label: labels.1.into(),
        }
    }
}

/// How the terrain base image encodes its three channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingLegend {
    pub caption: String,
    pub description: String,
    /// Slope (degrees) at which saturation saturates
    pub slope_cap: f64,
    /// Hillshade stretch bounds, when they were defined
    pub value_bounds: Option<(f64, f64)>,
}

/// Legend metadata for the composite and its display layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub title: String,
    pub encoding: EncodingLegend,
    pub entries: Vec<LegendEntry>,
    pub attribution: String,
}

/// Inputs for [`DisplayMetadata::for_composite`]
#[derive(Debug, Clone)]
pub struct LegendSpec<'a> {
    pub vegetation: &'a ColorRamp,
    pub aspect: &'a ColorRamp,
    pub slope: &'a ColorRamp,
    pub slope_cap: f64,
    pub value_bounds: Option<(f64, f64)>,
    pub attribution: String,
}

impl DisplayMetadata {
    /// Legend of the terrain–vegetation composite: HSV caption plus NDVI,
    /// aspect and slope colorbars.
    pub fn for_composite(spec: &LegendSpec<'_>) -> Self {
        Self {
            title: "Terrain and vegetation".to_string(),
            encoding: EncodingLegend {
                caption: "DEM (HSV encoding)".to_string(),
                description: "Hue = Aspect • Saturation = Slope • Value = Hillshade".to_string(),
                slope_cap: spec.slope_cap,
                value_bounds: spec.value_bounds,
            },
            entries: vec![
                LegendEntry::from_ramp(
                    "ndvi",
                    "NDVI",
                    spec.vegetation,
                    ("Low / water, bare", "High / dense veg"),
                ),
                LegendEntry::from_ramp("aspect", "Aspect (Hue)", spec.aspect, ("0°", "360°")),
                LegendEntry::from_ramp(
                    "slope",
                    "Slope (Saturation)",
                    spec.slope,
                    ("Flat".to_string(), format!("Steep (~{}°)", spec.slope_cap)),
                ),
            ],
            attribution: spec.attribution.clone(),
        }
    }

    pub fn entry(&self, key: &str) -> Option<&LegendEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
