//! Scene manifests
//!
//! A TOML listing of the scenes in a collection, each with its acquisition
//! date, cloud cover and one GeoTIFF per band. Band paths are relative to
//! the manifest's directory.
//!
//! ```toml
//! elevation = "dem.tif"
//!
//! [[scene]]
//! id = "S2B_20230314"
//! date = "2023-03-14"
//! cloud_cover = 3.5
//!
//! [scene.bands]
//! B4 = "20230314_B4.tif"
//! B8 = "20230314_B8.tif"
//! ```

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use terraveg_core::io::read_geotiff;
use terraveg_core::raster::MultiBandRaster;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::source::{Scene, SceneCatalog};

/// One scene entry
#[derive(Debug, Clone, Deserialize)]
pub struct SceneEntry {
    pub id: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    pub bands: BTreeMap<String, PathBuf>,
}

/// Parsed manifest, paths still unresolved
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub elevation: Option<PathBuf>,
    #[serde(default, rename = "scene")]
    pub scenes: Vec<SceneEntry>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl SceneManifest {
    /// Parse a manifest whose relative paths resolve against `base_dir`
    pub fn from_toml_str(s: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: SceneManifest = toml::from_str(s).map_err(ConfigError::from)?;
        manifest.base_dir = base_dir.into();
        manifest.check()?;
        Ok(manifest)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(&text, base)
    }

    fn check(&self) -> std::result::Result<(), ConfigError> {
        for scene in &self.scenes {
            if scene.bands.is_empty() {
                return Err(ConfigError::invalid("scene.bands", &scene.id, "scene lists no bands"));
            }
            if !(0.0..=100.0).contains(&scene.cloud_cover) {
                return Err(ConfigError::invalid(
                    "scene.cloud_cover",
                    scene.cloud_cover,
                    "must be a percentage in [0, 100]",
                ));
            }
        }
        Ok(())
    }

    /// Resolve a manifest path against the manifest's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Read every listed raster into an in-memory catalog
    pub fn load(&self) -> Result<SceneCatalog> {
        let mut catalog = SceneCatalog::new();
        if let Some(dem) = &self.elevation {
            catalog = catalog.with_elevation(read_geotiff(self.resolve(dem))?);
        }
        for entry in &self.scenes {
            let mut bands = Vec::with_capacity(entry.bands.len());
            for (name, path) in &entry.bands {
                bands.push((name.clone(), read_geotiff::<f64, _>(self.resolve(path))?));
            }
            debug!("loaded scene {} ({} bands)", entry.id, bands.len());
            catalog.add_scene(Scene {
                id: entry.id.clone(),
                acquired: entry.date,
                cloud_cover: entry.cloud_cover,
                bands: MultiBandRaster::new(bands)?,
            });
        }
        Ok(catalog)
    }
}
