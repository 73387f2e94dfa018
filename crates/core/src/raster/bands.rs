//! Named stacks of co-registered bands

use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster};

/// A multi-band raster: named `f64` bands that share one grid.
///
/// Spectral composites arrive as a `MultiBandRaster` keyed by sensor band
/// name (`"B4"`, `"B8"`, ...).
#[derive(Debug, Clone)]
pub struct MultiBandRaster {
    names: Vec<String>,
    bands: Vec<Raster<f64>>,
}

impl MultiBandRaster {
    /// Build a stack from `(name, band)` pairs.
    ///
    /// All bands must share the first band's grid and names must be unique.
    pub fn new<S: Into<String>>(bands: Vec<(S, Raster<f64>)>) -> Result<Self> {
        let mut stack = Self {
            names: Vec::with_capacity(bands.len()),
            bands: Vec::with_capacity(bands.len()),
        };
        for (name, band) in bands {
            stack = stack.with_band(name, band)?;
        }
        Ok(stack)
    }

    /// Return a new stack with `band` appended under `name`
    pub fn with_band(mut self, name: impl Into<String>, band: Raster<f64>) -> Result<Self> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(Error::InvalidParameter {
                name: "band",
                value: name,
                reason: "duplicate band name".into(),
            });
        }
        if let Some(first) = self.bands.first() {
            if first.shape() != band.shape() {
                return Err(Error::size_mismatch(first.shape(), band.shape()));
            }
        }
        self.names.push(name);
        self.bands.push(band);
        Ok(self)
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.bands[idx])
    }

    /// Band by name, or `Error::MissingBand`
    pub fn require(&self, name: &str) -> Result<&Raster<f64>> {
        self.band(name)
            .ok_or_else(|| Error::MissingBand(name.to_string()))
    }

    /// New stack holding only `names`, in that order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            out.push((name.to_string(), self.require(name)?.clone()));
        }
        Self::new(out)
    }

    /// Band names in stack order
    pub fn band_names(&self) -> &[String] {
        &self.names
    }

    /// Bands in stack order
    pub fn bands(&self) -> &[Raster<f64>] {
        &self.bands
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Grid shared by all bands, `None` for an empty stack
    pub fn grid(&self) -> Option<GridSpec> {
        self.bands.first().map(|b| b.grid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_reorders_bands() {
        let stack = MultiBandRaster::new(vec![
            ("B4", Raster::filled(2, 2, 0.1)),
            ("B8", Raster::filled(2, 2, 0.4)),
        ])
        .unwrap();

        let picked = stack.select(&["B8", "B4"]).unwrap();
        assert_eq!(picked.band_names(), &["B8".to_string(), "B4".to_string()]);
        assert_eq!(picked.band("B8").unwrap().get(0, 0).unwrap(), 0.4);
    }

    #[test]
    fn missing_band_is_an_error() {
        let stack = MultiBandRaster::new(vec![("B4", Raster::filled(2, 2, 0.1))]).unwrap();
        assert!(matches!(stack.select(&["B8"]), Err(Error::MissingBand(name)) if name == "B8"));
    }

    #[test]
    fn rejects_mismatched_shapes_and_duplicates() {
        let shapes = MultiBandRaster::new(vec![
            ("B4", Raster::filled(2, 2, 0.1)),
            ("B8", Raster::filled(3, 2, 0.4)),
        ]);
        assert!(matches!(shapes, Err(Error::SizeMismatch { .. })));

        let dupes = MultiBandRaster::new(vec![
            ("B4", Raster::filled(2, 2, 0.1)),
            ("B4", Raster::filled(2, 2, 0.4)),
        ]);
        assert!(dupes.is_err());
    }
}
