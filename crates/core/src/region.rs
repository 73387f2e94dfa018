//! Area-of-interest geometry
//!
//! A [`Region`] is the immutable polygon set every raster in a composite is
//! clipped to. Cells are inside when their center point is inside the
//! geometry.

use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster, RasterElement};
use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use ndarray::Array2;
use tracing::debug;

/// Immutable region of interest
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    geometry: MultiPolygon<f64>,
}

impl Region {
    /// Region from a set of polygons
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self> {
        if geometry.0.is_empty() {
            return Err(Error::InvalidParameter {
                name: "region",
                value: "MULTIPOLYGON EMPTY".into(),
                reason: "region needs at least one polygon".into(),
            });
        }
        Ok(Self { geometry })
    }

    /// Region from a single polygon
    pub fn from_polygon(polygon: Polygon<f64>) -> Result<Self> {
        Self::new(MultiPolygon::new(vec![polygon]))
    }

    /// Region from an exterior ring and optional holes given as `(x, y)` pairs
    pub fn from_rings(exterior: &[(f64, f64)], holes: &[Vec<(f64, f64)>]) -> Result<Self> {
        if exterior.len() < 3 {
            return Err(Error::InvalidParameter {
                name: "region.exterior",
                value: format!("{} vertices", exterior.len()),
                reason: "a ring needs at least 3 vertices".into(),
            });
        }
        let ring = |pts: &[(f64, f64)]| {
            LineString::from(pts.iter().map(|&(x, y)| Coord { x, y }).collect::<Vec<_>>())
        };
        let interiors = holes.iter().map(|h| ring(h.as_slice())).collect();
        Self::from_polygon(Polygon::new(ring(exterior), interiors))
    }

    /// Axis-aligned rectangular region
    pub fn from_bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        if !(max_x > min_x && max_y > min_y) {
            return Err(Error::InvalidParameter {
                name: "region.bbox",
                value: format!("({min_x}, {min_y}, {max_x}, {max_y})"),
                reason: "min must be strictly below max".into(),
            });
        }
        let rect = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });
        Self::from_polygon(rect.to_polygon())
    }

    /// Region covering the full extent of a grid
    pub fn covering(grid: &GridSpec) -> Result<Self> {
        let (min_x, min_y, max_x, max_y) = grid.transform.bounds(grid.cols, grid.rows);
        Self::from_bbox(min_x, min_y, max_x, max_y)
    }

    /// Underlying geometry
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|r| (r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Whether the point `(x, y)` lies inside the region
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }

    /// Per-cell inclusion mask for `grid` (true = inside)
    pub fn mask(&self, grid: &GridSpec) -> Array2<bool> {
        let Some((min_x, min_y, max_x, max_y)) = self.bounds() else {
            return Array2::from_elem(grid.shape(), false);
        };

        let mask = Array2::from_shape_fn(grid.shape(), |(row, col)| {
            let (x, y) = grid.transform.pixel_to_geo(col, row);
            x >= min_x && x <= max_x && y >= min_y && y <= max_y && self.contains(x, y)
        });

        debug!(
            "region mask: {} of {} cells inside",
            mask.iter().filter(|v| **v).count(),
            grid.len()
        );
        mask
    }

    /// Copy of `raster` with every cell outside the region set to no-data
    pub fn clip<T: RasterElement>(&self, raster: &Raster<T>) -> Result<Raster<T>> {
        let mask = self.mask(&raster.grid());
        apply_mask(raster, &mask)
    }
}

/// Copy of `raster` with cells where `mask` is false set to no-data
pub fn apply_mask<T: RasterElement>(raster: &Raster<T>, mask: &Array2<bool>) -> Result<Raster<T>> {
    if mask.dim() != raster.shape() {
        return Err(Error::size_mismatch(raster.shape(), mask.dim()));
    }
    let fill = raster.nodata().unwrap_or_else(T::default_nodata);
    let mut data = raster.data().clone();
    ndarray::Zip::from(&mut data).and(mask).for_each(|v, &inside| {
        if !inside {
            *v = fill;
        }
    });
    raster.with_data(data, Some(fill))
}
