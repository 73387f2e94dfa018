//! Main Raster type and sampling grids

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// The sampling grid of a raster: georeferencing plus dimensions.
///
/// Two rasters share a grid when they can be combined cell by cell without
/// resampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(transform: GeoTransform, rows: usize, cols: usize) -> Self {
        Self {
            transform,
            rows,
            cols,
        }
    }

    /// North-up grid of square `cell_size` cells covering `(min_x, min_y, max_x, max_y)`.
    pub fn covering(bounds: (f64, f64, f64, f64), cell_size: f64) -> Result<Self> {
        let (min_x, min_y, max_x, max_y) = bounds;
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: cell_size.to_string(),
                reason: "must be a positive finite number".into(),
            });
        }
        if !(max_x > min_x && max_y > min_y) {
            return Err(Error::InvalidParameter {
                name: "bounds",
                value: format!("{:?}", bounds),
                reason: "empty extent".into(),
            });
        }

        let cols = ((max_x - min_x) / cell_size).ceil().max(1.0) as usize;
        let rows = ((max_y - min_y) / cell_size).ceil().max(1.0) as usize;

        Ok(Self::new(
            GeoTransform::new(min_x, max_y, cell_size, -cell_size),
            rows,
            cols,
        ))
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in row-major order together with
/// the affine transform that places it on the ground. Rasters are treated as
/// immutable values by the analysis code: operations read their inputs and
/// allocate new outputs.
///
/// # Example
///
/// ```ignore
/// use terraveg_core::Raster;
///
/// let mut dem: Raster<f64> = Raster::filled(100, 100, 250.0);
/// dem.set(10, 20, 300.0)?;
/// let value = dem.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data in (row, col) order
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster on `grid` where every cell is no-data
    pub fn nodata_on(grid: &GridSpec) -> Self {
        let fill = T::default_nodata();
        Self {
            data: Array2::from_elem(grid.shape(), fill),
            transform: grid.transform,
            nodata: Some(fill),
        }
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: self.nodata,
        }
    }

    /// Same georeferencing, new data. The shape of `data` must match.
    pub fn with_data<U: RasterElement>(&self, data: Array2<U>, nodata: Option<U>) -> Result<Raster<U>> {
        if data.dim() != self.shape() {
            return Err(Error::size_mismatch(self.shape(), data.dim()));
        }
        Ok(Raster {
            data,
            transform: self.transform,
            nodata,
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sampling grid of this raster
    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.transform, self.rows(), self.cols())
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col).
    ///
    /// Intended for building inputs; analysis code never edits a raster it
    /// did not allocate.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding a valid value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// Nearest-neighbour resample onto `grid`.
    ///
    /// Cells whose center falls outside this raster become no-data.
    pub fn resample_nearest(&self, grid: &GridSpec) -> Raster<T> {
        if self.grid() == *grid {
            return self.clone();
        }

        let fill = self.nodata.unwrap_or_else(T::default_nodata);
        let (src_rows, src_cols) = self.shape();

        let data = Array2::from_shape_fn(grid.shape(), |(row, col)| {
            let (x, y) = grid.transform.pixel_to_geo(col, row);
            let (c, r) = self.transform.geo_to_pixel(x, y);
            if !c.is_finite() || !r.is_finite() || c < 0.0 || r < 0.0 {
                return fill;
            }
            let (r, c) = (r.floor() as usize, c.floor() as usize);
            if r >= src_rows || c >= src_cols {
                return fill;
            }
            self.data[(r, c)]
        });

        Raster {
            data,
            transform: grid.transform,
            nodata: Some(fill),
        }
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f64).unwrap();
            }
        }
        raster.set(0, 0, f64::NAN).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }

    #[test]
    fn test_nodata_on_grid() {
        let grid = GridSpec::new(GeoTransform::new(0.0, 4.0, 1.0, -1.0), 4, 4);
        let raster: Raster<f64> = Raster::nodata_on(&grid);
        assert_eq!(raster.grid(), grid);
        assert_eq!(raster.valid_count(), 0);
    }

    #[test]
    fn test_grid_covering() {
        let grid = GridSpec::covering((0.0, 0.0, 10.0, 5.0), 2.0).unwrap();
        assert_eq!(grid.shape(), (3, 5));
        assert_eq!(grid.transform.origin_y, 5.0);
        assert!(GridSpec::covering((0.0, 0.0, 10.0, 5.0), 0.0).is_err());
    }

    #[test]
    fn test_resample_nearest_upsample() {
        let mut coarse: Raster<f64> = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        coarse.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));

        let fine = GridSpec::new(GeoTransform::new(0.0, 2.0, 0.5, -0.5), 4, 4);
        let out = coarse.resample_nearest(&fine);

        assert_eq!(out.shape(), (4, 4));
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 3).unwrap(), 2.0);
        assert_eq!(out.get(3, 0).unwrap(), 3.0);
        assert_eq!(out.get(3, 3).unwrap(), 4.0);
    }

    #[test]
    fn test_resample_outside_is_nodata() {
        let mut src: Raster<f64> = Raster::filled(2, 2, 7.0);
        src.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));

        let shifted = GridSpec::new(GeoTransform::new(1.0, 2.0, 1.0, -1.0), 2, 2);
        let out = src.resample_nearest(&shifted);

        assert_eq!(out.get(0, 0).unwrap(), 7.0);
        assert!(out.get(0, 1).unwrap().is_nan());
    }
}
