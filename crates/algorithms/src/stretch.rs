//! Adaptive percentile stretch
//!
//! Region-wide percentile bounds of a channel, computed from a strided
//! sample of the cells inside the area of interest, and the linear
//! normalization those bounds drive.

use ndarray::Array2;
use terraveg_core::raster::Raster;
use terraveg_core::{Error, Result};
use tracing::{debug, warn};

use crate::imagery::band_math;
use crate::kernel::is_valid;

/// Spans narrower than this are treated as a constant channel
pub const DEGENERATE_SPAN: f64 = 1e-12;

/// Output of `normalize` where bounds are undefined or degenerate
pub const DEGENERATE_FILL: f64 = 0.5;

/// The sampling stride never leaves fewer rows or columns than this along
/// the longer grid axis
pub const MIN_AXIS_SAMPLES: usize = 4;

/// Parameters for the percentile reduction
#[derive(Debug, Clone, PartialEq)]
pub struct StretchParams {
    /// Lower and upper percentile, in [0, 100]
    pub percentiles: (f64, f64),
    /// Sampling scale in map units. Cells are sampled every
    /// `round(scale / cell_size)` rows and columns, capped so that at least
    /// `MIN_AXIS_SAMPLES` rows or columns are visited.
    ///
    /// The scale and the cell size must share a unit, so grids are
    /// expected in a projected CRS. On a grid in degrees the default 90
    /// hits the cap and the sample degrades to a coarse lattice.
    pub scale: f64,
    /// Upper bound on the number of sampled cells
    pub max_samples: usize,
    /// Widen the sampling stride instead of failing when the budget is exceeded
    pub best_effort: bool,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            percentiles: (2.0, 98.0),
            scale: 90.0,
            max_samples: 1_000_000_000,
            best_effort: true,
        }
    }
}

/// Percentile bounds of a channel over a region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchBounds {
    pub low: f64,
    pub high: f64,
    /// Number of valid samples the bounds were computed from
    pub samples: usize,
}

impl StretchBounds {
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_degenerate(&self) -> bool {
        self.span().abs() < DEGENERATE_SPAN
    }
}

/// Linearly interpolated percentile of sorted values, `p` in [0, 100]
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn sample_count(rows: usize, cols: usize, stride: usize) -> usize {
    rows.div_ceil(stride) * cols.div_ceil(stride)
}

/// Sampling stride for a grid, widened under `best_effort` until the
/// candidate count fits the budget.
fn sampling_stride(rows: usize, cols: usize, cell_size: f64, params: &StretchParams) -> Result<usize> {
    let requested = if cell_size > 0.0 {
        (params.scale / cell_size).round().max(1.0)
    } else {
        1.0
    };
    let longest = rows.max(cols);
    let cap = longest.div_ceil(MIN_AXIS_SAMPLES).max(1);
    let mut stride = if requested > cap as f64 {
        if requested >= longest as f64 {
            warn!(
                "sampling scale {} spans the whole {}x{} grid at cell size {}; \
                 is the grid in a geographic CRS? capping stride at {}",
                params.scale, rows, cols, cell_size, cap
            );
        } else {
            debug!("sampling stride {} capped at {}", requested, cap);
        }
        cap
    } else {
        requested as usize
    };

    let candidates = sample_count(rows, cols, stride);
    if candidates <= params.max_samples {
        return Ok(stride);
    }
    if !params.best_effort {
        return Err(Error::SamplingBudgetExceeded {
            samples: candidates,
            max_samples: params.max_samples,
        });
    }

    while sample_count(rows, cols, stride) > params.max_samples.max(1) {
        stride += 1;
    }
    debug!(
        "sampling budget {} exceeded by {} candidates, stride widened to {}",
        params.max_samples, candidates, stride
    );
    Ok(stride)
}

/// Compute percentile bounds of `channel` over the cells where `mask` is
/// true (all cells when `mask` is `None`).
///
/// Returns `Ok(None)` when no valid sample falls inside the mask.
pub fn compute_bounds(
    channel: &Raster<f64>,
    mask: Option<&Array2<bool>>,
    params: &StretchParams,
) -> Result<Option<StretchBounds>> {
    let (rows, cols) = channel.shape();
    if let Some(mask) = mask {
        if mask.dim() != (rows, cols) {
            return Err(Error::size_mismatch((rows, cols), mask.dim()));
        }
    }
    let (lo_p, hi_p) = params.percentiles;
    if !(0.0..=100.0).contains(&lo_p) || !(0.0..=100.0).contains(&hi_p) || lo_p > hi_p {
        return Err(Error::InvalidParameter {
            name: "percentiles",
            value: format!("({}, {})", lo_p, hi_p),
            reason: "must satisfy 0 <= low <= high <= 100".into(),
        });
    }

    let stride = sampling_stride(rows, cols, channel.cell_size(), params)?;
    let nodata = channel.nodata();
    let data = channel.data();

    let mut samples: Vec<f64> = Vec::with_capacity(sample_count(rows, cols, stride));
    for row in (0..rows).step_by(stride) {
        for col in (0..cols).step_by(stride) {
            if mask.is_some_and(|m| !m[[row, col]]) {
                continue;
            }
            let v = data[[row, col]];
            if is_valid(v, nodata) {
                samples.push(v);
            }
        }
    }

    if samples.is_empty() {
        warn!("no valid samples for percentile stretch, bounds undefined");
        return Ok(None);
    }

    samples.sort_by(|a, b| a.total_cmp(b));
    let bounds = match (percentile(&samples, lo_p), percentile(&samples, hi_p)) {
        (Some(low), Some(high)) => StretchBounds {
            low,
            high,
            samples: samples.len(),
        },
        _ => return Ok(None),
    };

    debug!(
        "p{}={:.4} p{}={:.4} from {} samples (stride {})",
        lo_p, bounds.low, hi_p, bounds.high, bounds.samples, stride
    );
    Ok(Some(bounds))
}

/// Map `channel` into [0, 1] with `clamp((x - low) / (high - low), 0, 1)`.
///
/// Undefined or degenerate bounds map every valid cell to 0.5. No-data
/// stays NaN.
pub fn normalize(channel: &Raster<f64>, bounds: Option<&StretchBounds>) -> Result<Raster<f64>> {
    match bounds {
        Some(b) if !b.is_degenerate() => {
            let (low, span) = (b.low, b.span());
            band_math(channel, move |v| ((v - low) / span).clamp(0.0, 1.0))
        }
        _ => {
            debug!("degenerate stretch bounds, filling with {}", DEGENERATE_FILL);
            band_math(channel, |_| DEGENERATE_FILL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terraveg_core::GeoTransform;

    fn ramp(rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 30.0, 30.0, -30.0));
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, (row * cols + col) as f64).unwrap();
            }
        }
        r
    }

    fn dense() -> StretchParams {
        StretchParams {
            scale: 30.0,
            ..Default::default()
        }
    }

    #[test]
    fn percentile_interpolates() {
        let v = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&v, 0.0), Some(0.0));
        assert_eq!(percentile(&v, 100.0), Some(40.0));
        assert_eq!(percentile(&v, 50.0), Some(20.0));
        assert_relative_eq!(percentile(&v, 10.0).unwrap(), 4.0, epsilon = 1e-12);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn bounds_of_ramp() {
        // 0..=99
        let channel = ramp(10, 10);
        let b = compute_bounds(&channel, None, &dense()).unwrap().unwrap();
        assert_eq!(b.samples, 100);
        assert_relative_eq!(b.low, 0.02 * 99.0, epsilon = 1e-9);
        assert_relative_eq!(b.high, 0.98 * 99.0, epsilon = 1e-9);
    }

    #[test]
    fn scale_sets_stride() {
        let channel = ramp(10, 10);
        let params = StretchParams {
            scale: 90.0,
            ..Default::default()
        };
        let b = compute_bounds(&channel, None, &params).unwrap().unwrap();
        // stride 3 → rows/cols 0,3,6,9
        assert_eq!(b.samples, 16);
    }

    #[test]
    fn degree_cells_still_sample_the_grid() {
        // 0.001° cells against a 90 m scale
        let mut dem = Raster::new(50, 50);
        dem.set_transform(GeoTransform::new(-70.6, -33.4, 0.001, -0.001));
        for row in 0..50 {
            for col in 0..50 {
                let (x, y) = (col as f64, row as f64);
                dem.set(row, col, 170.0 + 20.0 * (x * 0.3).sin() + 15.0 * (y * 0.2).cos()).unwrap();
            }
        }

        let b = compute_bounds(&dem, None, &StretchParams::default()).unwrap().unwrap();
        assert!(b.samples >= MIN_AXIS_SAMPLES * MIN_AXIS_SAMPLES, "{} samples", b.samples);
        assert!(!b.is_degenerate());
    }

    #[test]
    fn stride_cap_keeps_small_grids_covered() {
        // stride 3 would already visit 4 rows and columns of a 10x10 grid
        assert_eq!(sampling_stride(10, 10, 30.0, &StretchParams::default()).unwrap(), 3);
        // 300 m scale over 30 m cells is capped at ceil(10 / 4)
        let coarse = StretchParams {
            scale: 300.0,
            ..Default::default()
        };
        assert_eq!(sampling_stride(10, 10, 30.0, &coarse).unwrap(), 3);
        assert_eq!(sampling_stride(1, 1, 30.0, &coarse).unwrap(), 1);
    }

    #[test]
    fn mask_restricts_samples() {
        let channel = ramp(4, 4);
        let mut mask = Array2::from_elem((4, 4), false);
        mask[[0, 0]] = true;
        mask[[3, 3]] = true;
        let params = StretchParams {
            percentiles: (0.0, 100.0),
            ..dense()
        };
        let b = compute_bounds(&channel, Some(&mask), &params).unwrap().unwrap();
        assert_eq!((b.low, b.high, b.samples), (0.0, 15.0, 2));
    }

    #[test]
    fn no_valid_samples_is_none() {
        let channel = Raster::filled(5, 5, f64::NAN);
        assert!(compute_bounds(&channel, None, &dense()).unwrap().is_none());

        let outside = Array2::from_elem((10, 10), false);
        assert!(compute_bounds(&ramp(10, 10), Some(&outside), &dense()).unwrap().is_none());
    }

    #[test]
    fn budget_exceeded_without_best_effort() {
        let params = StretchParams {
            max_samples: 10,
            best_effort: false,
            ..dense()
        };
        let err = compute_bounds(&ramp(10, 10), None, &params).unwrap_err();
        assert!(matches!(err, Error::SamplingBudgetExceeded { samples: 100, max_samples: 10 }));
    }

    #[test]
    fn budget_widened_with_best_effort() {
        let params = StretchParams {
            max_samples: 10,
            ..dense()
        };
        let b = compute_bounds(&ramp(10, 10), None, &params).unwrap().unwrap();
        assert!(b.samples <= 10);
        assert!(b.low <= b.high);
    }

    #[test]
    fn normalize_clamps() {
        let channel = ramp(1, 5); // 0..4
        let bounds = StretchBounds { low: 1.0, high: 3.0, samples: 5 };
        let n = normalize(&channel, Some(&bounds)).unwrap();
        let got: Vec<f64> = (0..5).map(|c| n.get(0, c).unwrap()).collect();
        assert_eq!(got, vec![0.0, 0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn normalize_degenerate_is_half() {
        let mut channel = Raster::filled(3, 3, 180.0);
        channel.set(1, 1, f64::NAN).unwrap();
        let bounds = StretchBounds { low: 180.0, high: 180.0, samples: 9 };

        for b in [Some(&bounds), None] {
            let n = normalize(&channel, b).unwrap();
            assert_eq!(n.get(0, 0).unwrap(), 0.5);
            assert!(n.get(1, 1).unwrap().is_nan());
        }
    }
}
