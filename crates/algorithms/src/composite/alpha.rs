//! Value-dependent transparency for the vegetation overlay

use terraveg_core::raster::Raster;
use terraveg_core::Result;

use crate::imagery::band_math;

/// `alpha = clamp((index - low_cut) / span, 0, 1) * cap`
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaParams {
    /// Index value at and below which the overlay is fully transparent
    pub low_cut: f64,
    /// Index range over which opacity ramps up to `cap`
    pub span: f64,
    /// Maximum opacity, in [0, 1]
    pub cap: f64,
}

impl Default for AlphaParams {
    fn default() -> Self {
        Self {
            low_cut: 0.15,
            span: 0.6,
            cap: 0.55,
        }
    }
}

impl AlphaParams {
    #[inline]
    pub fn alpha(&self, index: f64) -> f64 {
        ((index - self.low_cut) / self.span).clamp(0.0, 1.0) * self.cap
    }
}

/// Per-pixel opacity from a vegetation index. No-data in, NaN out.
pub fn alpha_mask(index: &Raster<f64>, params: &AlphaParams) -> Result<Raster<f64>> {
    band_math(index, |v| params.alpha(v))
}
