//! Color ramps and multi-stop interpolation engine.

use serde::{Deserialize, Serialize};
use terraveg_core::{Error, Result};

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse any CSS color (`#0000ff`, `0000ff`, `blue`, `rgb(0,0,255)`).
    /// Alpha is ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let css = if !trimmed.is_empty()
            && matches!(trimmed.len(), 3 | 6)
            && trimmed.chars().all(|c| c.is_ascii_hexdigit())
        {
            format!("#{}", trimmed)
        } else {
            trimmed.to_string()
        };

        let color = csscolorparser::parse(&css).map_err(|e| Error::InvalidParameter {
            name: "color",
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        let [r, g, b, _] = color.to_rgba8();
        Ok(Self::new(r, g, b))
    }

    /// Lowercase `rrggbb` without a leading `#`
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components in [0, 1]
    pub fn to_unit(&self) -> [f64; 3] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        ]
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_unit(c1: Rgb, c2: Rgb, t: f64) -> [f64; 3] {
    let (a, b) = (c1.to_unit(), c2.to_unit());
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

/// Interpolate sorted `stops` at `t`, clamping outside [first.t, last.t].
/// Components are in [0, 1].
fn multi_stop(stops: &[ColorStop], t: f64) -> [f64; 3] {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return [f64::NAN; 3];
    };
    if t <= first.t {
        return first.color.to_unit();
    }
    if t >= last.t {
        return last.color.to_unit();
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.t {
            let width = hi.t - lo.t;
            let ratio = if width > 0.0 { (t - lo.t) / width } else { 1.0 };
            return lerp_unit(lo.color, hi.color, ratio);
        }
    }
    last.color.to_unit()
}

/// Palette stretched over a value domain.
///
/// Values map linearly from `domain` onto the stop positions in [0, 1];
/// values outside the domain take the end colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    pub domain: (f64, f64),
    pub stops: Vec<ColorStop>,
}

impl ColorRamp {
    /// Ramp with explicit stops. Needs at least two stops in ascending order
    /// and a domain with `min < max`.
    pub fn new(domain: (f64, f64), stops: Vec<ColorStop>) -> Result<Self> {
        if !(domain.0 < domain.1) {
            return Err(Error::InvalidParameter {
                name: "domain",
                value: format!("({}, {})", domain.0, domain.1),
                reason: "min must be below max".into(),
            });
        }
        if stops.len() < 2 {
            return Err(Error::InvalidParameter {
                name: "stops",
                value: stops.len().to_string(),
                reason: "a ramp needs at least two stops".into(),
            });
        }
        if stops.windows(2).any(|w| w[1].t < w[0].t) {
            return Err(Error::InvalidParameter {
                name: "stops",
                value: format!("{:?}", stops.iter().map(|s| s.t).collect::<Vec<_>>()),
                reason: "stop positions must be ascending".into(),
            });
        }
        Ok(Self { domain, stops })
    }

    /// Evenly spaced stops from a list of CSS colors.
    pub fn from_colors<S: AsRef<str>>(domain: (f64, f64), colors: &[S]) -> Result<Self> {
        let n = colors.len();
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                Rgb::parse(c.as_ref()).map(|color| ColorStop { t, color })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(domain, stops)
    }

    /// Blue → white → green over [-1, 1]
    pub fn ndvi_diverging() -> Self {
        Self {
            domain: (-1.0, 1.0),
            stops: vec![
                ColorStop::new(0.0, 0, 0, 255),
                ColorStop::new(0.5, 255, 255, 255),
                ColorStop::new(1.0, 0, 255, 0),
            ],
        }
    }

    /// Hue wheel over compass degrees [0, 360]
    pub fn aspect_wheel() -> Self {
        Self {
            domain: (0.0, 360.0),
            stops: vec![
                ColorStop::new(0.00, 0, 0, 255),
                ColorStop::new(0.25, 0, 255, 0),
                ColorStop::new(0.50, 255, 255, 0),
                ColorStop::new(0.75, 255, 0, 0),
                ColorStop::new(1.00, 0, 0, 255),
            ],
        }
    }

    /// White → brown over slope degrees [0, 60]
    pub fn slope() -> Self {
        Self {
            domain: (0.0, 60.0),
            stops: vec![
                ColorStop::new(0.0, 255, 255, 255),
                ColorStop::new(1.0, 165, 42, 42),
            ],
        }
    }

    /// Position of `value` on the ramp, clamped to [0, 1]
    pub fn position(&self, value: f64) -> f64 {
        let (min, max) = self.domain;
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }

    /// Color of `value` with components in [0, 1]; NaN yields NaN.
    pub fn evaluate(&self, value: f64) -> [f64; 3] {
        if value.is_nan() {
            return [f64::NAN; 3];
        }
        multi_stop(&self.stops, self.position(value))
    }

    /// Color of `value` quantized to 8 bits
    pub fn evaluate_rgb(&self, value: f64) -> Option<Rgb> {
        let c = self.evaluate(value);
        if c.iter().any(|v| v.is_nan()) {
            return None;
        }
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Some(Rgb::new(byte(c[0]), byte(c[1]), byte(c[2])))
    }

    /// Stop colors as hex strings, in order
    pub fn palette(&self) -> Vec<String> {
        self.stops.iter().map(|s| s.color.to_hex()).collect()
    }
}
