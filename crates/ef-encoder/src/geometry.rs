//! Scale-to-fit dimension arithmetic.
//!
//! Given the wanted size from a profile's settings and the native size of the
//! input, compute the pixel size to encode at. Wanted sizes never upscale:
//! an axis that exceeds its native value is clamped, and the other axis is
//! scaled by the same factor so the aspect ratio is kept.

use std::fmt;
use std::sync::LazyLock;

use ef_core::{MediaProperties, Settings};
use regex::Regex;

static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)x(\d+)").expect("dimensions pattern is valid"));

/// One of the two picture axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl Axis {
    /// The settings key holding an explicit value for this axis.
    pub fn key(self) -> &'static str {
        match self {
            Axis::Width => "width",
            Axis::Height => "height",
        }
    }

    pub fn opposite(self) -> Axis {
        match self {
            Axis::Width => Axis::Height,
            Axis::Height => Axis::Width,
        }
    }

    fn pick<T>(self, width: T, height: T) -> T {
        match self {
            Axis::Width => width,
            Axis::Height => height,
        }
    }
}

/// Native picture size of the input. Unknown axes are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NativeSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl NativeSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    fn get(&self, axis: Axis) -> Option<f64> {
        axis.pick(self.width, self.height)
            .filter(|v| *v > 0)
            .map(f64::from)
    }
}

impl From<&MediaProperties> for NativeSize {
    fn from(props: &MediaProperties) -> Self {
        Self {
            width: props.width,
            height: props.height,
        }
    }
}

/// Resolved picture size at one rounding modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// Compute the geometry for `settings` against `native` at `modulus`.
    pub fn resolve(settings: &Settings, native: NativeSize, modulus: u32) -> Self {
        Self {
            width: dimension(Axis::Width, settings, native, modulus),
            height: dimension(Axis::Height, settings, native, modulus),
        }
    }

    /// `WxH` string.
    pub fn dimensions(&self) -> String {
        self.to_string()
    }

    /// Width divided by height, or 1 when either side is zero.
    pub fn aspect_ratio(&self) -> f64 {
        if self.width > 0 && self.height > 0 {
            f64::from(self.width) / f64::from(self.height)
        } else {
            1.0
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parse the first `WxH` pair found in `value`.
pub fn parse_dimensions(value: &str) -> Option<(f64, f64)> {
    let caps = DIMENSIONS.captures(value)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some((width, height))
}

/// Compute one axis.
///
/// The wanted value comes from the explicit setting for the axis, then from
/// the matching half of a `dimensions` setting (which also supplies the
/// opposite axis when that one is not set explicitly). Without a wanted
/// value the native value is used and scaled down if the opposite axis was
/// shrunk.
///
/// With `modulus > 1` the result is rounded down to a multiple of it,
/// otherwise it is rounded to the nearest integer. An axis whose native size
/// is unknown is never clamped; with no wanted value either, it resolves to 0.
pub fn dimension(axis: Axis, settings: &Settings, native: NativeSize, modulus: u32) -> u32 {
    let explicit = |axis: Axis| {
        settings
            .get(axis.key())
            .filter(|v| v.is_present())
            .and_then(|v| v.as_f64())
    };

    let mut wanted = explicit(axis);
    let mut opposite = explicit(axis.opposite());

    if wanted.is_none() {
        if let Some((w, h)) = settings
            .get("dimensions")
            .and_then(|v| v.as_str())
            .and_then(parse_dimensions)
        {
            wanted = Some(axis.pick(w, h));
            opposite = opposite.or(Some(axis.opposite().pick(w, h)));
        }
    }

    let given = native.get(axis);
    let given_opposite = native.get(axis.opposite());

    let value = match wanted {
        Some(wanted) => {
            let mut value = wanted.trunc();
            if let Some(given) = given {
                value = value.min(given);
            }
            if let (Some(opp), Some(given_opp)) = (opposite, given_opposite) {
                if opp.trunc() > given_opp {
                    value *= given_opp / opp;
                }
            }
            value
        }
        None => {
            let Some(mut value) = given else {
                return 0;
            };
            if let (Some(opp), Some(given_opp)) = (opposite, given_opposite) {
                if opp.trunc() < given_opp {
                    value *= opp / given_opp;
                }
            }
            value
        }
    };

    round(value.max(0.0), modulus)
}

fn round(value: f64, modulus: u32) -> u32 {
    if modulus > 1 {
        let whole = value.trunc() as u64;
        let m = u64::from(modulus);
        u32::try_from(whole / m * m).unwrap_or(u32::MAX)
    } else {
        let rounded = value.round();
        if rounded >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            rounded as u32
        }
    }
}
