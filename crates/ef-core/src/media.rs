//! Probed media properties and the [`Prober`] interface.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Properties of an input file as reported by a [`Prober`].
///
/// Every field is optional: an absent value means "unknown", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaProperties {
    /// Width of the primary video stream in pixels.
    pub width: Option<u32>,
    /// Height of the primary video stream in pixels.
    pub height: Option<u32>,
    /// Overall bit rate in bits per second.
    pub bit_rate: Option<u64>,
    /// Frame rate of the primary video stream.
    pub frame_rate: Option<f64>,
    /// Duration of the media.
    #[serde(default, with = "duration_secs")]
    pub duration: Option<Duration>,
    /// File size in bytes.
    pub size: Option<u64>,
}

impl MediaProperties {
    /// Width/height ratio, if both dimensions are known and non-zero.
    pub fn aspect(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(f64::from(w) / f64::from(h)),
            _ => None,
        }
    }
}

/// A media file prober capable of extracting [`MediaProperties`].
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe the file at `path`.
    ///
    /// Fails with [`Error::Data`](crate::Error::Data) when no usable
    /// properties can be extracted.
    fn probe(&self, path: &Path) -> Result<MediaProperties>;
}

/// Serde helpers to (de)serialize `Option<Duration>` as fractional seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64))
    }
}
