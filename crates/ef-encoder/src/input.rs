//! The media file a job encodes from.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ef_core::{Error, MediaProperties, Prober, Result};

use crate::frame_rate;

/// Input path together with its probed properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    path: PathBuf,
    properties: MediaProperties,
}

impl Input {
    /// An input with already known properties.
    pub fn new(path: impl Into<PathBuf>, properties: MediaProperties) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    /// Probe `path` and build an input from the result.
    ///
    /// # Errors
    ///
    /// [`Error::Data`] when the prober cannot extract properties.
    pub fn probe(path: impl Into<PathBuf>, prober: &dyn Prober) -> Result<Self> {
        let path = path.into();
        let properties = prober
            .probe(&path)
            .map_err(|e| Error::Data(format!("Extracting input data failed!\n{e}\n")))?;
        tracing::debug!(
            "Probed {} with {}: {:?}",
            path.display(),
            prober.name(),
            properties
        );
        Ok(Self { path, properties })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn properties(&self) -> &MediaProperties {
        &self.properties
    }

    pub fn width(&self) -> Option<u32> {
        self.properties.width
    }

    pub fn height(&self) -> Option<u32> {
        self.properties.height
    }

    pub fn bit_rate(&self) -> Option<u64> {
        self.properties.bit_rate
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.properties.frame_rate
    }

    pub fn duration(&self) -> Option<Duration> {
        self.properties.duration
    }

    /// Width/height ratio of the input picture.
    pub fn aspect(&self) -> Option<f64> {
        self.properties.aspect()
    }

    pub fn is_readable(&self) -> bool {
        self.path.is_file() && File::open(&self.path).is_ok()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_readable() {
            Ok(())
        } else {
            Err(Error::input("Input is not readable"))
        }
    }

    /// The candidate frame rate that fits this input best.
    ///
    /// See [`frame_rate::matching_frame_rate`]. `None` if the input frame
    /// rate is unknown.
    pub fn matching_frame_rate(&self, candidates: &[f64]) -> Option<f64> {
        self.frame_rate()
            .and_then(|rate| frame_rate::matching_frame_rate(rate, candidates))
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
