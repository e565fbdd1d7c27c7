//! FFprobe-based [`Prober`] implementation.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and maps the JSON output into [`MediaProperties`].

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use ef_core::{Error, MediaProperties, Prober, Result};
use serde::Deserialize;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Create a prober that finds ffprobe on `PATH`.
    pub fn from_path() -> Option<Self> {
        which::which("ffprobe").ok().map(Self::new)
    }

    /// Create a prober from an optional configured ffprobe location,
    /// falling back to `PATH`.
    pub fn from_config(configured: Option<&Path>) -> Result<Self> {
        crate::tools::tool_path("ffprobe", configured).map(Self::new)
    }
}

impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<MediaProperties> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| Error::tool("ffprobe", format!("failed to spawn: {e}")))?;

        if !output.status.success() {
            return Err(Error::Data(format!(
                "ffprobe exited with status {} for {}",
                output.status,
                path.display()
            )));
        }

        parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    bit_rate: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Map raw ffprobe JSON into [`MediaProperties`].
///
/// Fields ffprobe does not report stay `None`.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaProperties> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Data(format!("ffprobe JSON parse error: {e}")))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let bit_rate = output
        .format
        .bit_rate
        .as_deref()
        .or_else(|| video.and_then(|v| v.bit_rate.as_deref()))
        .and_then(|s| s.parse::<u64>().ok());

    Ok(MediaProperties {
        width: video.and_then(|v| v.width).filter(|w| *w > 0),
        height: video.and_then(|v| v.height).filter(|h| *h > 0),
        bit_rate,
        frame_rate: video
            .and_then(|v| v.r_frame_rate.as_deref())
            .and_then(parse_frame_rate),
        duration: output
            .format
            .duration
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64),
        size: output.format.size.and_then(|s| s.parse::<u64>().ok()),
    })
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let rate = match rate_str.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate_str.parse().ok()?,
    };
    (rate > 0.0).then_some(rate)
}
