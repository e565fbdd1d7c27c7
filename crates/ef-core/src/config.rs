//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized from TOML. Every section defaults
//! sensibly, so an empty file is valid and yields the built-in formats only.
//!
//! ```toml
//! [workspace]
//! root = "/var/tmp/encodeforged"
//!
//! [tools]
//! command_timeout_secs = 3600
//!
//! [formats.thumbnail]
//! parent = "ffmpeg"
//! recipe = "ffmpeg -i %{input} -vframes 1 %{dimensions} -y %{output}"
//! file_extension = "jpg"
//!
//! [formats.thumbnail.flags]
//! quality = "-q:v {value}"
//!
//! [formats.thumbnail.presets.default]
//! dimensions = "320x180"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Locations searched by [`Config::load_or_default`], in order.
const DEFAULT_PATHS: &[&str] = &[
    "./encodeforged.toml",
    "~/.config/encodeforged/config.toml",
    "/etc/encodeforged/config.toml",
];

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub tools: ToolsConfig,
    /// Encoder kinds defined in configuration, keyed by format name.
    pub formats: BTreeMap<String, FormatConfig>,
}

/// Where job workspaces are created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent directory of every job workspace.
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("encodeforged"),
        }
    }
}

/// External tool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit ffprobe binary; looked up on `PATH` when unset.
    pub ffprobe_path: Option<PathBuf>,
    /// Upper bound for one transcoder invocation. Unset means unbounded.
    pub command_timeout_secs: Option<u64>,
}

impl ToolsConfig {
    /// The configured command timeout, if any.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Definition of one encoder kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Name of the kind this one inherits recipe, extension, presets and
    /// flag handlers from.
    pub parent: Option<String>,
    /// Command template with `%{placeholder}` tokens.
    pub recipe: Option<String>,
    /// Default file extension of produced files.
    pub file_extension: Option<String>,
    /// Fixed profile presets of this kind.
    pub presets: BTreeMap<String, Settings>,
    /// Additional registered profiles.
    pub profiles: BTreeMap<String, Settings>,
    /// Flag handler templates; `{value}` expands to the raw setting value.
    pub flags: BTreeMap<String, String>,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load configuration from `path` if given, otherwise from the first
    /// default location that exists, otherwise return defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                tracing::debug!("Loading config from {}", candidate.display());
                return Self::load(candidate);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    ///
    /// `known_formats` are format names defined outside this configuration
    /// (the built-in kinds) that may be used as parents.
    pub fn validate(&self, known_formats: &[&str]) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, format) in &self.formats {
            match &format.parent {
                Some(parent)
                    if !self.formats.contains_key(parent)
                        && !known_formats.contains(&parent.as_str()) =>
                {
                    warnings.push(format!("format {name}: unknown parent format {parent}"));
                }
                None if format.recipe.as_deref().map_or(true, |r| r.trim().is_empty()) => {
                    warnings.push(format!("format {name}: no recipe defined"));
                }
                _ => {}
            }

            if self.has_parent_cycle(name) {
                warnings.push(format!("format {name}: parent chain forms a cycle"));
            }

            for (profile, settings) in format.presets.iter().chain(&format.profiles) {
                if settings.is_empty() {
                    warnings.push(format!("format {name}: profile {profile} has no settings"));
                }
            }
        }

        warnings
    }

    fn has_parent_cycle(&self, start: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(parent) = self
            .formats
            .get(current)
            .and_then(|f| f.parent.as_deref())
        {
            if !seen.insert(current) || parent == start {
                return true;
            }
            current = parent;
        }
        false
    }
}
