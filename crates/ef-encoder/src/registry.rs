//! Named encoder kinds available to jobs.

use std::collections::BTreeMap;
use std::sync::Arc;

use ef_core::config::Config;
use ef_core::{Error, Result};

use crate::builtin;
use crate::kind::EncoderKind;

/// Registry of encoder kinds by format name.
///
/// Built once at startup, before any job runs, and read-only afterwards.
/// [`with_builtins`](Self::with_builtins) registers `ffmpeg`, `mp4` and
/// `webm`; [`from_config`](Self::from_config) adds the formats defined in the
/// configuration file on top.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Arc<EncoderKind>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let ffmpeg = Arc::new(builtin::ffmpeg());
        registry.register_format("mp4", Arc::new(builtin::mp4(Arc::clone(&ffmpeg))));
        registry.register_format("webm", Arc::new(builtin::webm(Arc::clone(&ffmpeg))));
        registry.register_format("ffmpeg", ffmpeg);
        registry
    }

    /// Built-in kinds plus every format defined in `config`.
    ///
    /// Formats are built parents first. A configured format may replace a
    /// built-in one of the same name and may name it as its parent.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a parent is unknown or parents form a cycle.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::with_builtins();
        let mut pending: BTreeMap<&str, _> = config
            .formats
            .iter()
            .map(|(name, format)| (name.as_str(), format))
            .collect();

        while !pending.is_empty() {
            let ready: Vec<&str> = pending
                .iter()
                .filter(|(name, format)| match format.parent.as_deref() {
                    None => true,
                    Some(parent) if parent == **name => registry.formats.contains_key(parent),
                    Some(parent) => {
                        !pending.contains_key(parent) && registry.formats.contains_key(parent)
                    }
                })
                .map(|(name, _)| *name)
                .collect();

            if ready.is_empty() {
                let (name, format) = pending.iter().next().map(|(n, f)| (*n, *f)).ok_or_else(
                    || Error::Config("format resolution stalled".to_string()),
                )?;
                let parent = format.parent.as_deref().unwrap_or_default();
                return Err(Error::Config(format!(
                    "format {name}: parent {parent} is unknown or forms a cycle"
                )));
            }

            for name in ready {
                let Some(format) = pending.remove(name) else {
                    continue;
                };
                let parent = match format.parent.as_deref() {
                    Some(parent) => Some(registry.require(parent)?),
                    None => None,
                };
                let kind = EncoderKind::from_config(name, format, parent);
                tracing::debug!("Registered format {name} from config");
                registry.register_format(name, Arc::new(kind));
            }
        }

        Ok(registry)
    }

    /// Register `kind` under `name`, returning the kind it replaces.
    pub fn register_format(
        &mut self,
        name: impl Into<String>,
        kind: Arc<EncoderKind>,
    ) -> Option<Arc<EncoderKind>> {
        self.formats.insert(name.into(), kind)
    }

    pub fn get(&self, name: &str) -> Option<Arc<EncoderKind>> {
        self.formats.get(name).cloned()
    }

    /// Like [`get`](Self::get) but failing with a config error.
    pub fn require(&self, name: &str) -> Result<Arc<EncoderKind>> {
        self.get(name).ok_or_else(|| {
            Error::Config(format!(
                "unknown format {name} (available: {})",
                self.names().join(", ")
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered format names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.formats.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<EncoderKind>)> {
        self.formats.iter().map(|(name, kind)| (name.as_str(), kind))
    }
}
