//! Encoder kinds: a recipe, its flag handlers, presets and hooks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ef_core::config::FormatConfig;
use ef_core::Settings;

use crate::flags::{FlagHandler, FlagRegistry};
use crate::hooks::{DefaultHooks, EncoderHooks};

/// A kind of encoder, e.g. "mp4 via ffmpeg".
///
/// Kinds form an inheritance chain through [`parent`](Self::parent). Recipe,
/// file extension, hooks, presets, registered profiles and flag handlers are
/// inherited, the more specific kind winning on collisions. A kind is
/// immutable once built, so it can be shared between concurrent runs.
pub struct EncoderKind {
    name: String,
    parent: Option<Arc<EncoderKind>>,
    recipe: Option<String>,
    file_extension: Option<String>,
    presets: BTreeMap<String, Settings>,
    registered: BTreeMap<String, Settings>,
    flags: Arc<FlagRegistry>,
    hooks: Arc<dyn EncoderHooks>,
}

impl EncoderKind {
    pub fn builder(name: impl Into<String>) -> EncoderKindBuilder {
        EncoderKindBuilder {
            name: name.into(),
            parent: None,
            recipe: None,
            file_extension: None,
            presets: BTreeMap::new(),
            registered: BTreeMap::new(),
            flags: BTreeMap::new(),
            hooks: None,
        }
    }

    /// Build a kind from its configuration entry.
    pub fn from_config(
        name: impl Into<String>,
        config: &FormatConfig,
        parent: Option<Arc<EncoderKind>>,
    ) -> Self {
        let mut builder = Self::builder(name);
        if let Some(parent) = parent {
            builder = builder.parent(parent);
        }
        if let Some(recipe) = &config.recipe {
            builder = builder.recipe(recipe.clone());
        }
        if let Some(ext) = &config.file_extension {
            builder = builder.file_extension(ext.clone());
        }
        for (preset, settings) in &config.presets {
            builder = builder.preset(preset.clone(), settings.clone());
        }
        for (profile, settings) in &config.profiles {
            builder = builder.register_profile(profile.clone(), settings.clone());
        }
        for (flag, template) in &config.flags {
            builder = builder.flag(flag.clone(), FlagHandler::template(template.clone()));
        }
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<EncoderKind>> {
        self.parent.as_ref()
    }

    /// Whether this kind is `name` or inherits from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.parent.as_ref().is_some_and(|p| p.is_a(name))
    }

    /// The recipe of the most specific kind defining one.
    pub fn recipe(&self) -> Option<&str> {
        self.recipe
            .as_deref()
            .or_else(|| self.parent.as_deref().and_then(EncoderKind::recipe))
    }

    /// Default file extension of produced files.
    pub fn file_extension(&self) -> Option<&str> {
        self.file_extension
            .as_deref()
            .or_else(|| self.parent.as_deref().and_then(EncoderKind::file_extension))
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    pub fn hooks(&self) -> &dyn EncoderHooks {
        self.hooks.as_ref()
    }

    /// Presets defined on this kind only.
    pub fn presets(&self) -> &BTreeMap<String, Settings> {
        &self.presets
    }

    /// Every profile that can be requested by name: registered profiles
    /// merged with presets, presets taking precedence, over whatever the
    /// parent kind makes available.
    pub fn available_profiles(&self) -> BTreeMap<String, Settings> {
        let mut available = self
            .parent
            .as_deref()
            .map(EncoderKind::available_profiles)
            .unwrap_or_default();
        available.extend(self.registered.clone());
        available.extend(self.presets.clone());
        available
    }
}

impl fmt::Debug for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderKind")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("recipe", &self.recipe)
            .field("file_extension", &self.file_extension)
            .field("presets", &self.presets.keys().collect::<Vec<_>>())
            .field("registered", &self.registered.keys().collect::<Vec<_>>())
            .field("flags", &self.flags.names())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EncoderKind`]. Registration happens here and only here.
pub struct EncoderKindBuilder {
    name: String,
    parent: Option<Arc<EncoderKind>>,
    recipe: Option<String>,
    file_extension: Option<String>,
    presets: BTreeMap<String, Settings>,
    registered: BTreeMap<String, Settings>,
    flags: BTreeMap<String, FlagHandler>,
    hooks: Option<Arc<dyn EncoderHooks>>,
}

impl EncoderKindBuilder {
    pub fn parent(mut self, parent: Arc<EncoderKind>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn recipe(mut self, recipe: impl Into<String>) -> Self {
        self.recipe = Some(recipe.into());
        self
    }

    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = Some(ext.into());
        self
    }

    /// Add a fixed preset.
    pub fn preset(mut self, name: impl Into<String>, settings: Settings) -> Self {
        self.presets.insert(name.into(), settings);
        self
    }

    pub fn register_profile(mut self, name: impl Into<String>, settings: Settings) -> Self {
        self.registered.insert(name.into(), settings);
        self
    }

    /// Register a flag handler for the `%{name}` placeholder.
    pub fn flag(mut self, name: impl Into<String>, handler: FlagHandler) -> Self {
        self.flags.insert(name.into(), handler);
        self
    }

    /// Override the run hooks. Without this the parent's hooks are used.
    pub fn hooks(mut self, hooks: Arc<dyn EncoderHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn build(self) -> EncoderKind {
        let mut flags = match &self.parent {
            Some(parent) => FlagRegistry::with_parent(Arc::clone(&parent.flags)),
            None => FlagRegistry::new(),
        };
        for (name, handler) in self.flags {
            flags.define(name, handler);
        }

        let hooks = self
            .hooks
            .or_else(|| self.parent.as_ref().map(|p| Arc::clone(&p.hooks)))
            .unwrap_or_else(|| Arc::new(DefaultHooks));

        EncoderKind {
            name: self.name,
            parent: self.parent,
            recipe: self.recipe,
            file_extension: self.file_extension,
            presets: self.presets,
            registered: self.registered,
            flags: Arc::new(flags),
            hooks,
        }
    }
}
