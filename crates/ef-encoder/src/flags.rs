//! Recipe flags: placeholder handlers and the recipe renderer.
//!
//! A recipe is a command template containing `%{name}` placeholders. Each
//! placeholder is filled from the active profile's attributes, optionally
//! transformed by a [`FlagHandler`] registered for that name. The reserved
//! placeholders `input` and `output` expand to quoted paths.
//!
//! ```
//! use std::sync::Arc;
//! use ef_core::settings;
//! use ef_encoder::flags::{FlagHandler, FlagRegistry, FlagRenderer, FlagScope};
//! use ef_encoder::Profile;
//!
//! let mut flags = FlagRegistry::new();
//! flags.define("video_bit_rate", FlagHandler::template("-b:v {value}"));
//!
//! let profile = Profile::new("low", settings! { "video_bit_rate" => 110000 });
//! let scope = FlagScope::new(&profile);
//! let command = FlagRenderer::new(&flags, scope).render("ffmpeg %{video_bit_rate} %{crf}");
//! assert_eq!(command, "ffmpeg -b:v 110000 ");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use ef_core::{Error, Result, SettingValue};
use regex::{Captures, Regex};

use crate::input::Input;
use crate::output::Output;
use crate::profile::Profile;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([^{}]+)\}").expect("placeholder pattern is valid"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("space pattern is valid"));

/// Placeholder names filled from the job rather than from profile settings.
pub const RESERVED: [&str; 2] = ["input", "output"];

type HandlerFn = dyn Fn(&SettingValue, &FlagScope<'_>) -> String + Send + Sync;

/// Renders one placeholder's value into its command-line form.
///
/// A handler sees the raw value and the whole [`FlagScope`], so it may read
/// sibling profile attributes or the job's input.
#[derive(Clone)]
pub struct FlagHandler(Arc<HandlerFn>);

impl FlagHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SettingValue, &FlagScope<'_>) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A handler expanding `{value}` in `template` to the raw value.
    pub fn template(template: impl Into<String>) -> Self {
        let template = template.into();
        Self::new(move |value, _| template.replace("{value}", &value.to_string()))
    }

    pub fn call(&self, value: &SettingValue, scope: &FlagScope<'_>) -> String {
        (self.0)(value, scope)
    }
}

impl fmt::Debug for FlagHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FlagHandler(..)")
    }
}

/// Flag handlers of one encoder kind, chained to its parent kind's handlers.
///
/// Lookup walks the chain from the most specific registry outwards, so a
/// sub-kind overrides an inherited handler of the same name.
#[derive(Debug, Clone, Default)]
pub struct FlagRegistry {
    handlers: BTreeMap<String, FlagHandler>,
    parent: Option<Arc<FlagRegistry>>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Arc<FlagRegistry>) -> Self {
        Self {
            handlers: BTreeMap::new(),
            parent: Some(parent),
        }
    }

    /// Register a handler, replacing one of the same name at this level.
    pub fn define(&mut self, name: impl Into<String>, handler: FlagHandler) {
        self.handlers.insert(name.into(), handler);
    }

    /// The most specific handler for `name`.
    pub fn get(&self, name: &str) -> Option<&FlagHandler> {
        self.handlers
            .get(name)
            .or_else(|| self.parent.as_deref().and_then(|p| p.get(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every handler name visible from this registry, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.parent.as_deref().map(Self::names).unwrap_or_default();
        names.extend(self.handlers.keys().cloned());
        names.sort();
        names.dedup();
        names
    }

    /// Check that every handler name is a usable placeholder.
    pub fn validate(&self) -> Result<()> {
        for name in self.handlers.keys() {
            let valid = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(Error::flag(format!("Invalid flag handler name {name:?}")));
            }
            if RESERVED.contains(&name.as_str()) {
                return Err(Error::flag(format!(
                    "Flag handler {name:?} collides with a reserved placeholder"
                )));
            }
        }
        match &self.parent {
            Some(parent) => parent.validate(),
            None => Ok(()),
        }
    }
}

/// What a render call may read: the active profile and the job's paths.
#[derive(Debug, Clone, Copy)]
pub struct FlagScope<'a> {
    pub profile: &'a Profile,
    pub input: Option<&'a Input>,
    pub output: Option<&'a Output>,
    pub workspace: Option<&'a Path>,
}

impl<'a> FlagScope<'a> {
    pub fn new(profile: &'a Profile) -> Self {
        Self {
            profile,
            input: None,
            output: None,
            workspace: None,
        }
    }

    pub fn input(mut self, input: &'a Input) -> Self {
        self.input = Some(input);
        self
    }

    pub fn output(mut self, output: &'a Output) -> Self {
        self.output = Some(output);
        self
    }

    pub fn workspace(mut self, workspace: &'a Path) -> Self {
        self.workspace = Some(workspace);
        self
    }
}

/// Turns a recipe into a concrete command line.
#[derive(Debug)]
pub struct FlagRenderer<'a> {
    flags: &'a FlagRegistry,
    scope: FlagScope<'a>,
}

impl<'a> FlagRenderer<'a> {
    pub fn new(flags: &'a FlagRegistry, scope: FlagScope<'a>) -> Self {
        Self { flags, scope }
    }

    /// Render `recipe`. Never fails: placeholders that cannot be filled are
    /// removed and the spaces they leave behind collapsed.
    pub fn render(&self, recipe: &str) -> String {
        let rendered = self.render_settings(recipe);
        let rendered = self.render_input(&rendered);
        let rendered = self.render_output(&rendered);
        cleanup(&rendered)
    }

    fn render_settings(&self, recipe: &str) -> String {
        PLACEHOLDER
            .replace_all(recipe, |caps: &Captures<'_>| {
                let name = &caps[1];
                if RESERVED.contains(&name) {
                    return caps[0].to_string();
                }
                match self.scope.profile.attribute(name) {
                    Some(value) => match self.flags.get(name) {
                        Some(handler) => handler.call(&value, &self.scope),
                        None => value.to_string(),
                    },
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn render_input(&self, recipe: &str) -> String {
        match self.scope.input {
            Some(input) => recipe.replace("%{input}", &quote(input.path())),
            None => recipe.to_string(),
        }
    }

    fn render_output(&self, recipe: &str) -> String {
        let (Some(input), Some(output), Some(workspace)) =
            (self.scope.input, self.scope.output, self.scope.workspace)
        else {
            return recipe.to_string();
        };
        match output.file_name(Some(input), Some(self.scope.profile)) {
            Ok(name) => recipe.replace("%{output}", &quote(&workspace.join(name))),
            Err(e) => {
                tracing::debug!("Leaving output placeholder unresolved: {e}");
                recipe.to_string()
            }
        }
    }
}

fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

/// Remove unresolved placeholders and collapse runs of spaces.
pub fn cleanup(recipe: &str) -> String {
    let stripped = PLACEHOLDER.replace_all(recipe, "");
    SPACES.replace_all(&stripped, " ").into_owned()
}
