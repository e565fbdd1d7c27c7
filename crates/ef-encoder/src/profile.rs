//! A single named encoding profile.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use ef_core::{Error, MediaProperties, Result, SettingValue, Settings};
use parking_lot::Mutex;

use crate::geometry::{Geometry, NativeSize};
use crate::kind::EncoderKind;

/// Name given to a profile requested as an anonymous settings map.
pub const DEFAULT_PROFILE: &str = "default";

/// One named set of target encoding parameters.
///
/// Geometry is derived from the settings and the input's native size and
/// memoized per rounding modulus. A profile is never mutated after
/// construction; [`with_setting`](Self::with_setting) returns a new one.
pub struct Profile {
    name: String,
    settings: Settings,
    kind: Option<Arc<EncoderKind>>,
    source: Option<Arc<MediaProperties>>,
    geometry: Mutex<HashMap<u32, Geometry>>,
    aspect_ratio: OnceLock<f64>,
}

impl Profile {
    pub fn new(name: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            settings,
            kind: None,
            source: None,
            geometry: Mutex::new(HashMap::new()),
            aspect_ratio: OnceLock::new(),
        }
    }

    /// Attach the encoder kind this profile is encoded with.
    pub fn with_kind(mut self, kind: Arc<EncoderKind>) -> Self {
        self.kind = Some(kind);
        self.reset_caches();
        self
    }

    /// Attach the probed properties of the input the profile applies to.
    pub fn with_source(mut self, source: Arc<MediaProperties>) -> Self {
        self.source = Some(source);
        self.reset_caches();
        self
    }

    /// A copy of this profile with one setting replaced.
    pub fn with_setting(&self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        let mut profile = self.clone();
        profile.settings.insert(key.into(), value.into());
        profile
    }

    /// A copy with the computed aspect ratio written into the settings
    /// under `aspect_ratio`. An explicit setting is left alone.
    pub fn with_cached_aspect_ratio(self) -> Self {
        if self.get("aspect_ratio").is_some() {
            return self;
        }
        let ratio = self.aspect_ratio(1);
        self.with_setting("aspect_ratio", ratio)
    }

    fn reset_caches(&mut self) {
        self.geometry = Mutex::new(HashMap::new());
        self.aspect_ratio = OnceLock::new();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn kind(&self) -> Option<&Arc<EncoderKind>> {
        self.kind.as_ref()
    }

    pub fn source(&self) -> Option<&MediaProperties> {
        self.source.as_deref()
    }

    /// A raw setting, if set to a present value.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings.get(key).filter(|v| v.is_present())
    }

    /// Look up any attribute by name.
    ///
    /// `width`, `height`, `dimensions` and `aspect_ratio` are computed (at
    /// modulus 1), `bit_rate` and `file_extension` are derived, and every
    /// other key reads the settings. Unknown keys yield `None`.
    pub fn attribute(&self, key: &str) -> Option<SettingValue> {
        match key {
            "name" => Some(SettingValue::from(self.name.as_str())),
            "width" => Some(self.width(1)).filter(|w| *w > 0).map(SettingValue::from),
            "height" => Some(self.height(1)).filter(|h| *h > 0).map(SettingValue::from),
            "dimensions" => {
                let g = self.geometry(1);
                (g.width > 0 && g.height > 0).then(|| SettingValue::from(g.dimensions()))
            }
            "aspect_ratio" => Some(SettingValue::from(self.aspect_ratio(1))),
            "bit_rate" => Some(SettingValue::from(self.bit_rate())),
            "file_extension" => self.file_extension().ok().map(SettingValue::from),
            _ => self.get(key).cloned(),
        }
    }

    /// Sorted, duplicate-free setting keys plus the computed geometry keys.
    pub fn attributes(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .settings
            .keys()
            .cloned()
            .chain(["width", "height", "dimensions"].map(String::from))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Explicit `bit_rate`, else `audio_bit_rate + video_bit_rate` with a
    /// missing part counted as zero.
    pub fn bit_rate(&self) -> i64 {
        if let Some(explicit) = self.get("bit_rate").and_then(SettingValue::as_i64) {
            return explicit;
        }
        let part = |key: &str| self.get(key).and_then(SettingValue::as_i64).unwrap_or(0);
        part("audio_bit_rate") + part("video_bit_rate")
    }

    /// Explicit `file_extension`, else the encoder kind's default.
    pub fn file_extension(&self) -> Result<String> {
        self.get("file_extension")
            .map(ToString::to_string)
            .or_else(|| {
                self.kind
                    .as_ref()
                    .and_then(|k| k.file_extension())
                    .map(str::to_string)
            })
            .ok_or_else(|| Error::profile("Define a file extension for this profile"))
    }

    /// Geometry at `modulus`, memoized.
    pub fn geometry(&self, modulus: u32) -> Geometry {
        let modulus = modulus.max(1);
        let mut cache = self.geometry.lock();
        *cache.entry(modulus).or_insert_with(|| {
            let native = self.source().map(NativeSize::from).unwrap_or_default();
            Geometry::resolve(&self.settings, native, modulus)
        })
    }

    pub fn width(&self, modulus: u32) -> u32 {
        self.geometry(modulus).width
    }

    pub fn height(&self, modulus: u32) -> u32 {
        self.geometry(modulus).height
    }

    /// `WxH` at `modulus`.
    pub fn dimensions(&self, modulus: u32) -> String {
        self.geometry(modulus).dimensions()
    }

    /// Explicit `aspect_ratio` setting, else width/height of the first
    /// computed geometry. The computed value is kept for the profile's
    /// lifetime regardless of the modulus asked for later.
    pub fn aspect_ratio(&self, modulus: u32) -> f64 {
        if let Some(explicit) = self.get("aspect_ratio").and_then(SettingValue::as_f64) {
            return explicit;
        }
        *self
            .aspect_ratio
            .get_or_init(|| self.geometry(modulus).aspect_ratio())
    }

    /// Ensure name, settings and encoder kind are present.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::profile("Define a name for this profile"));
        }
        if self.settings.is_empty() {
            return Err(Error::profile("Define a settings hash for this profile"));
        }
        if self.kind.is_none() {
            return Err(Error::profile("Define an encoder class for this profile"));
        }
        Ok(())
    }
}

impl Clone for Profile {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            settings: self.settings.clone(),
            kind: self.kind.clone(),
            source: self.source.clone(),
            geometry: Mutex::new(HashMap::new()),
            aspect_ratio: OnceLock::new(),
        }
    }
}

/// Profiles are equal when their names and settings are.
impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.settings == other.settings
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("kind", &self.kind.as_ref().map(|k| k.name()))
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_core::{settings, ErrorKind};

    fn kind() -> Arc<EncoderKind> {
        Arc::new(EncoderKind::builder("test").file_extension("mp4").build())
    }

    fn source() -> Arc<MediaProperties> {
        Arc::new(MediaProperties {
            width: Some(720),
            height: Some(480),
            bit_rate: Some(1_000_000),
            ..Default::default()
        })
    }

    fn profile(settings: Settings) -> Profile {
        Profile::new("some", settings)
            .with_kind(kind())
            .with_source(source())
    }

    #[test]
    fn bit_rate_sums_audio_and_video() {
        let p = profile(settings! { "audio_bit_rate" => 32000, "video_bit_rate" => 110000 });
        assert_eq!(p.bit_rate(), 142000);
    }

    #[test]
    fn bit_rate_counts_missing_parts_as_zero() {
        assert_eq!(profile(settings! { "video_bit_rate" => 110000 }).bit_rate(), 110000);
        assert_eq!(profile(settings! { "audio_bit_rate" => 32000 }).bit_rate(), 32000);
        assert_eq!(profile(settings! { "frame_rate" => 8 }).bit_rate(), 0);
    }

    #[test]
    fn explicit_bit_rate_wins() {
        let p = profile(settings! {
            "bit_rate" => 500000,
            "audio_bit_rate" => 32000,
            "video_bit_rate" => 110000,
        });
        assert_eq!(p.bit_rate(), 500000);
    }

    #[test]
    fn attributes_include_geometry_keys() {
        let p = profile(settings! { "video_bit_rate" => 110000, "width" => 250, "audio_channels" => 1 });
        assert_eq!(
            p.attributes(),
            vec!["audio_channels", "dimensions", "height", "video_bit_rate", "width"]
        );
    }

    #[test]
    fn geometry_uses_source() {
        let p = profile(settings! { "width" => 250 });
        assert_eq!(p.width(1), 250);
        assert_eq!(p.width(16), 240);
        assert_eq!(p.height(1), 167);
        assert_eq!(p.dimensions(16), "240x160");
    }

    #[test]
    fn unset_geometry_matches_input() {
        let p = profile(settings! { "video_bit_rate" => 110000 });
        assert_eq!(p.width(1), 720);
        assert_eq!(p.height(1), 480);
    }

    #[test]
    fn aspect_ratio_is_computed_once() {
        let p = profile(settings! { "dimensions" => "300x200" });
        assert_eq!(p.aspect_ratio(1), 1.5);
        // The first computed value sticks.
        assert_eq!(p.aspect_ratio(16), 1.5);
    }

    #[test]
    fn cached_aspect_ratio_becomes_a_setting() {
        let p = profile(settings! { "dimensions" => "300x200" }).with_cached_aspect_ratio();
        assert_eq!(p.settings()["aspect_ratio"], SettingValue::Float(1.5));
        assert_eq!(
            p.attributes(),
            vec!["aspect_ratio", "dimensions", "height", "width"]
        );
        assert_eq!(p.aspect_ratio(16), 1.5);
    }

    #[test]
    fn cached_aspect_ratio_defaults_to_one_without_geometry() {
        let p = Profile::new("some", settings! { "video_bit_rate" => 1 }).with_cached_aspect_ratio();
        assert_eq!(p.settings()["aspect_ratio"], SettingValue::Float(1.0));
    }

    #[test]
    fn explicit_aspect_ratio_wins() {
        let p = profile(settings! { "aspect_ratio" => 1.7777 });
        assert_eq!(p.aspect_ratio(1), 1.7777);
    }

    #[test]
    fn attribute_lookup() {
        let p = profile(settings! {
            "video_bit_rate" => 110000,
            "two_pass" => false,
            "preset" => "",
        });
        assert_eq!(p.attribute("video_bit_rate"), Some(SettingValue::from(110000)));
        assert_eq!(p.attribute("dimensions"), Some(SettingValue::from("720x480")));
        assert_eq!(p.attribute("width"), Some(SettingValue::from(720)));
        assert_eq!(p.attribute("bit_rate"), Some(SettingValue::from(110000)));
        assert_eq!(p.attribute("file_extension"), Some(SettingValue::from("mp4")));
        assert_eq!(p.attribute("unknown"), None);
        assert_eq!(p.attribute("two_pass"), None);
        assert_eq!(p.attribute("preset"), None);
    }

    #[test]
    fn geometry_without_source_uses_explicit_values_only() {
        let p = Profile::new("some", settings! { "width" => 720, "height" => 480 });
        assert_eq!(p.attribute("dimensions"), Some(SettingValue::from("720x480")));
        let p = Profile::new("some", settings! { "size" => 3 });
        assert_eq!(p.attribute("width"), None);
        assert_eq!(p.attribute("dimensions"), None);
    }

    #[test]
    fn file_extension_falls_back_to_kind() {
        assert_eq!(profile(settings! { "a" => 1 }).file_extension().unwrap(), "mp4");
        let p = profile(settings! { "file_extension" => "webm" });
        assert_eq!(p.file_extension().unwrap(), "webm");
    }

    #[test]
    fn missing_file_extension_is_a_profile_error() {
        let kind = Arc::new(EncoderKind::builder("bare").build());
        let p = Profile::new("some", settings! { "a" => 1 }).with_kind(kind);
        let err = p.file_extension().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Profile);
    }

    #[test]
    fn validate_requires_name() {
        let p = Profile::new("", settings! { "a" => 1 }).with_kind(kind());
        assert_eq!(p.validate().unwrap_err().to_string(), "Define a name for this profile");
    }

    #[test]
    fn validate_requires_settings() {
        let p = Profile::new("some", Settings::new()).with_kind(kind());
        assert_eq!(
            p.validate().unwrap_err().to_string(),
            "Define a settings hash for this profile"
        );
    }

    #[test]
    fn validate_requires_kind() {
        let p = Profile::new("some", settings! { "a" => 1 });
        assert_eq!(
            p.validate().unwrap_err().to_string(),
            "Define an encoder class for this profile"
        );
    }

    #[test]
    fn with_setting_returns_fresh_profile() {
        let p = profile(settings! { "width" => 250 });
        assert_eq!(p.width(1), 250);
        let q = p.with_setting("width", 300);
        assert_eq!(q.width(1), 300);
        assert_eq!(p.width(1), 250);
        assert_eq!(q.name(), "some");
    }
}
