//! Resolution of a job's profile request into an ordered profile set.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use ef_core::{Error, MediaProperties, Result, Settings};
use parking_lot::Mutex;

use crate::kind::EncoderKind;
use crate::profile::{Profile, DEFAULT_PROFILE};

/// Attribute profiles are processed in by default.
pub const DEFAULT_SORT_ATTRIBUTE: &str = "bit_rate";

/// Which profiles a job asks for.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProfileRequest {
    /// The kind's `default` profile.
    #[default]
    Default,
    /// One profile available on the kind, by name.
    Named(String),
    /// One anonymous profile, named `default`.
    Inline(Settings),
    /// Several profiles given inline, keyed by name.
    Many(BTreeMap<String, Settings>),
    /// Several profiles available on the kind, by name.
    Names(Vec<String>),
}

impl From<&str> for ProfileRequest {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<Settings> for ProfileRequest {
    fn from(settings: Settings) -> Self {
        Self::Inline(settings)
    }
}

impl From<Vec<String>> for ProfileRequest {
    fn from(names: Vec<String>) -> Self {
        Self::Names(names)
    }
}

impl From<BTreeMap<String, Settings>> for ProfileRequest {
    fn from(profiles: BTreeMap<String, Settings>) -> Self {
        Self::Many(profiles)
    }
}

fn undefined(name: &str) -> Error {
    Error::profile(format!("Profile {name:?} is undefined"))
}

/// Resolve `request` into `(name, settings)` pairs against what `kind` makes
/// available.
pub fn resolve_config(
    request: &ProfileRequest,
    kind: &EncoderKind,
) -> Result<Vec<(String, Settings)>> {
    let available = || kind.available_profiles();

    let config: Vec<(String, Settings)> = match request {
        ProfileRequest::Many(profiles) => profiles
            .iter()
            .map(|(name, settings)| (name.clone(), settings.clone()))
            .collect(),
        ProfileRequest::Names(names) => {
            let available = available();
            let mut seen = HashSet::new();
            names
                .iter()
                .filter(|name| seen.insert(name.as_str()))
                .map(|name| {
                    available
                        .get(name)
                        .map(|settings| (name.clone(), settings.clone()))
                        .ok_or_else(|| undefined(name))
                })
                .collect::<Result<Vec<_>>>()?
        }
        ProfileRequest::Inline(settings) => vec![(DEFAULT_PROFILE.to_string(), settings.clone())],
        ProfileRequest::Named(name) => {
            let settings = available().remove(name).ok_or_else(|| undefined(name))?;
            vec![(DEFAULT_PROFILE.to_string(), settings)]
        }
        ProfileRequest::Default => {
            let settings = available()
                .remove(DEFAULT_PROFILE)
                .ok_or_else(|| Error::profile("No default profile defined"))?;
            vec![(DEFAULT_PROFILE.to_string(), settings)]
        }
    };

    if config.is_empty() {
        return Err(Error::profile("No profiles defined"));
    }
    Ok(config)
}

/// The validated profiles of one job.
///
/// Resolution is eager: a set only exists once every requested profile has
/// been found and validated, so iteration never silently yields nothing.
#[derive(Debug)]
pub struct ProfileSet {
    profiles: Vec<Profile>,
    sorted: Mutex<HashMap<String, Arc<[usize]>>>,
}

impl ProfileSet {
    /// Resolve and validate the profiles `request` names.
    ///
    /// # Errors
    ///
    /// A profile error when a named profile is unknown, no default profile
    /// exists, or a resolved profile is incomplete.
    pub fn resolve(
        request: &ProfileRequest,
        kind: &Arc<EncoderKind>,
        source: Option<Arc<MediaProperties>>,
    ) -> Result<Self> {
        let profiles = resolve_config(request, kind)?
            .into_iter()
            .map(|(name, settings)| {
                let mut profile = Profile::new(name, settings).with_kind(Arc::clone(kind));
                if let Some(source) = &source {
                    profile = profile.with_source(Arc::clone(source));
                }
                profile.validate()?;
                Ok(profile.with_cached_aspect_ratio())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_profiles(profiles))
    }

    fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles,
            sorted: Mutex::new(HashMap::new()),
        }
    }

    /// Re-check every profile.
    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(Error::profile("No profiles defined"));
        }
        self.profiles.iter().try_for_each(Profile::validate)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Whether more than one profile is in use.
    pub fn is_multi(&self) -> bool {
        self.profiles.len() > 1
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(Profile::name).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    /// Profiles in ascending bit rate, the order they are processed in.
    pub fn sorted(&self) -> Vec<&Profile> {
        self.sorted_by(DEFAULT_SORT_ATTRIBUTE)
    }

    /// Profiles sorted ascending by `attribute`. The sort is stable, puts
    /// profiles lacking the attribute first, and is computed once per
    /// attribute.
    pub fn sorted_by(&self, attribute: &str) -> Vec<&Profile> {
        let order = {
            let mut cache = self.sorted.lock();
            Arc::clone(cache.entry(attribute.to_string()).or_insert_with(|| {
                let keys: Vec<_> = self.profiles.iter().map(|p| p.attribute(attribute)).collect();
                let mut order: Vec<usize> = (0..self.profiles.len()).collect();
                order.sort_by(|&a, &b| match (&keys[a], &keys[b]) {
                    (Some(x), Some(y)) => x.compare(y),
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                });
                order.into()
            }))
        };
        order.iter().map(|&i| &self.profiles[i]).collect()
    }
}

impl PartialEq for ProfileSet {
    fn eq(&self, other: &Self) -> bool {
        self.profiles == other.profiles
    }
}

impl<'a> IntoIterator for &'a ProfileSet {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
