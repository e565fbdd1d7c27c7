//! Profile setting values.
//!
//! A profile's settings are a flat key/value mapping. Keys are encoding
//! parameter names (`video_bit_rate`, `dimensions`, ...) and values are
//! numbers, strings (including `WxH` dimension strings) or booleans.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Settings of one profile, keyed by parameter name.
pub type Settings = BTreeMap<String, SettingValue>;

/// A single profile setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    /// Numeric view of the value. Text is parsed leniently (`"1280"` → 1280).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Integer view of the value. Floats are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
            _ => None,
        }
    }

    /// String view of text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// `false` and empty text count as unset when looked up as attributes.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Total order used when sorting profiles by an attribute.
    ///
    /// Numbers (including numeric text) compare numerically, other text
    /// compares lexicographically, and booleans sort before numbers which
    /// sort before non-numeric text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.sort_key(), other.sort_key()) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(&b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(&b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn sort_key(&self) -> SortKey<'_> {
        match self {
            Self::Bool(b) => SortKey::Bool(*b),
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => SortKey::Number(n),
                Err(_) => SortKey::Text(s),
            },
            other => SortKey::Number(other.as_f64().unwrap_or(0.0)),
        }
    }
}

enum SortKey<'a> {
    Bool(bool),
    Number(f64),
    Text(&'a str),
}

impl SortKey<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Bool(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u64> for SettingValue {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Build a [`Settings`] map from `key => value` pairs.
///
/// ```
/// let s = ef_core::settings! { "video_bit_rate" => 110000, "dimensions" => "240x160" };
/// assert_eq!(s.len(), 2);
/// ```
#[macro_export]
macro_rules! settings {
    () => { $crate::Settings::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Settings::new();
        $( map.insert(::std::string::String::from($key), $crate::SettingValue::from($value)); )+
        map
    }};
}
