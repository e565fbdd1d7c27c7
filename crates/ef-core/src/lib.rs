//! ef-core: shared types, errors, configuration and media properties.
//!
//! This crate is the foundational dependency for the other ef-* crates. It
//! provides the error taxonomy used across the encoder, the [`SettingValue`]
//! type profiles are built from, probed [`MediaProperties`] together with the
//! [`Prober`] trait, a typed [`JobId`], and TOML application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;
pub mod settings;

// Re-export the most commonly used items at the crate root.
pub use error::{ConfigurationError, Error, ErrorKind, Result};
pub use ids::JobId;
pub use media::{MediaProperties, Prober};
pub use settings::{SettingValue, Settings};
