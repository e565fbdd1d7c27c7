//! # ef-encoder
//!
//! Profile resolution, recipe templating and the encoding run loop.
//!
//! An [`EncoderKind`] bundles a recipe such as
//! `ffmpeg -i %{input} %{video_bit_rate} -y %{output}` with flag handlers,
//! presets and run hooks. A job asks for one or more profiles
//! ([`ProfileRequest`]); these resolve into a [`ProfileSet`] whose
//! [`Profile`]s compute their target geometry against the input's native
//! size. The [`Encoder`] then renders the recipe for each profile, lowest
//! bit rate first, runs it, and delivers the produced files.
//!
//! - [`geometry`] -- scale-to-fit dimension arithmetic.
//! - [`flags`] -- flag handlers and the recipe renderer.
//! - [`registry`] -- named formats, built-in and configured.

pub mod builtin;
pub mod encoder;
pub mod flags;
pub mod frame_rate;
pub mod geometry;
pub mod hooks;
pub mod input;
pub mod job;
pub mod kind;
pub mod output;
pub mod profile;
pub mod profiles;
pub mod registry;

pub use encoder::{Encoder, RenderedCommand, RunReport};
pub use flags::{FlagHandler, FlagRegistry, FlagRenderer, FlagScope};
pub use geometry::{Geometry, NativeSize};
pub use hooks::{DefaultHooks, EncoderHooks};
pub use input::Input;
pub use job::Job;
pub use kind::{EncoderKind, EncoderKindBuilder};
pub use output::Output;
pub use profile::{Profile, DEFAULT_PROFILE};
pub use profiles::{ProfileRequest, ProfileSet};
pub use registry::FormatRegistry;
