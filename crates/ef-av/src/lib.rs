//! # ef-av
//!
//! The external collaborators an encoding job drives.
//!
//! This crate provides:
//!
//! - **Command execution** ([`ShellCommand`]) -- runs one rendered command line
//!   through the system shell, capturing stdout and stderr, with an optional
//!   timeout.
//! - **Workspace management** ([`Workspace`]) -- the job-scoped temporary
//!   directory that receives transcoder output and is removed on every exit
//!   path.
//! - **Probing** ([`FfprobeProber`]) -- implements [`ef_core::Prober`] by
//!   shelling out to `ffprobe`.
//! - **Tool discovery** ([`tools`]) -- locate external binaries on `PATH`.

pub mod command;
pub mod probe;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ShellCommand, ToolOutput};
pub use probe::FfprobeProber;
pub use tools::{check_tool, check_tools, require_tool, tool_path, ToolInfo};
pub use workspace::Workspace;
