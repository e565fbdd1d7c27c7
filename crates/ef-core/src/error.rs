//! Unified error type for encodeforged.
//!
//! Setup and definition mistakes are grouped under [`ConfigurationError`] so
//! callers can tell them apart from failures of the external transcoder
//! ([`Error::Processing`]) or of media probing ([`Error::Data`]).

use std::fmt;

/// Mistakes in how a job or an encoder kind was set up.
///
/// These are detected before (or independently of) running an external
/// process. They are never retried and their message is surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Missing or unusable input file.
    #[error("{0}")]
    Input(String),

    /// Missing output location or undeterminable output file name.
    #[error("{0}")]
    Output(String),

    /// A profile could not be resolved or is incomplete.
    #[error("{0}")]
    Profile(String),

    /// The encoder kind has no usable recipe.
    #[error("{0}")]
    Recipe(String),

    /// The flag handler context is missing or invalid.
    #[error("{0}")]
    Flag(String),
}

/// Discriminant of an [`Error`], useful for matching on the failure family
/// without caring about the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Input,
    Output,
    Profile,
    Recipe,
    Flag,
    Processing,
    Data,
    Tool,
    Workspace,
    Config,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Profile => "profile",
            Self::Recipe => "recipe",
            Self::Flag => "flag",
            Self::Processing => "processing",
            Self::Data => "data",
            Self::Tool => "tool",
            Self::Workspace => "workspace",
            Self::Config => "config",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Unified error type covering all failure modes in encodeforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A setup or definition mistake.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The external command ran but exited with a non-zero status.
    #[error("Execution failed:\n{stderr}")]
    Processing {
        /// The rendered command line that failed.
        command: String,
        /// Captured standard error of the process.
        stderr: String,
    },

    /// Media probing failed to produce usable properties.
    #[error("{0}")]
    Data(String),

    /// An external tool could not be spawned, waited on, or timed out.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Workspace creation or artifact relocation failed.
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// A configuration file or format definition is malformed.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`ConfigurationError::Input`].
    pub fn input(message: impl Into<String>) -> Self {
        ConfigurationError::Input(message.into()).into()
    }

    /// Convenience constructor for [`ConfigurationError::Output`].
    pub fn output(message: impl Into<String>) -> Self {
        ConfigurationError::Output(message.into()).into()
    }

    /// Convenience constructor for [`ConfigurationError::Profile`].
    pub fn profile(message: impl Into<String>) -> Self {
        ConfigurationError::Profile(message.into()).into()
    }

    /// Convenience constructor for [`ConfigurationError::Recipe`].
    pub fn recipe(message: impl Into<String>) -> Self {
        ConfigurationError::Recipe(message.into()).into()
    }

    /// Convenience constructor for [`ConfigurationError::Flag`].
    pub fn flag(message: impl Into<String>) -> Self {
        ConfigurationError::Flag(message.into()).into()
    }

    /// Convenience constructor for [`Error::Processing`].
    pub fn processing(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Error::Processing {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration family.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(ConfigurationError::Input(_)) => ErrorKind::Input,
            Error::Configuration(ConfigurationError::Output(_)) => ErrorKind::Output,
            Error::Configuration(ConfigurationError::Profile(_)) => ErrorKind::Profile,
            Error::Configuration(ConfigurationError::Recipe(_)) => ErrorKind::Recipe,
            Error::Configuration(ConfigurationError::Flag(_)) => ErrorKind::Flag,
            Error::Processing { .. } => ErrorKind::Processing,
            Error::Data(_) => ErrorKind::Data,
            Error::Tool { .. } => ErrorKind::Tool,
            Error::Workspace(_) => ErrorKind::Workspace,
            Error::Config(_) => ErrorKind::Config,
            Error::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
