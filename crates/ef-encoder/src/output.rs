//! Where a job's encoded files end up.

use std::fmt;
use std::path::{Path, PathBuf};

use ef_av::Workspace;
use ef_core::{Error, Result};

use crate::input::Input;
use crate::profile::{Profile, DEFAULT_PROFILE};

/// Target file or directory of a job.
///
/// A path whose last segment has a file-like suffix (`movie.mp4`,
/// `playlist.m3u8`) names the output file. Any other path names the output
/// directory, and file names are derived from the input and the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    path: PathBuf,
}

impl Output {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name given verbatim in the path, if any.
    fn explicit_file_name(&self) -> Option<&str> {
        if self.path.is_dir() {
            return None;
        }
        let name = self.path.file_name()?.to_str()?;
        let dot = name.rfind('.')?;
        (dot > 0 && dot + 1 < name.len()).then_some(name)
    }

    /// The output directory: the path itself unless it names a file.
    pub fn dir(&self) -> PathBuf {
        if self.explicit_file_name().is_none() {
            return self.path.clone();
        }
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// File name for `profile`'s output.
    ///
    /// An explicit file name in the path is used verbatim. Otherwise the
    /// name is the input's stem plus the profile's file extension, with
    /// `-<profile>` appended to the stem unless the profile is the default
    /// one.
    pub fn file_name(&self, input: Option<&Input>, profile: Option<&Profile>) -> Result<String> {
        if let Some(name) = self.explicit_file_name() {
            return Ok(name.to_string());
        }

        let stem = input
            .and_then(|i| i.path().file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::output("Could not determine file name from input or output path")
            })?;

        let extension = profile.and_then(|p| p.file_extension().ok()).ok_or_else(|| {
            Error::output(
                "Could not determine file name because the current profile does not define a file extension",
            )
        })?;

        match profile.map(Profile::name) {
            Some(name) if !name.is_empty() && name != DEFAULT_PROFILE => {
                Ok(format!("{stem}-{name}.{extension}"))
            }
            _ => Ok(format!("{stem}.{extension}")),
        }
    }

    /// Full path of `profile`'s output file.
    pub fn file_path(&self, input: Option<&Input>, profile: Option<&Profile>) -> Result<PathBuf> {
        Ok(self.dir().join(self.file_name(input, profile)?))
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::output("No output defined"));
        }
        Ok(())
    }

    /// Create the output directory unless the path already exists.
    pub fn make_dir(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        let dir = self.dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::Workspace(format!(
                "failed to create output directory {}: {e}",
                dir.display()
            ))
        })
    }

    /// Copy everything in `workspace` into the output directory.
    pub fn copy_files(&self, workspace: &Workspace) -> Result<Vec<PathBuf>> {
        workspace.copy_files_to(&self.dir())
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
