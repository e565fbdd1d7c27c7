//! Job-scoped temporary workspace.
//!
//! A [`Workspace`] is the directory the transcoder writes into while a job
//! runs. It is exclusively owned by one job and is deleted when the value is
//! dropped, so it is released on every exit path, including errors.

use std::fs;
use std::path::{Path, PathBuf};

use ef_core::{Error, JobId, Result};
use tempfile::TempDir;

/// Temporary directory holding in-progress output of one job.
///
/// # Example
///
/// ```no_run
/// use ef_av::Workspace;
/// use ef_core::JobId;
///
/// let workspace = Workspace::create(std::path::Path::new("/tmp/encodeforged"), JobId::new())?;
/// // ... the transcoder writes into workspace.join("movie.mp4") ...
/// let copied = workspace.copy_files_to(std::path::Path::new("/srv/media"))?;
/// workspace.remove()?;
/// # Ok::<(), ef_core::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace directory below `root`.
    ///
    /// `root` is created if missing. The directory name starts with the job id.
    pub fn create(root: &Path, job: JobId) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| {
            Error::Workspace(format!(
                "failed to create workspace root {}: {e}",
                root.display()
            ))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{job}-"))
            .tempdir_in(root)
            .map_err(|e| Error::Workspace(format!("failed to create temp dir: {e}")))?;

        tracing::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a named entry inside the workspace.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Entries directly inside the workspace, sorted by name.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(self.path())?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    /// Copy everything produced in the workspace into `dest`, preserving
    /// names. Directories are copied recursively.
    ///
    /// Returns the destination paths of the top-level entries.
    pub fn copy_files_to(&self, dest: &Path) -> Result<Vec<PathBuf>> {
        let relocation_error = |e: std::io::Error| {
            Error::Workspace(format!(
                "Copying output files from {} to {} failed: {e}",
                self.path().display(),
                dest.display()
            ))
        };

        fs::create_dir_all(dest).map_err(relocation_error)?;

        let mut copied = Vec::new();
        for source in self.files()? {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = dest.join(name);
            copy_recursive(&source, &target).map_err(relocation_error)?;
            copied.push(target);
        }

        tracing::debug!(
            "Copied {} file(s) from {} to {}",
            copied.len(),
            self.path().display(),
            dest.display()
        );
        Ok(copied)
    }

    /// Delete the workspace now, reporting failures.
    ///
    /// Dropping a `Workspace` also deletes it but ignores errors.
    pub fn remove(self) -> Result<()> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| Error::Workspace(format!("failed to remove {}: {e}", path.display())))?;
        tracing::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

fn copy_recursive(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        fs::create_dir_all(target)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &target.join(entry.file_name()))?;
        }
    } else {
        fs::copy(source, target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_lives_below_root_and_is_named_after_job() {
        let root = tempfile::tempdir().unwrap();
        let job = JobId::new();
        let ws = Workspace::create(&root.path().join("nested"), job).unwrap();

        assert!(ws.path().starts_with(root.path().join("nested")));
        assert!(ws.path().is_dir());
        let name = ws.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&job.to_string()));
    }

    #[test]
    fn join_stays_inside_workspace() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), JobId::new()).unwrap();
        let file = ws.join("movie-low.mp4");
        assert!(file.starts_with(ws.path()));
        assert_eq!(file.file_name().unwrap(), "movie-low.mp4");
    }

    #[test]
    fn copy_files_preserves_names() {
        let root = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), JobId::new()).unwrap();
        fs::write(ws.join("b.mp4"), b"high").unwrap();
        fs::write(ws.join("a.mp4"), b"low").unwrap();
        fs::create_dir(ws.join("segments")).unwrap();
        fs::write(ws.join("segments/0.ts"), b"seg").unwrap();

        let copied = ws.copy_files_to(dest.path()).unwrap();

        assert_eq!(
            copied,
            vec![
                dest.path().join("a.mp4"),
                dest.path().join("b.mp4"),
                dest.path().join("segments"),
            ]
        );
        assert_eq!(fs::read_to_string(dest.path().join("a.mp4")).unwrap(), "low");
        assert_eq!(
            fs::read_to_string(dest.path().join("segments/0.ts")).unwrap(),
            "seg"
        );
    }

    #[test]
    fn remove_deletes_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create(root.path(), JobId::new()).unwrap();
        let path = ws.path().to_path_buf();
        fs::write(ws.join("partial.mp4"), b"x").unwrap();

        ws.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_deletes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create(root.path(), JobId::new()).unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
