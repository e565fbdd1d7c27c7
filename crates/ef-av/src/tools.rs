//! External tool detection.

use std::path::{Path, PathBuf};
use std::process::Command;

use ef_core::{Error, Result};
use serde::Serialize;

/// Availability of an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line the tool prints for its version flag.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Check whether a tool is available, asking it for `--version`.
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "--version")
}

/// Check whether a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let Ok(path) = which::which(name) else {
        return ToolInfo::missing(name);
    };

    match Command::new(&path).arg(version_arg).output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: name.to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            path: Some(path),
        },
        // Found on PATH but the version probe failed: still usable.
        _ => ToolInfo {
            name: name.to_string(),
            available: true,
            version: None,
            path: Some(path),
        },
    }
}

/// Look a tool up on `PATH` without running it.
fn locate(name: &str) -> ToolInfo {
    match which::which(name) {
        Ok(path) => ToolInfo {
            name: name.to_string(),
            available: true,
            version: None,
            path: Some(path),
        },
        Err(_) => ToolInfo::missing(name),
    }
}

impl ToolInfo {
    fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        }
    }
}

/// Check the tools the built-in encoder kinds rely on: the transcoder, the
/// prober and the shell recipes run through.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![
        check_tool_with_arg("ffmpeg", "-version"),
        check_tool_with_arg("ffprobe", "-version"),
        locate("sh"),
    ]
}

/// Require that a tool is on `PATH`, returning its location.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool(name, "not found on PATH"))
}

/// Path to a tool, preferring an explicitly configured location.
///
/// A configured path that does not exist is an error rather than a silent
/// fallback to `PATH`.
pub fn tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(Error::tool(
            name,
            format!("configured path {} does not exist", path.display()),
        )),
        None => require_tool(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_unavailable() {
        let info = check_tool("nonexistent_tool_12345");
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn require_missing_tool_fails() {
        let err = require_tool("nonexistent_tool_12345").unwrap_err();
        assert_eq!(err.to_string(), "Tool error [nonexistent_tool_12345]: not found on PATH");
    }

    #[test]
    fn configured_path_must_exist() {
        let err = tool_path("ffprobe", Some(Path::new("/nonexistent/ffprobe"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("ffprobe");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(tool_path("ffprobe", Some(&fake)).unwrap(), fake);
    }

    #[cfg(unix)]
    #[test]
    fn shell_is_available() {
        let tools = check_tools();
        let sh = tools.iter().find(|t| t.name == "sh").unwrap();
        assert!(sh.available);
    }
}
