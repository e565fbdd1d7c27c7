//! Execution of rendered command lines through the system shell.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use ef_core::{Error, Result};
use tokio::process::Command;

#[cfg(not(windows))]
const SHELL: (&str, &str) = ("sh", "-c");
#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd", "/C");

/// Output captured from a command execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A fully rendered command line, executed via `sh -c`.
///
/// Exactly one process is spawned per call and awaited to completion. There
/// is no timeout unless one is set; a hung process blocks the caller.
///
/// # Example
///
/// ```no_run
/// use ef_av::ShellCommand;
///
/// # async fn example() -> ef_core::Result<()> {
/// let output = ShellCommand::new("ffmpeg -i \"in.mp4\" -y \"out.webm\"")
///     .execute()
///     .await?;
/// println!("{}", output.stderr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ShellCommand {
    command: String,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ShellCommand {
    /// Create a new command from a rendered command line.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            current_dir: None,
            timeout: None,
        }
    }

    /// Run the command from the given working directory.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the maximum execution time. `None` waits indefinitely.
    pub fn timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// The command line this will run.
    pub fn command_line(&self) -> &str {
        &self.command
    }

    /// Run the command and capture its output regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if the shell cannot be spawned, if waiting on
    /// it fails, or if the timeout expires (the process is killed).
    pub async fn output(&self) -> Result<ToolOutput> {
        let (shell, flag) = SHELL;
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(&self.command);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(shell, format!("failed to spawn: {e}")))?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_elapsed| {
                    // Dropping the future dropped the child, which kills it.
                    Error::tool(shell, format!("timed out after {limit:?}"))
                })?,
            None => child.wait_with_output().await,
        };

        let output = waited
            .map_err(|e| Error::tool(shell, format!("I/O error waiting for process: {e}")))?;

        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run the command and require a zero exit status.
    ///
    /// # Errors
    ///
    /// Everything [`output`](Self::output) returns, plus
    /// [`Error::Processing`] carrying the captured stderr when the process
    /// exits non-zero.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let output = self.output().await?;
        if !output.success() {
            return Err(Error::processing(&self.command, output.stderr.trim_end()));
        }
        Ok(output)
    }
}
