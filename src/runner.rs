//! Shell command execution.
//!
//! A nonzero exit is a normal, representable outcome. Only a failure to
//! start the interpreter is treated as a fault, and even that is returned as
//! an [`ExecutionResult`] (with [`SPAWN_FAILURE_EXIT_CODE`]) so callers have a
//! single shape to handle.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

/// Exit code reported when the command could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Default interpreter for shell lines.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Substrings in stdout that count as a failure signal when stderr is empty.
pub const STDOUT_ERROR_INDICATORS: &[&str] =
    &["error", "failed", "fatal", "not found", "denied", "cannot"];

/// Captured outcome of one shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// True when the interpreter never ran.
    pub spawn_failed: bool,
}

impl ExecutionResult {
    /// Result of a command that ran to completion.
    pub fn completed(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            spawn_failed: false,
        }
    }

    /// Result standing in for a command that could not be started.
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            spawn_failed: true,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Text used for diagnosis: stderr when present, otherwise stdout.
    #[must_use]
    pub fn failure_signal(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Whether this result should enter remediation.
    ///
    /// Requires a nonzero exit and either stderr output or an error word in
    /// stdout. Spawn faults are tool problems, not diagnosable failures.
    #[must_use]
    pub fn failure_detected(&self) -> bool {
        if self.succeeded() || self.spawn_failed {
            return false;
        }
        if !self.stderr.trim().is_empty() {
            return true;
        }
        let stdout = self.stdout.to_lowercase();
        STDOUT_ERROR_INDICATORS
            .iter()
            .any(|indicator| stdout.contains(indicator))
    }

    /// Labelled text form used for display and for the conversation log.
    #[must_use]
    pub fn render(&self) -> String {
        if self.spawn_failed {
            return format!("Error executing command: {}\n", self.stderr.trim_end());
        }

        let mut output = String::new();
        if !self.stdout.is_empty() {
            output.push_str(&format!("STDOUT:\n{}\n", self.stdout));
        }
        if !self.stderr.is_empty() {
            output.push_str(&format!("STDERR:\n{}\n", self.stderr));
        }
        if self.exit_code != 0 {
            output.push_str(&format!("Return code: {}\n", self.exit_code));
        }

        if output.is_empty() {
            "Command executed successfully (no output)".to_string()
        } else {
            output
        }
    }
}

/// Executes one shell line in a working directory.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `cwd` as the working directory.
    ///
    /// Never fails: spawn problems come back as a spawn-failure result.
    async fn run(&self, command: &str, cwd: &Path) -> ExecutionResult;
}

/// Runs commands through a shell interpreter (`<shell> -c <line>`).
///
/// The line is handed to the shell as-is; no quoting or validation happens
/// here. Consent is the operator's job.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellRunner {
    #[must_use]
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path) -> ExecutionResult {
        debug!("Running `{}` in {}", command, cwd.display());

        let output = AsyncCommand::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            // installers and other prompts read the operator's answers
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) => {
                // killed by a signal has no code
                let exit_code = output.status.code().unwrap_or(SPAWN_FAILURE_EXIT_CODE);
                debug!("`{}` exited with {}", command, exit_code);
                ExecutionResult::completed(
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr),
                    exit_code,
                )
            }
            Err(e) => {
                warn!("Failed to spawn {}: {}", self.shell.display(), e);
                ExecutionResult::spawn_failure(format!(
                    "failed to start {}: {}",
                    self.shell.display(),
                    e
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_failure_signal_prefers_stderr() {
        let result = ExecutionResult::completed("out", "err", 1);
        assert_eq!(result.failure_signal(), "err");

        let result = ExecutionResult::completed("only stdout", "  \n", 1);
        assert_eq!(result.failure_signal(), "only stdout");
    }

    #[test]
    fn test_failure_detected_requires_nonzero_exit() {
        assert!(!ExecutionResult::completed("", "warning: noisy", 0).failure_detected());
        assert!(ExecutionResult::completed("", "boom", 2).failure_detected());
    }

    #[test]
    fn test_failure_detected_from_stdout_indicator() {
        assert!(ExecutionResult::completed("Fatal: repository missing", "", 128).failure_detected());
        // grep with no match: nonzero, nothing to diagnose
        assert!(!ExecutionResult::completed("", "", 1).failure_detected());
        assert!(!ExecutionResult::completed("3 lines", "", 1).failure_detected());
    }

    #[test]
    fn test_spawn_failure_is_not_diagnosable() {
        let result = ExecutionResult::spawn_failure("no shell");
        assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(!result.succeeded());
        assert!(!result.failure_detected());
        assert!(result.render().contains("Error executing command"));
    }

    #[test]
    fn test_render_sections() {
        let rendered = ExecutionResult::completed("hello", "oops", 3).render();
        assert!(rendered.contains("STDOUT:\nhello"));
        assert!(rendered.contains("STDERR:\noops"));
        assert!(rendered.contains("Return code: 3"));

        let rendered = ExecutionResult::completed("", "", 0).render();
        assert_eq!(rendered, "Command executed successfully (no output)");
    }

    #[tokio::test]
    async fn test_shell_runner_captures_output() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::default();
        let result = runner.run("echo hello; echo oops >&2", temp.path()).await;
        assert!(result.succeeded());
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_shell_runner_shares_operator_stdin() {
        let temp = TempDir::new().unwrap();
        let ours = std::fs::read_link("/proc/self/fd/0").unwrap();

        let result = ShellRunner::default()
            .run("readlink /proc/self/fd/0", temp.path())
            .await;

        assert!(result.succeeded());
        assert_eq!(result.stdout.trim(), ours.to_string_lossy());
    }

    #[tokio::test]
    async fn test_shell_runner_nonzero_exit_is_not_a_fault() {
        let temp = TempDir::new().unwrap();
        let result = ShellRunner::default().run("exit 3", temp.path()).await;
        assert_eq!(result.exit_code, 3);
        assert!(!result.spawn_failed);
    }

    #[tokio::test]
    async fn test_shell_runner_uses_working_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "x").unwrap();
        let result = ShellRunner::default().run("ls", temp.path()).await;
        assert!(result.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_failure() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::new("/nonexistent/shell-for-tests");
        let result = runner.run("echo hi", temp.path()).await;
        assert!(result.spawn_failed);
        assert_eq!(result.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(result.stderr.contains("/nonexistent/shell-for-tests"));
    }
}
