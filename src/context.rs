//! Process-wide session state and prompt assembly.

use crate::conversation::{render_history, ConversationLog, Turn};
use crate::error::{HackAssistError, Result};
use crate::parser::ResponseFormat;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::debug;

/// Fallback when the host cannot describe itself.
pub const UNKNOWN_SYSTEM: &str = "Unknown Linux system";

/// State created once at startup and owned by the session loop.
///
/// Only the conversation log changes after construction.
#[derive(Debug)]
pub struct SessionContext {
    working_directory: PathBuf,
    system_info: String,
    session_start: DateTime<Local>,
    log: ConversationLog,
}

impl SessionContext {
    /// Build a context with explicit values.
    pub fn new(working_directory: impl Into<PathBuf>, system_info: impl Into<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            system_info: system_info.into(),
            session_start: Local::now(),
            log: ConversationLog::new(),
        }
    }

    /// Resolve the working directory and describe the host.
    ///
    /// # Errors
    ///
    /// Returns [`HackAssistError::WorkingDirectory`] if the directory does not
    /// exist or is not a directory.
    pub fn detect(working_directory: &Path) -> Result<Self> {
        let resolved = working_directory
            .canonicalize()
            .map_err(|_| HackAssistError::WorkingDirectory {
                path: working_directory.to_path_buf(),
            })?;

        if !resolved.is_dir() {
            return Err(HackAssistError::WorkingDirectory { path: resolved });
        }

        let info = describe_system();
        debug!("Session context: {} on {}", resolved.display(), info);
        Ok(Self::new(resolved, info))
    }

    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    #[must_use]
    pub fn system_info(&self) -> &str {
        &self.system_info
    }

    #[must_use]
    pub fn session_start(&self) -> DateTime<Local> {
        self.session_start
    }

    #[must_use]
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Record a turn.
    pub fn record(&mut self, turn: Turn) {
        self.log.append(turn);
    }

    /// Role description and environment facts sent with every request.
    #[must_use]
    pub fn system_prompt(&self, format: &dyn ResponseFormat) -> String {
        format!(
            "You are HackAssistant, an AI assistant for hackers and developers working on Linux systems.

Current context:
- Working Directory: {}
- System: {}
- Session started: {}

Your role:
1. Provide helpful responses for hacking, development, and system administration tasks
2. Suggest specific Linux terminal commands when appropriate
3. Be concise but informative
4. Focus on practical solutions

When suggesting commands:
- Provide ONE specific command that can be executed
- Explain what the command does briefly
- Consider the current working directory context
- Use Linux/bash compatible commands only

{}

Keep responses focused and actionable for a technical audience.",
            self.working_directory.display(),
            self.system_info,
            self.session_start.to_rfc3339(),
            format.instructions(),
        )
    }

    /// Full prompt for a suggestion request over the last `window` turns.
    ///
    /// The newest user input is expected to already be in the log, so it is
    /// the final history line.
    #[must_use]
    pub fn build_prompt(&self, format: &dyn ResponseFormat, window: usize) -> String {
        let history = self.log.window_for(window);
        debug!("Building prompt over {} of {} turns", history.len(), self.log.len());

        let mut prompt = self.system_prompt(format);
        prompt.push_str("\n\nConversation History:\n");
        prompt.push_str(&render_history(history));
        prompt.push_str("\nRespond in the specified format:");
        prompt
    }
}

/// Describe the host as `"<os> <kernel> (<arch>)"`.
#[must_use]
pub fn describe_system() -> String {
    let name = System::name();
    let kernel = System::kernel_version();

    match (name, kernel) {
        (Some(name), Some(kernel)) => {
            format!("{} {} ({})", name, kernel, std::env::consts::ARCH)
        }
        (Some(name), None) => format!("{} ({})", name, std::env::consts::ARCH),
        _ => UNKNOWN_SYSTEM.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MarkerFormat;
    use tempfile::TempDir;

    #[test]
    fn test_detect_resolves_directory() {
        let temp = TempDir::new().unwrap();
        let ctx = SessionContext::detect(temp.path()).unwrap();
        assert_eq!(
            ctx.working_directory(),
            temp.path().canonicalize().unwrap().as_path()
        );
        assert!(!ctx.system_info().is_empty());
        assert!(ctx.log().is_empty());
    }

    #[test]
    fn test_detect_missing_directory() {
        let err = SessionContext::detect(Path::new("/definitely/not/here/hackassist")).unwrap_err();
        assert!(matches!(err, HackAssistError::WorkingDirectory { .. }));
    }

    #[test]
    fn test_detect_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(SessionContext::detect(&file).is_err());
    }

    #[test]
    fn test_system_prompt_embeds_context() {
        let ctx = SessionContext::new("/srv/work", "Linux 6.1 (x86_64)");
        let prompt = ctx.system_prompt(&MarkerFormat::new());
        assert!(prompt.contains("/srv/work"));
        assert!(prompt.contains("Linux 6.1 (x86_64)"));
        assert!(prompt.contains("COMMAND:"));
    }

    #[test]
    fn test_build_prompt_uses_window() {
        let mut ctx = SessionContext::new("/srv/work", "Linux");
        for i in 0..15 {
            ctx.record(Turn::user(format!("request {i}")));
        }
        let prompt = ctx.build_prompt(&MarkerFormat::new(), 10);
        assert!(!prompt.contains("USER: request 4\n"));
        assert!(prompt.contains("USER: request 5\n"));
        assert!(prompt.contains("USER: request 14\n"));
        assert!(prompt.ends_with("Respond in the specified format:"));
    }
}
