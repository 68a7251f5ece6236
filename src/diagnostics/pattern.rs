//! Offline, deterministic failure classifier.
//!
//! Maps well-known failure text to a canned fix. The table is walked
//! top-down and the first matching entry that can produce a fix wins, so
//! specific entries sit above generic ones ("memory" is near the bottom).
//! Matching is a case-insensitive substring test on the failure signal.

use tracing::debug;

/// Pattern that triggers the package-install fix.
pub const COMMAND_NOT_FOUND: &str = "command not found";

/// What a matching table entry resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternFix {
    /// An executable corrective command.
    Command(String),
    /// Guidance for the operator; never executed.
    Advisory(String),
}

/// A table hit: which pattern matched and what it suggests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub pattern: &'static str,
    pub fix: PatternFix,
}

#[derive(Debug, Clone, Copy)]
enum FixTemplate {
    /// Re-run the original command with the escalation prefix.
    Escalate,
    /// List the working directory, then re-run the original command.
    ListThenRetry,
    /// Run a fixed inspection command.
    Inspect(&'static str),
    /// Show text only.
    Advise(&'static str),
}

/// Ordered after the special-cased "command not found" entry.
const PATTERN_TABLE: &[(&str, FixTemplate)] = &[
    ("permission denied", FixTemplate::Escalate),
    ("access denied", FixTemplate::Escalate),
    ("no such file or directory", FixTemplate::ListThenRetry),
    (
        "connection refused",
        FixTemplate::Advise(
            "The target service refused the connection. Check that it is running and listening on the expected host and port.",
        ),
    ),
    ("network unreachable", FixTemplate::Inspect("ping -c 3 8.8.8.8")),
    ("port already in use", FixTemplate::Inspect("ss -tulpn")),
    ("disk space", FixTemplate::Inspect("df -h")),
    ("memory", FixTemplate::Inspect("free -h")),
    (
        "authentication failed",
        FixTemplate::Advise(
            "Authentication failed. Verify the credentials, keys or tokens used by this command.",
        ),
    ),
];

/// Pattern-based diagnostics with the host-specific fix prefixes.
#[derive(Debug, Clone)]
pub struct PatternDiagnostics {
    installer: String,
    escalation_prefix: String,
}

impl PatternDiagnostics {
    /// Create a classifier.
    ///
    /// * `installer` - prefix for install fixes, e.g. `"sudo apt"`
    /// * `escalation_prefix` - prefix for privileged re-runs, e.g. `"sudo"`
    pub fn new(installer: impl Into<String>, escalation_prefix: impl Into<String>) -> Self {
        Self {
            installer: installer.into(),
            escalation_prefix: escalation_prefix.into(),
        }
    }

    /// Executable fix for a failure, if any pattern yields one.
    ///
    /// Advisory entries count as "no command" here.
    #[must_use]
    pub fn classify(&self, command: &str, failure_signal: &str) -> Option<String> {
        match self.diagnose(command, failure_signal)?.fix {
            PatternFix::Command(fix) => Some(fix),
            PatternFix::Advisory(_) => None,
        }
    }

    /// Full table lookup, including advisory entries.
    #[must_use]
    pub fn diagnose(&self, command: &str, failure_signal: &str) -> Option<PatternMatch> {
        let signal = failure_signal.to_lowercase();

        if signal.contains(COMMAND_NOT_FOUND) {
            if let Some(token) = command.split_whitespace().next() {
                debug!("Pattern '{}' matched, package '{}'", COMMAND_NOT_FOUND, token);
                return Some(PatternMatch {
                    pattern: COMMAND_NOT_FOUND,
                    fix: PatternFix::Command(format!("{} install {}", self.installer, token)),
                });
            }
        }

        for (pattern, template) in PATTERN_TABLE {
            if !signal.contains(pattern) {
                continue;
            }
            if let Some(fix) = self.render(*template, command) {
                debug!("Pattern '{}' matched", pattern);
                return Some(PatternMatch {
                    pattern: *pattern,
                    fix,
                });
            }
        }

        None
    }

    fn render(&self, template: FixTemplate, command: &str) -> Option<PatternFix> {
        let command = command.trim();
        match template {
            FixTemplate::Escalate => {
                if self.is_escalated(command) {
                    None
                } else {
                    Some(PatternFix::Command(format!(
                        "{} {}",
                        self.escalation_prefix, command
                    )))
                }
            }
            FixTemplate::ListThenRetry => {
                Some(PatternFix::Command(format!("ls -la && {}", command)))
            }
            FixTemplate::Inspect(probe) => Some(PatternFix::Command(probe.to_string())),
            FixTemplate::Advise(text) => Some(PatternFix::Advisory(text.to_string())),
        }
    }

    fn is_escalated(&self, command: &str) -> bool {
        command.split_whitespace().next() == Some(self.escalation_prefix.as_str())
    }
}
