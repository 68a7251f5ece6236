//! Failure diagnosis.
//!
//! Two classifiers feed remediation: [`PatternDiagnostics`] (offline, instant)
//! and [`ModelDiagnostics`] (a model request, used only when the pattern
//! table finds nothing).

pub mod model;
pub mod pattern;

pub use model::ModelDiagnostics;
pub use pattern::{PatternDiagnostics, PatternFix, PatternMatch};

use std::fmt;

/// Which classifier produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisSource {
    Pattern,
    Model,
}

impl fmt::Display for DiagnosisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => f.write_str("pattern match"),
            Self::Model => f.write_str("model analysis"),
        }
    }
}

/// Result of diagnosing one failed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    /// A corrective command to offer the operator.
    Fix {
        command: String,
        source: DiagnosisSource,
    },
    /// Guidance text only; nothing to execute.
    Advisory { pattern: &'static str, text: String },
    /// Neither classifier had anything.
    Unknown,
}

impl Diagnosis {
    /// The executable fix, if there is one.
    #[must_use]
    pub fn fix_command(&self) -> Option<&str> {
        match self {
            Self::Fix { command, .. } => Some(command),
            _ => None,
        }
    }
}
