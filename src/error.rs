//! Custom error types for HackAssist.
//!
//! Command failures (nonzero exit codes) are not errors here: they are
//! ordinary [`ExecutionResult`](crate::runner::ExecutionResult) values that
//! feed remediation. A shell that cannot be started is carried the same way,
//! via [`ExecutionResult::spawn_failure`](crate::runner::ExecutionResult::spawn_failure).
//! This enum covers the remaining tool-level faults.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for HackAssist operations
#[derive(Error, Debug)]
pub enum HackAssistError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Required API credential is not set
    #[error("{env_var} environment variable not set! Export your API key: export {env_var}='your_api_key_here'")]
    MissingCredential { env_var: String },

    /// Working directory does not exist or cannot be resolved
    #[error("Working directory is not usable: {path}")]
    WorkingDirectory { path: PathBuf },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// The model service could not be reached or returned garbage
    #[error("Model request failed: {message}")]
    Model { message: String },

    // =========================================================================
    // Operator Errors
    // =========================================================================
    /// Operator interrupted an input prompt (Ctrl-C / EOF)
    #[error("Session interrupted by operator")]
    Interrupted,

    /// Terminal input could not be read
    #[error("Failed to read operator input: {message}")]
    Input { message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HackAssistError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a model collaborator error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if the session loop can report this error and carry on
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Interrupted
                | Self::Input { .. }
                | Self::MissingCredential { .. }
                | Self::Config { .. }
                | Self::InvalidConfig { .. }
                | Self::WorkingDirectory { .. }
        )
    }

    /// Check if this error ends the process before the loop starts
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::Config { .. }
                | Self::InvalidConfig { .. }
                | Self::WorkingDirectory { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => 0,
            Self::WorkingDirectory { .. } => 6,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::MissingCredential { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for HackAssist results
pub type Result<T> = std::result::Result<T, HackAssistError>;
