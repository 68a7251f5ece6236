//! Configuration management for HackAssist.
//!
//! Settings live in a JSON file. Every field has a default, so an absent
//! file, or one that sets a single key, is always valid input.
//!
//! Lookup order:
//! 1. An explicit `--config` path (must exist)
//! 2. `<workdir>/.hackassist/settings.json`
//! 3. `<config_dir>/hackassist/settings.json`
//! 4. Built-in defaults

use crate::error::{HackAssistError, Result};
use crate::llm::LlmConfig;
use crate::runner::DEFAULT_SHELL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Installers probed by `"auto"`, paired with the prefix used to call them.
pub const KNOWN_INSTALLERS: &[(&str, &str)] = &[
    ("apt", "sudo apt"),
    ("dnf", "sudo dnf"),
    ("yum", "sudo yum"),
    ("zypper", "sudo zypper"),
    ("brew", "brew"),
];

/// Used when `"auto"` finds nothing.
pub const FALLBACK_INSTALLER: &str = "sudo apt";

/// Session window and display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turns of history sent with a normal suggestion request.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Turns of history sent right after a remediation, where the model
    /// needs to see the executed commands next to their output.
    #[serde(default = "default_remediation_context_window")]
    pub remediation_context_window: usize,

    /// Print the startup banner.
    #[serde(default = "default_true")]
    pub show_banner: bool,
}

fn default_context_window() -> usize {
    10
}

fn default_remediation_context_window() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            remediation_context_window: default_remediation_context_window(),
            show_banner: true,
        }
    }
}

/// Failure diagnosis and fix settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationConfig {
    /// Run diagnosis when a command fails.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Ask the model for a fix when no pattern matches.
    #[serde(default = "default_true")]
    pub model_diagnostics: bool,

    /// Installer prefix for "command not found" fixes, or `"auto"`.
    #[serde(default = "default_package_installer")]
    pub package_installer: String,

    /// Prefix used to re-run a command with elevated privileges.
    #[serde(default = "default_escalation_prefix")]
    pub escalation_prefix: String,

    /// Cap on failure output sent to the model.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

fn default_package_installer() -> String {
    "auto".to_string()
}

fn default_escalation_prefix() -> String {
    "sudo".to_string()
}

fn default_max_output_chars() -> usize {
    4000
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_diagnostics: true,
            package_installer: default_package_installer(),
            escalation_prefix: default_escalation_prefix(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

impl RemediationConfig {
    /// The installer prefix to use, resolving `"auto"` against `PATH`.
    #[must_use]
    pub fn resolved_installer(&self) -> String {
        if self.package_installer.eq_ignore_ascii_case("auto") {
            detect_package_installer()
        } else {
            self.package_installer.clone()
        }
    }
}

/// Pick the first known package manager found on `PATH`.
#[must_use]
pub fn detect_package_installer() -> String {
    KNOWN_INSTALLERS
        .iter()
        .find(|(binary, _)| which::which(binary).is_ok())
        .map(|(_, prefix)| (*prefix).to_string())
        .unwrap_or_else(|| FALLBACK_INSTALLER.to_string())
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub remediation: RemediationConfig,

    /// Interpreter used to run commands.
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            session: SessionConfig::default(),
            remediation: RemediationConfig::default(),
            shell: default_shell(),
        }
    }
}

impl AssistantConfig {
    /// Load settings following the lookup order in the module docs.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, or if the chosen file
    /// cannot be read or parsed.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(HackAssistError::config_with_path(
                    "config file does not exist",
                    path.to_path_buf(),
                ));
            }
            return Self::load_file(path);
        }

        let candidates = [Some(Self::settings_path(working_dir)), Self::user_settings_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        debug!("No settings file found, using defaults");
        Ok(Self::default())
    }

    /// Parse one settings file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error carrying the path on IO or JSON failure.
    pub fn load_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| HackAssistError::config_with_path(e.to_string(), path.to_path_buf()))?;
        serde_json::from_str(&content)
            .map_err(|e| HackAssistError::config_with_path(e.to_string(), path.to_path_buf()))
    }

    /// Project-local settings path.
    pub fn settings_path(working_dir: &Path) -> PathBuf {
        working_dir.join(".hackassist/settings.json")
    }

    /// Per-user settings path.
    pub fn user_settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hackassist").join("settings.json"))
    }

    /// Validate values that defaults cannot guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`HackAssistError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;

        if self.session.context_window == 0 {
            return Err(HackAssistError::invalid_config(
                "session.context_window",
                "must be greater than zero",
            ));
        }
        if self.session.remediation_context_window < self.session.context_window {
            return Err(HackAssistError::invalid_config(
                "session.remediation_context_window",
                "must not be smaller than session.context_window",
            ));
        }
        if self.shell.trim().is_empty() {
            return Err(HackAssistError::invalid_config("shell", "must not be empty"));
        }
        if self.remediation.escalation_prefix.trim().is_empty() {
            return Err(HackAssistError::invalid_config(
                "remediation.escalation_prefix",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.session.context_window, 10);
        assert_eq!(config.session.remediation_context_window, 20);
        assert_eq!(config.remediation.escalation_prefix, "sudo");
        assert_eq!(config.shell, "/bin/sh");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: AssistantConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.llm.model, "gemini-2.0-flash-exp");
        assert!(config.remediation.enabled);
        assert!(config.session.show_banner);
    }

    #[test]
    fn test_load_project_settings() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".hackassist")).unwrap();
        std::fs::write(
            temp.path().join(".hackassist/settings.json"),
            r#"{"session": {"context_window": 4}, "remediation": {"package_installer": "sudo dnf"}}"#,
        )
        .unwrap();

        let config = AssistantConfig::load(None, temp.path()).unwrap();
        assert_eq!(config.session.context_window, 4);
        assert_eq!(config.session.remediation_context_window, 20);
        assert_eq!(config.remediation.resolved_installer(), "sudo dnf");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.json");
        let err = AssistantConfig::load(Some(&missing), temp.path()).unwrap_err();
        assert!(matches!(err, HackAssistError::Config { path: Some(_), .. }));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = AssistantConfig::load(Some(&path), temp.path()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_windows() {
        let mut config = AssistantConfig::default();
        config.session.context_window = 0;
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.session.remediation_context_window = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("remediation_context_window"));
    }

    #[test]
    fn test_validate_shell() {
        let config = AssistantConfig {
            shell: "  ".to_string(),
            ..AssistantConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auto_installer_resolves_to_something() {
        let installer = RemediationConfig::default().resolved_installer();
        assert!(
            installer == FALLBACK_INSTALLER
                || KNOWN_INSTALLERS.iter().any(|(_, prefix)| *prefix == installer)
        );
    }
}
