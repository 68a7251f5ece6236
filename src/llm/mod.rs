//! Language-model client abstraction.
//!
//! The session only needs one operation from a model: send a text prompt,
//! get text back. [`LlmClient`] captures that so the loop can run against
//! Gemini, the [`OfflineClient`] when no key is available, and
//! [`MockLlmClient`] in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use hackassist::llm::{create_llm_client, LlmConfig};
//!
//! let client = create_llm_client(&LlmConfig::default())?;
//! let reply = client.run_prompt("How do I list open ports?").await?;
//! ```

pub mod gemini;
pub mod offline;

pub use gemini::{GeminiApiError, GeminiClient};
pub use offline::{OfflineClient, OFFLINE_REPLY};

use crate::error::{HackAssistError, Result as HackResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Providers understood by [`create_llm_client`].
pub const VALID_PROVIDERS: &[&str] = &["gemini", "offline"];

/// Abstraction for LLM client operations.
///
/// Object-safe so the session can hold a `Box<dyn LlmClient>` chosen at
/// runtime from configuration.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a prompt and return the model's response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model API is unreachable
    /// - Authentication fails
    /// - The request times out
    /// - The response cannot be parsed
    async fn run_prompt(&self, prompt: &str) -> Result<String>;

    /// Get the name of the model being used.
    fn model_name(&self) -> &str;
}

/// Mock LLM client for testing.
///
/// Replies come from a queue first, then from a fixed fallback response.
/// Every prompt is recorded so tests can inspect what was sent.
///
/// # Example
///
/// ```rust,ignore
/// use hackassist::llm::MockLlmClient;
///
/// let client = MockLlmClient::new()
///     .with_response("EXPLANATION: hi\nCOMMAND: NONE")
///     .with_queued_response("EXPLANATION: first\nCOMMAND: ls");
/// ```
#[derive(Debug)]
pub struct MockLlmClient {
    /// Fallback response once the queue is empty.
    response: String,
    /// Responses returned in order before the fallback.
    queued: Mutex<VecDeque<String>>,
    /// Error to return on every call (if set).
    error: Option<String>,
    /// Model name to return.
    model: String,
    /// Count of prompt calls.
    call_count: AtomicU32,
    /// Number of calls to fail before succeeding.
    fail_count: AtomicU32,
    /// Error message for fail_count failures.
    fail_error: Option<String>,
    /// Prompts received, oldest first.
    prompts: Mutex<Vec<String>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            response: String::new(),
            queued: Mutex::new(VecDeque::new()),
            error: None,
            model: "mock-llm".to_string(),
            call_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(0),
            fail_error: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlmClient {
    /// Create a new mock client with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback response.
    #[must_use]
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Queue a response to be returned before the fallback.
    #[must_use]
    pub fn with_queued_response(mut self, response: &str) -> Self {
        if let Ok(queue) = self.queued.get_mut() {
            queue.push_back(response.to_string());
        }
        self
    }

    /// Configure the mock to return an error.
    #[must_use]
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model_name(mut self, name: &str) -> Self {
        self.model = name.to_string();
        self
    }

    /// Configure the mock to fail the first N calls, then succeed.
    #[must_use]
    pub fn with_fail_count(mut self, count: u32, error: &str) -> Self {
        self.fail_count = AtomicU32::new(count);
        self.fail_error = Some(error.to_string());
        self
    }

    /// Get the number of times `run_prompt` was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn run_prompt(&self, prompt: &str) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        // Check fail_count first
        let current_fail_count = self.fail_count.load(Ordering::SeqCst);
        if current_fail_count > 0 {
            self.fail_count.fetch_sub(1, Ordering::SeqCst);
            if let Some(ref fail_error) = self.fail_error {
                anyhow::bail!("{}", fail_error)
            } else {
                anyhow::bail!("Mock failure")
            }
        }

        // Check permanent error
        if let Some(ref error) = self.error {
            anyhow::bail!("{}", error)
        }

        let queued = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        Ok(queued.unwrap_or_else(|| self.response.clone()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Configuration for the model backend.
///
/// Loaded from the `llm` section of the settings file; CLI flags may
/// override `provider` and `model`.
///
/// # Example settings.json
///
/// ```json
/// {
///   "llm": {
///     "provider": "gemini",
///     "model": "gemini-2.0-flash-exp",
///     "api_key_env": "GEMINI_API_KEY"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend: "gemini" or "offline".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier passed to the backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Override for the API base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Validate the LLM configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unknown, the model is empty or the
    /// timeout is zero.
    pub fn validate(&self) -> HackResult<()> {
        if !VALID_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(HackAssistError::invalid_config(
                "llm.provider",
                format!(
                    "'{}' is not supported. Valid options: {}",
                    self.provider,
                    VALID_PROVIDERS.join(", ")
                ),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(HackAssistError::invalid_config("llm.model", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(HackAssistError::invalid_config(
                "llm.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Create an LLM client based on configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or, for Gemini, the API
/// key variable is not set.
pub fn create_llm_client(config: &LlmConfig) -> HackResult<Box<dyn LlmClient>> {
    config.validate()?;

    match config.provider.as_str() {
        "gemini" => {
            let api_key = std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| HackAssistError::MissingCredential {
                    env_var: config.api_key_env.clone(),
                })?;
            let client = GeminiClient::new(&config.model, api_key, config.base_url.as_deref())
                .with_timeout(config.timeout_secs)
                .build()?;
            Ok(Box::new(client))
        }
        "offline" => Ok(Box::new(OfflineClient::new())),
        other => Err(HackAssistError::invalid_config(
            "llm.provider",
            format!("'{}' is not supported", other),
        )),
    }
}
