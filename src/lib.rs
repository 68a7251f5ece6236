//! HackAssist - Terminal Assistant for Hackers and Developers
//!
//! An interactive assistant that turns natural-language requests into
//! single Linux shell commands, runs them only with the operator's consent,
//! and diagnoses failures with a bounded fix-and-retry sequence.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`conversation`] - Append-only turn log with bounded history windows
//! - [`context`] - Session facts and prompt construction
//! - [`parser`] - Splitting model replies into explanation and command
//! - [`runner`] - Shell execution and failure detection
//! - [`diagnostics`] - Pattern table and model-based failure diagnosis
//! - [`remediation`] - The diagnose/fix/retry state machine
//! - [`session`] - The interactive turn loop
//! - [`llm`] - Model backends (Gemini, offline)
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (mocks, assertions)
//!
//! # Example
//!
//! ```rust,ignore
//! use hackassist::config::AssistantConfig;
//! use hackassist::context::SessionContext;
//! use hackassist::llm::create_llm_client;
//! use hackassist::operator::TerminalOperator;
//! use hackassist::runner::ShellRunner;
//! use hackassist::session::SessionLoop;
//!
//! let workdir = std::env::current_dir()?;
//! let config = AssistantConfig::load(None, &workdir)?;
//! let ctx = SessionContext::detect(&workdir)?;
//! let llm = create_llm_client(&config.llm)?;
//!
//! let mut session = SessionLoop::new(
//!     ctx,
//!     llm,
//!     Box::new(ShellRunner::new(&config.shell)),
//!     Box::new(TerminalOperator::new()?),
//!     &config,
//! );
//! session.run().await?;
//! ```

pub mod config;
pub mod context;
pub mod conversation;
pub mod diagnostics;
pub mod error;
pub mod llm;
pub mod operator;
pub mod parser;
pub mod remediation;
pub mod runner;
pub mod session;
pub mod testing;
pub mod ui;

// Re-export commonly used types
pub use error::{HackAssistError, Result};

pub use config::{AssistantConfig, RemediationConfig, SessionConfig};
pub use context::SessionContext;
pub use conversation::{ConversationLog, Role, Turn};
pub use parser::{MarkerFormat, ParsedSuggestion, ResponseFormat};
pub use runner::{CommandRunner, ExecutionResult, ShellRunner};

pub use diagnostics::{Diagnosis, DiagnosisSource, ModelDiagnostics, PatternDiagnostics};
pub use remediation::{RemediationController, RemediationOutcome, RemediationReport};
pub use session::{SessionLoop, SessionStats};

pub use llm::{create_llm_client, LlmClient, LlmConfig, MockLlmClient, OfflineClient};
pub use operator::{Operator, OperatorInput, TerminalOperator};
