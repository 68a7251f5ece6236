//! Testing infrastructure for HackAssist.
//!
//! Mocks for the shell and the operator, plus assertions over the
//! conversation log. The model mock lives next to its trait in
//! [`crate::llm`].
//!
//! # Example
//!
//! ```rust,ignore
//! use hackassist::testing::{MockCommandRunner, ScriptedOperator};
//! use hackassist::runner::ExecutionResult;
//!
//! let runner = MockCommandRunner::new()
//!     .with_result("ls", ExecutionResult::completed("a.txt", "", 0));
//! let operator = ScriptedOperator::new(["list files", "y", "c"]);
//! ```

pub mod assertions;
pub mod mocks;

// Re-export commonly used types
pub use assertions::*;
pub use mocks::*;
