//! Mock implementations of the session's collaborator traits.
//!
//! These mocks provide controllable test doubles for the shell and the
//! operator, enabling deterministic tests of the session loop and the
//! remediation state machine.

use crate::error::Result;
use crate::operator::{Operator, OperatorInput};
use crate::runner::{CommandRunner, ExecutionResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Mock shell runner.
///
/// Results are scripted per command line. When a command has several
/// scripted results they are returned in order and the last one repeats.
/// Unscripted commands succeed with no output.
///
/// # Example
///
/// ```rust,ignore
/// let runner = MockCommandRunner::new()
///     .with_result("make", ExecutionResult::completed("", "make: *** error", 2))
///     .with_result("make", ExecutionResult::completed("built", "", 0));
///
/// // first call fails, the retry succeeds
/// ```
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    scripted: Mutex<HashMap<String, VecDeque<ExecutionResult>>>,
    default_result: Option<ExecutionResult>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl MockCommandRunner {
    /// Create a new mock with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next result for `command`.
    #[must_use]
    pub fn with_result(mut self, command: &str, result: ExecutionResult) -> Self {
        if let Ok(scripted) = self.scripted.get_mut() {
            scripted
                .entry(command.to_string())
                .or_default()
                .push_back(result);
        }
        self
    }

    /// Result for commands with no script.
    #[must_use]
    pub fn with_default_result(mut self, result: ExecutionResult) -> Self {
        self.default_result = Some(result);
        self
    }

    /// Command lines run so far, oldest first.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(cmd, _)| cmd.clone()).collect())
            .unwrap_or_default()
    }

    /// Working directories used so far, oldest first.
    pub fn directories(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(_, dir)| dir.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of times `run` was called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    /// Number of times `command` was run.
    pub fn count_for(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == command).count()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, command: &str, cwd: &Path) -> ExecutionResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command.to_string(), cwd.to_path_buf()));
        }

        let scripted = self.scripted.lock().ok().and_then(|mut scripted| {
            let queue = scripted.get_mut(command)?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });

        scripted
            .or_else(|| self.default_result.clone())
            .unwrap_or_else(|| ExecutionResult::completed("", "", 0))
    }
}

/// Operator that answers from a fixed script.
///
/// Once the script runs out every read reports closed input, which ends the
/// session the same way Ctrl-D does.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    script: VecDeque<OperatorInput>,
    prompts: Vec<String>,
}

impl ScriptedOperator {
    /// Operator that types each of `lines` in order.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines
                .into_iter()
                .map(|line| OperatorInput::Line(line.into()))
                .collect(),
            prompts: Vec::new(),
        }
    }

    /// Append a Ctrl-C after the scripted lines.
    #[must_use]
    pub fn then_interrupt(mut self) -> Self {
        self.script.push_back(OperatorInput::Interrupted);
        self
    }

    /// Prompts shown so far.
    #[must_use]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Scripted inputs not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Operator for ScriptedOperator {
    fn read_line(&mut self, prompt: &str) -> Result<OperatorInput> {
        self.prompts.push(prompt.to_string());
        Ok(self.script.pop_front().unwrap_or(OperatorInput::Closed))
    }
}
