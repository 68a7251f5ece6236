//! Diagnose, fix and retry a failed command.
//!
//! # State machine
//!
//! ```text
//! Executed ──ok──> Success
//!    │
//!    └─failure──> Diagnose ──nothing/advice──> NoFixFound
//!                    │
//!                    └─fix──> consent? ──no──> FixDeclined
//!                               │
//!                               └─yes──> run fix ──nonzero──> FixFailed
//!                                           │
//!                                           └─ok──> retry? ──no──> FixApplied{retried: false}
//!                                                     │
//!                                                     └─yes──> run original ──> FixApplied{retried: true}
//! ```
//!
//! At most one fix and one retry run per failed command. The retry's own
//! result is recorded but never diagnosed again.

use crate::config::RemediationConfig;
use crate::diagnostics::{
    Diagnosis, DiagnosisSource, ModelDiagnostics, PatternDiagnostics, PatternFix,
};
use crate::error::Result;
use crate::llm::LlmClient;
use crate::operator::{ask_consent, Operator};
use crate::parser::ResponseFormat;
use crate::runner::{CommandRunner, ExecutionResult};
use crate::ui;
use std::path::Path;
use tracing::{debug, info};

/// How a remediation attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// Nothing executable was found. Advisory text may still apply.
    NoFixFound { advice: Option<String> },
    /// The operator refused the fix.
    FixDeclined { fix: String },
    /// The fix ran and exited 0.
    FixApplied {
        fix: String,
        fix_result: ExecutionResult,
        retried: bool,
        retry_result: Option<ExecutionResult>,
    },
    /// The fix itself exited nonzero.
    FixFailed {
        fix: String,
        fix_result: ExecutionResult,
    },
}

impl RemediationOutcome {
    /// Whether a fix command was executed successfully.
    #[must_use]
    pub fn fix_applied(&self) -> bool {
        matches!(self, Self::FixApplied { .. })
    }
}

/// Whether the operator may be offered a retry after this fix result.
#[must_use]
pub fn retry_allowed(fix_result: &ExecutionResult) -> bool {
    fix_result.succeeded()
}

/// Collaborators the controller drives.
pub struct RemediationEnv<'a> {
    pub llm: &'a dyn LlmClient,
    pub format: &'a dyn ResponseFormat,
    pub runner: &'a dyn CommandRunner,
    pub operator: &'a mut dyn Operator,
}

/// Everything that happened to one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationReport {
    pub command: String,
    pub original: ExecutionResult,
    pub diagnosis: Option<Diagnosis>,
    pub outcome: Option<RemediationOutcome>,
}

impl RemediationReport {
    /// Report for a command that needed no remediation.
    pub fn unremediated(command: impl Into<String>, original: ExecutionResult) -> Self {
        Self {
            command: command.into(),
            original,
            diagnosis: None,
            outcome: None,
        }
    }

    /// Consolidated text with one labelled section per step.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("=== ORIGINAL COMMAND ===\n");
        out.push_str(&format!("$ {}\n{}\n", self.command, self.original.render().trim_end()));

        if let Some(diagnosis) = &self.diagnosis {
            out.push_str("\n=== DIAGNOSIS ===\n");
            match diagnosis {
                Diagnosis::Fix { command, source } => {
                    out.push_str(&format!("Fix suggested by {}: {}\n", source, command));
                }
                Diagnosis::Advisory { pattern, text } => {
                    out.push_str(&format!("Advisory ({}): {}\n", pattern, text));
                }
                Diagnosis::Unknown => out.push_str("No fix found\n"),
            }
        }

        match &self.outcome {
            Some(RemediationOutcome::FixDeclined { fix }) => {
                out.push_str(&format!("\n=== FIX ===\n$ {}\nDeclined by operator\n", fix));
            }
            Some(RemediationOutcome::FixFailed { fix, fix_result }) => {
                out.push_str(&format!(
                    "\n=== FIX ===\n$ {}\n{}\n",
                    fix,
                    fix_result.render().trim_end()
                ));
                out.push_str("\n=== RETRY ===\nNot offered: fix failed\n");
            }
            Some(RemediationOutcome::FixApplied {
                fix,
                fix_result,
                retry_result,
                ..
            }) => {
                out.push_str(&format!(
                    "\n=== FIX ===\n$ {}\n{}\n",
                    fix,
                    fix_result.render().trim_end()
                ));
                out.push_str("\n=== RETRY ===\n");
                match retry_result {
                    Some(retry) => out.push_str(&format!(
                        "$ {}\n{}\n",
                        self.command,
                        retry.render().trim_end()
                    )),
                    None => out.push_str("Declined by operator\n"),
                }
            }
            Some(RemediationOutcome::NoFixFound { .. }) | None => {}
        }

        out
    }
}

/// Runs the diagnose/fix/retry sequence for failed commands.
#[derive(Debug, Clone)]
pub struct RemediationController {
    patterns: PatternDiagnostics,
    model: Option<ModelDiagnostics>,
}

impl RemediationController {
    /// Create a controller. `model` is `None` to disable the model fallback.
    #[must_use]
    pub fn new(patterns: PatternDiagnostics, model: Option<ModelDiagnostics>) -> Self {
        Self { patterns, model }
    }

    /// Build from settings, resolving the package installer.
    #[must_use]
    pub fn from_config(config: &RemediationConfig) -> Self {
        let patterns = PatternDiagnostics::new(
            config.resolved_installer(),
            config.escalation_prefix.clone(),
        );
        let model = config
            .model_diagnostics
            .then(|| ModelDiagnostics::new(config.max_output_chars));
        Self::new(patterns, model)
    }

    /// Handle the result of an executed command.
    ///
    /// Successful commands and failures without a failure signal pass through
    /// with no diagnosis.
    ///
    /// # Errors
    ///
    /// Only operator interruption is returned as an error.
    pub async fn handle(
        &self,
        env: &mut RemediationEnv<'_>,
        cwd: &Path,
        command: &str,
        original: ExecutionResult,
    ) -> Result<RemediationReport> {
        if !original.failure_detected() {
            return Ok(RemediationReport::unremediated(command, original));
        }

        ui::failure_detected(original.exit_code);
        let diagnosis = self
            .diagnose(env.llm, env.format, command, original.failure_signal())
            .await;
        let outcome = self.apply(env, cwd, command, &diagnosis).await?;
        ui::outcome(&outcome);

        Ok(RemediationReport {
            command: command.to_string(),
            original,
            diagnosis: Some(diagnosis),
            outcome: Some(outcome),
        })
    }

    /// Pick a candidate fix: pattern table first, then the model.
    ///
    /// An advisory pattern hit counts as a recognised failure with nothing to
    /// execute: it resolves to [`RemediationOutcome::NoFixFound`] carrying the
    /// advice, and the model is not asked. The model is only consulted when no
    /// table entry matches at all.
    pub async fn diagnose(
        &self,
        llm: &dyn LlmClient,
        format: &dyn ResponseFormat,
        command: &str,
        failure_signal: &str,
    ) -> Diagnosis {
        if let Some(hit) = self.patterns.diagnose(command, failure_signal) {
            return match hit.fix {
                PatternFix::Command(fix) => Diagnosis::Fix {
                    command: fix,
                    source: DiagnosisSource::Pattern,
                },
                PatternFix::Advisory(text) => Diagnosis::Advisory {
                    pattern: hit.pattern,
                    text,
                },
            };
        }

        let Some(model) = &self.model else {
            return Diagnosis::Unknown;
        };

        match model.suggest_fix(llm, format, command, failure_signal).await {
            Some(fix) => Diagnosis::Fix {
                command: fix,
                source: DiagnosisSource::Model,
            },
            None => Diagnosis::Unknown,
        }
    }

    /// Offer, run and optionally retry for a diagnosis.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HackAssistError::Interrupted`] if the operator
    /// interrupts a consent prompt.
    pub async fn apply(
        &self,
        env: &mut RemediationEnv<'_>,
        cwd: &Path,
        command: &str,
        diagnosis: &Diagnosis,
    ) -> Result<RemediationOutcome> {
        let (fix, source) = match diagnosis {
            Diagnosis::Fix { command, source } => (command.clone(), *source),
            Diagnosis::Advisory { text, .. } => {
                ui::advisory(text);
                return Ok(RemediationOutcome::NoFixFound {
                    advice: Some(text.clone()),
                });
            }
            Diagnosis::Unknown => {
                ui::no_fix_found();
                return Ok(RemediationOutcome::NoFixFound { advice: None });
            }
        };

        ui::fix_found(&fix, source);
        if !ask_consent(env.operator, "Apply this fix?")? {
            return Ok(RemediationOutcome::FixDeclined { fix });
        }

        ui::executing(&fix);
        let fix_result = env.runner.run(&fix, cwd).await;
        ui::command_output(&fix_result);
        info!("Fix `{}` exited with {}", fix, fix_result.exit_code);

        if !retry_allowed(&fix_result) {
            return Ok(RemediationOutcome::FixFailed { fix, fix_result });
        }

        if !ask_consent(env.operator, "Retry the original command?")? {
            return Ok(RemediationOutcome::FixApplied {
                fix,
                fix_result,
                retried: false,
                retry_result: None,
            });
        }

        ui::executing(command);
        let retry_result = env.runner.run(command, cwd).await;
        ui::command_output(&retry_result);
        debug!("Retry of `{}` exited with {}", command, retry_result.exit_code);

        Ok(RemediationOutcome::FixApplied {
            fix,
            fix_result,
            retried: true,
            retry_result: Some(retry_result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HackAssistError;
    use crate::llm::MockLlmClient;
    use crate::parser::MarkerFormat;
    use crate::testing::{assert_executed_times, assert_not_executed, MockCommandRunner, ScriptedOperator};

    const CWD: &str = "/tmp";

    fn controller() -> RemediationController {
        RemediationController::new(
            PatternDiagnostics::new("sudo apt", "sudo"),
            Some(ModelDiagnostics::default()),
        )
    }

    fn denied() -> ExecutionResult {
        ExecutionResult::completed("", "cat: /etc/shadow: Permission denied", 1)
    }

    async fn run(
        controller: &RemediationController,
        llm: &MockLlmClient,
        runner: &MockCommandRunner,
        operator: &mut ScriptedOperator,
        command: &str,
        original: ExecutionResult,
    ) -> Result<RemediationReport> {
        let format = MarkerFormat::new();
        let mut env = RemediationEnv {
            llm,
            format: &format,
            runner,
            operator,
        };
        controller
            .handle(&mut env, Path::new(CWD), command, original)
            .await
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(Vec::<String>::new());
        let report = run(&controller(), &llm, &runner, &mut op, "ls", ExecutionResult::completed("a", "", 0))
            .await
            .unwrap();
        assert!(report.outcome.is_none());
        assert!(report.diagnosis.is_none());
        assert_eq!(runner.call_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_nonzero_without_signal_is_not_remediated() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(Vec::<String>::new());
        let report = run(&controller(), &llm, &runner, &mut op, "grep x f", ExecutionResult::completed("", "", 1))
            .await
            .unwrap();
        assert!(report.outcome.is_none());
        assert!(op.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_fix_succeeds_retry_declined() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new()
            .with_result("sudo cat /etc/shadow", ExecutionResult::completed("root:x", "", 0));
        let mut op = ScriptedOperator::new(["y", "n"]);

        let report = run(&controller(), &llm, &runner, &mut op, "cat /etc/shadow", denied())
            .await
            .unwrap();

        match report.outcome.unwrap() {
            RemediationOutcome::FixApplied {
                fix,
                retried,
                retry_result,
                ..
            } => {
                assert_eq!(fix, "sudo cat /etc/shadow");
                assert!(!retried);
                assert!(retry_result.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // the failing original is never re-run
        assert_not_executed(&runner, "cat /etc/shadow");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fix_succeeds_retry_accepted() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new()
            .with_result("sudo apt install foo-cli", ExecutionResult::completed("installed", "", 0))
            .with_result("foo-cli status", ExecutionResult::completed("", "foo-cli: crashed", 3));
        let mut op = ScriptedOperator::new(["y", "y"]);

        let report = run(
            &controller(),
            &llm,
            &runner,
            &mut op,
            "foo-cli status",
            ExecutionResult::completed("", "bash: foo-cli: command not found", 127),
        )
        .await
        .unwrap();

        let outcome = report.outcome.clone().unwrap();
        let RemediationOutcome::FixApplied {
            retried: true,
            retry_result: Some(retry),
            ..
        } = &outcome
        else {
            panic!("expected a retried fix, got {:?}", outcome);
        };
        // retry failed again but is not remediated further
        assert_eq!(retry.exit_code, 3);
        assert_executed_times(&runner, "sudo apt install foo-cli", 1);
        assert_executed_times(&runner, "foo-cli status", 1);
        assert_eq!(runner.call_count(), 2);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(op.remaining(), 0);

        let text = report.render();
        assert!(text.contains("=== ORIGINAL COMMAND ==="));
        assert!(text.contains("Fix suggested by pattern match: sudo apt install foo-cli"));
        assert!(text.contains("=== RETRY ===\n$ foo-cli status"));
    }

    #[tokio::test]
    async fn test_failed_fix_offers_no_retry() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new().with_result(
            "sudo cat /etc/shadow",
            ExecutionResult::completed("", "sudo: a password is required", 1),
        );
        let mut op = ScriptedOperator::new(["y", "y"]);

        let report = run(&controller(), &llm, &runner, &mut op, "cat /etc/shadow", denied())
            .await
            .unwrap();

        assert!(matches!(report.outcome, Some(RemediationOutcome::FixFailed { .. })));
        // only the fix consent was asked
        assert_eq!(op.prompts().len(), 1);
        assert_eq!(op.remaining(), 1);
        assert_eq!(runner.call_count(), 1);
        assert!(report.render().contains("Not offered: fix failed"));
    }

    #[tokio::test]
    async fn test_fix_declined_runs_nothing() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(["n"]);
        let report = run(&controller(), &llm, &runner, &mut op, "cat /etc/shadow", denied())
            .await
            .unwrap();
        assert_eq!(
            report.outcome,
            Some(RemediationOutcome::FixDeclined {
                fix: "sudo cat /etc/shadow".into()
            })
        );
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_fallback_when_no_pattern() {
        let llm = MockLlmClient::new()
            .with_response("EXPLANATION: needs a build dir\nCOMMAND: mkdir -p build");
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(["y", "n"]);

        let report = run(
            &controller(),
            &llm,
            &runner,
            &mut op,
            "cmake ..",
            ExecutionResult::completed("", "CMake Error: weird", 1),
        )
        .await
        .unwrap();

        assert_eq!(
            report.diagnosis,
            Some(Diagnosis::Fix {
                command: "mkdir -p build".into(),
                source: DiagnosisSource::Model
            })
        );
        assert!(report.outcome.unwrap().fix_applied());
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_fault_is_no_fix() {
        let llm = MockLlmClient::new().with_error("503");
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(Vec::<String>::new());
        let report = run(
            &controller(),
            &llm,
            &runner,
            &mut op,
            "make",
            ExecutionResult::completed("", "Segmentation fault", 139),
        )
        .await
        .unwrap();
        assert_eq!(report.outcome, Some(RemediationOutcome::NoFixFound { advice: None }));
        assert_eq!(runner.call_count(), 0);
        assert!(report.render().contains("No fix found"));
    }

    #[tokio::test]
    async fn test_advisory_is_shown_not_executed() {
        let llm = MockLlmClient::new().with_response("COMMAND: systemctl start thing");
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(Vec::<String>::new());
        let report = run(
            &controller(),
            &llm,
            &runner,
            &mut op,
            "curl localhost:8080",
            ExecutionResult::completed("", "curl: (7) Connection refused", 7),
        )
        .await
        .unwrap();

        assert!(matches!(
            report.outcome,
            Some(RemediationOutcome::NoFixFound { advice: Some(_) })
        ));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(runner.call_count(), 0);
        assert!(op.prompts().is_empty());
        assert!(report.render().contains("Advisory (connection refused)"));
    }

    #[tokio::test]
    async fn test_model_disabled() {
        let controller = RemediationController::new(PatternDiagnostics::new("sudo apt", "sudo"), None);
        let llm = MockLlmClient::new().with_response("COMMAND: ls");
        let diagnosis = controller
            .diagnose(&llm, &MarkerFormat::new(), "make", "strange failure")
            .await;
        assert_eq!(diagnosis, Diagnosis::Unknown);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_consent_reprompts() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(["sure", "y", "n"]);
        let report = run(&controller(), &llm, &runner, &mut op, "cat /etc/shadow", denied())
            .await
            .unwrap();
        assert!(report.outcome.unwrap().fix_applied());
        assert_eq!(op.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_interrupt_at_consent_propagates() {
        let llm = MockLlmClient::new();
        let runner = MockCommandRunner::new();
        let mut op = ScriptedOperator::new(Vec::<String>::new()).then_interrupt();
        let err = run(&controller(), &llm, &runner, &mut op, "cat /etc/shadow", denied())
            .await
            .unwrap_err();
        assert!(matches!(err, HackAssistError::Interrupted));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_retry_allowed_only_after_success() {
        assert!(retry_allowed(&ExecutionResult::completed("", "", 0)));
        assert!(!retry_allowed(&ExecutionResult::completed("", "x", 1)));
        assert!(!retry_allowed(&ExecutionResult::spawn_failure("no shell")));
    }

    #[test]
    fn test_render_unremediated() {
        let report = RemediationReport::unremediated("ls", ExecutionResult::completed("a.txt\n", "", 0));
        let text = report.render();
        assert!(text.starts_with("=== ORIGINAL COMMAND ===\n$ ls\nSTDOUT:\na.txt"));
        assert!(!text.contains("DIAGNOSIS"));
    }
}
