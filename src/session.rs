//! The interactive turn loop.
//!
//! One turn is: read input, ask the model, show the suggestion, ask for
//! consent, run, remediate on failure, log everything. Turns never overlap.

use crate::config::{AssistantConfig, SessionConfig};
use crate::context::SessionContext;
use crate::conversation::Turn;
use crate::error::{HackAssistError, Result};
use crate::llm::LlmClient;
use crate::operator::{ask_consent, Operator, OperatorInput};
use crate::parser::{MarkerFormat, ParsedSuggestion, ResponseFormat};
use crate::remediation::{
    RemediationController, RemediationEnv, RemediationOutcome, RemediationReport,
};
use crate::runner::CommandRunner;
use crate::ui;
use tracing::{debug, info, warn};

/// Closes the session.
pub const CLOSE_TOKEN: &str = "c";

/// New-prompt hint; has no effect on state.
pub const NEW_PROMPT_TOKEN: &str = "p";

/// What the loop does after a line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    Close,
}

/// Counters printed when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub commands_executed: usize,
    pub fixes_applied: usize,
}

/// Owns the context and collaborators for one interactive session.
pub struct SessionLoop {
    ctx: SessionContext,
    llm: Box<dyn LlmClient>,
    runner: Box<dyn CommandRunner>,
    operator: Box<dyn Operator>,
    format: MarkerFormat,
    remediation: Option<RemediationController>,
    settings: SessionConfig,
    stats: SessionStats,
    /// Set after a turn that went through remediation.
    widen_window: bool,
}

impl SessionLoop {
    pub fn new(
        ctx: SessionContext,
        llm: Box<dyn LlmClient>,
        runner: Box<dyn CommandRunner>,
        operator: Box<dyn Operator>,
        config: &AssistantConfig,
    ) -> Self {
        let remediation = config
            .remediation
            .enabled
            .then(|| RemediationController::from_config(&config.remediation));

        Self {
            ctx,
            llm,
            runner,
            operator,
            format: MarkerFormat::new(),
            remediation,
            settings: config.session.clone(),
            stats: SessionStats::default(),
            widen_window: false,
        }
    }

    /// Replace the remediation controller (`None` disables remediation).
    #[must_use]
    pub fn with_remediation(mut self, remediation: Option<RemediationController>) -> Self {
        self.remediation = remediation;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run turns until the operator closes the session.
    ///
    /// Recoverable faults inside a turn are reported and the loop carries on.
    ///
    /// # Errors
    ///
    /// Returns an error only if the terminal itself cannot be read.
    pub async fn run(&mut self) -> Result<SessionStats> {
        info!("Session started in {}", self.ctx.working_directory().display());

        loop {
            let line = match self.operator.read_line(ui::INPUT_PROMPT)? {
                OperatorInput::Line(line) => line,
                OperatorInput::Interrupted | OperatorInput::Closed => break,
            };

            match self.handle_line(&line).await {
                Ok(TurnOutcome::Continue) => {}
                Ok(TurnOutcome::Close) => break,
                Err(HackAssistError::Interrupted) => break,
                Err(e) if e.is_recoverable() => {
                    warn!("Turn failed: {}", e);
                    ui::unexpected_error(&e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        ui::goodbye();
        ui::summary(
            self.ctx.log().len(),
            self.stats.commands_executed,
            self.stats.fixes_applied,
        );
        info!(
            turns = self.ctx.log().len(),
            commands = self.stats.commands_executed,
            fixes = self.stats.fixes_applied,
            "Session closed"
        );
        Ok(self.stats)
    }

    /// Process one line of operator input.
    ///
    /// # Errors
    ///
    /// Returns [`HackAssistError::Interrupted`] if the operator interrupts a
    /// consent prompt.
    pub async fn handle_line(&mut self, line: &str) -> Result<TurnOutcome> {
        let input = line.trim();
        if input.is_empty() {
            return Ok(TurnOutcome::Continue);
        }
        if input.eq_ignore_ascii_case(CLOSE_TOKEN) {
            return Ok(TurnOutcome::Close);
        }
        if input.eq_ignore_ascii_case(NEW_PROMPT_TOKEN) {
            ui::prompt_mode();
            return Ok(TurnOutcome::Continue);
        }

        self.ctx.record(Turn::user(input));
        let suggestion = self.suggest().await;

        ui::explanation(&suggestion.explanation);
        self.ctx.record(Turn::assistant(suggestion.explanation.clone()));

        match suggestion.command {
            Some(command) => {
                ui::suggested_command(&command);
                self.offer(&command).await?;
                ui::continue_hint();
            }
            None => ui::next_prompt_hint(),
        }

        Ok(TurnOutcome::Continue)
    }

    /// Ask the model about the latest input. Faults become an explanation.
    async fn suggest(&mut self) -> ParsedSuggestion {
        let window = if std::mem::take(&mut self.widen_window) {
            self.settings.remediation_context_window
        } else {
            self.settings.context_window
        };
        let prompt = self.ctx.build_prompt(&self.format, window);
        debug!("Prompt is {} chars over a {}-turn window", prompt.len(), window);

        let spinner = ui::thinking();
        let reply = self.llm.run_prompt(&prompt).await;
        spinner.finish_and_clear();

        match reply {
            Ok(text) => self.format.parse(&text),
            Err(e) => {
                warn!("Model request failed: {}", e);
                ParsedSuggestion::explanation_only(format!("Error getting AI response: {}", e))
            }
        }
    }

    /// Consent, execution and remediation for a suggested command.
    async fn offer(&mut self, command: &str) -> Result<()> {
        if !ask_consent(self.operator.as_mut(), "Execute this command?")? {
            ui::declined();
            self.ctx
                .record(Turn::system(format!("Command declined: {}", command)));
            return Ok(());
        }

        let cwd = self.ctx.working_directory().to_path_buf();
        ui::executing(command);
        let result = self.runner.run(command, &cwd).await;
        ui::command_output(&result);
        self.stats.commands_executed += 1;
        info!("`{}` exited with {}", command, result.exit_code);

        let report = match &self.remediation {
            Some(controller) => {
                let mut env = RemediationEnv {
                    llm: self.llm.as_ref(),
                    format: &self.format,
                    runner: self.runner.as_ref(),
                    operator: self.operator.as_mut(),
                };
                controller.handle(&mut env, &cwd, command, result).await?
            }
            None => RemediationReport::unremediated(command, result),
        };

        if let Some(outcome) = &report.outcome {
            if outcome.fix_applied() {
                self.stats.fixes_applied += 1;
            }
            self.stats.commands_executed += executed_by_remediation(outcome);
            self.widen_window = true;
        }

        self.ctx
            .record(Turn::system(format!("Executed command: {}", command)));
        self.ctx.record(Turn::system(report.render()));
        Ok(())
    }
}

/// Commands run by remediation (fix and retry).
fn executed_by_remediation(outcome: &RemediationOutcome) -> usize {
    match outcome {
        RemediationOutcome::NoFixFound { .. } | RemediationOutcome::FixDeclined { .. } => 0,
        RemediationOutcome::FixFailed { .. } => 1,
        RemediationOutcome::FixApplied { retried, .. } => 1 + usize::from(*retried),
    }
}
