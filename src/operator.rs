//! Operator input and consent prompts.
//!
//! Every state change that touches the machine (running a suggestion,
//! applying a fix, retrying) goes through [`ask_consent`], which accepts only
//! an exact yes/no token and re-asks on anything else.

use crate::error::{HackAssistError, Result};
use crate::ui;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::DefaultEditor;
use tracing::debug;

/// One read from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    /// A line of text, without the trailing newline.
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Input stream closed (Ctrl-D, end of piped input).
    Closed,
}

/// Source of operator input.
pub trait Operator {
    /// Show `prompt` and block until the operator answers.
    ///
    /// # Errors
    ///
    /// Returns [`HackAssistError::Input`] if the terminal cannot be read.
    fn read_line(&mut self, prompt: &str) -> Result<OperatorInput>;
}

/// Parsed answer to a yes/no question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consent {
    Approved,
    Declined,
    /// Anything other than an accepted token.
    Invalid(String),
}

/// Interpret a consent answer. Accepts `y`/`yes`/`n`/`no`, any case.
#[must_use]
pub fn parse_consent(answer: &str) -> Consent {
    let normalized = answer.trim().to_lowercase();
    match normalized.as_str() {
        "y" | "yes" => Consent::Approved,
        "n" | "no" => Consent::Declined,
        _ => Consent::Invalid(answer.trim().to_string()),
    }
}

/// Ask a yes/no question until the operator gives a valid answer.
///
/// Invalid answers do not change anything; the same question is asked again.
///
/// # Errors
///
/// Returns [`HackAssistError::Interrupted`] on Ctrl-C or closed input.
pub fn ask_consent(operator: &mut dyn Operator, question: &str) -> Result<bool> {
    loop {
        match operator.read_line(&ui::consent_prompt(question))? {
            OperatorInput::Line(answer) => match parse_consent(&answer) {
                Consent::Approved => {
                    debug!("Consent granted: {}", question);
                    return Ok(true);
                }
                Consent::Declined => {
                    debug!("Consent declined: {}", question);
                    return Ok(false);
                }
                Consent::Invalid(text) => ui::invalid_choice(&text),
            },
            OperatorInput::Interrupted | OperatorInput::Closed => {
                return Err(HackAssistError::Interrupted)
            }
        }
    }
}

/// Interactive terminal operator with in-memory line history.
pub struct TerminalOperator {
    editor: DefaultEditor,
}

impl TerminalOperator {
    /// Attach to the controlling terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the line editor cannot be initialised.
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(|e| HackAssistError::input(e.to_string()))?;
        Ok(Self { editor })
    }
}

impl Operator for TerminalOperator {
    fn read_line(&mut self, prompt: &str) -> Result<OperatorInput> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                remember(self.editor.history_mut(), &line);
                Ok(OperatorInput::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(OperatorInput::Interrupted),
            Err(ReadlineError::Eof) => Ok(OperatorInput::Closed),
            Err(e) => Err(HackAssistError::input(e.to_string())),
        }
    }
}

/// Add a non-blank line to the in-memory history. Failures are logged and ignored.
fn remember<H: History>(history: &mut H, line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    match history.add(line) {
        Ok(added) => added,
        Err(e) => {
            debug!("Could not add history entry: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedOperator;

    #[test]
    fn test_remember_skips_blank_lines() {
        let mut history = rustyline::history::DefaultHistory::new();
        assert!(remember(&mut history, "nmap -sV localhost"));
        assert!(!remember(&mut history, "   "));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_parse_consent_tokens() {
        assert_eq!(parse_consent("y"), Consent::Approved);
        assert_eq!(parse_consent(" YES "), Consent::Approved);
        assert_eq!(parse_consent("n"), Consent::Declined);
        assert_eq!(parse_consent("No"), Consent::Declined);
        assert_eq!(parse_consent("yep"), Consent::Invalid("yep".into()));
        assert_eq!(parse_consent(""), Consent::Invalid(String::new()));
    }

    #[test]
    fn test_ask_consent_reprompts_on_invalid() {
        let mut operator = ScriptedOperator::new(["maybe", "", "y"]);
        assert!(ask_consent(&mut operator, "Execute this command?").unwrap());
        assert_eq!(operator.prompts().len(), 3);
    }

    #[test]
    fn test_ask_consent_decline() {
        let mut operator = ScriptedOperator::new(["n"]);
        assert!(!ask_consent(&mut operator, "Apply fix?").unwrap());
    }

    #[test]
    fn test_ask_consent_closed_input_interrupts() {
        let mut operator = ScriptedOperator::new(["what"]);
        let err = ask_consent(&mut operator, "Retry?").unwrap_err();
        assert!(matches!(err, HackAssistError::Interrupted));
    }
}
