//! Operator-facing terminal output.
//!
//! Everything the operator reads goes through here; diagnostics for
//! developers go through `tracing` instead.

use crate::context::SessionContext;
use crate::diagnostics::DiagnosisSource;
use crate::remediation::RemediationOutcome;
use crate::runner::ExecutionResult;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Main input prompt.
pub const INPUT_PROMPT: &str = "hackassist> ";

const RULE: &str = "============================================================";

/// Startup banner and session facts.
pub fn banner(ctx: &SessionContext, model: &str) {
    println!("{}", "  _   _            _       _            _     _   ".green());
    println!("{}", " | | | | __ _  ___| | __  / \\   ___ ___(_)___| |_ ".green());
    println!("{}", " | |_| |/ _` |/ __| |/ / / _ \\ / __/ __| / __| __|".green());
    println!("{}", " |  _  | (_| | (__|   < / ___ \\\\__ \\__ \\ \\__ \\ |_ ".green());
    println!("{}", " |_| |_|\\__,_|\\___|_|\\_/_/   \\_\\___/___/_|___/\\__|".green());
    println!();
    println!(
        "{}",
        "WARNING: For legitimate security research only!".red().bold()
    );
    println!();
    session_facts(ctx, model);
}

/// Working directory, system and start time.
pub fn session_facts(ctx: &SessionContext, model: &str) {
    println!("Working directory: {}", ctx.working_directory().display());
    println!("System: {}", ctx.system_info());
    println!(
        "Session started: {}",
        ctx.session_start().format("%Y-%m-%d %H:%M:%S")
    );
    println!("Model: {}", model);
    println!("\n{}", RULE);
    println!("{}", "COMMANDS:".bold());
    println!("  'p' + Enter - New prompt");
    println!("  'c' + Enter - Close conversation");
    println!("  'y' / 'n'   - Accept/Deny suggested commands");
    println!("{}", RULE);
    println!("\nEnter your first prompt (or 'c' to close):");
}

/// Spinner shown while the model is working.
pub fn thinking() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn explanation(text: &str) {
    println!("\n{}", "AI Response:".cyan().bold());
    println!("{}", text);
}

pub fn suggested_command(command: &str) {
    println!("\n{}", "Suggested command:".yellow().bold());
    println!("  {}", command.bold());
}

/// Text of a yes/no question prompt.
#[must_use]
pub fn consent_prompt(question: &str) -> String {
    format!("\n{} (y/n): ", question)
}

pub fn invalid_choice(answer: &str) {
    println!(
        "{} '{}'. Please enter 'y' or 'n'",
        "Invalid choice".yellow(),
        answer
    );
}

pub fn declined() {
    println!("{}", "Command declined.".red());
}

pub fn executing(command: &str) {
    println!("{} {}", "Executing:".blue().bold(), command);
}

pub fn command_output(result: &ExecutionResult) {
    println!("\n{}", "Command Output:".bold());
    println!("{}", result.render());
}

pub fn failure_detected(exit_code: i32) {
    println!(
        "\n{} (exit code {}). Diagnosing...",
        "Command failed".red().bold(),
        exit_code
    );
}

pub fn fix_found(fix: &str, source: DiagnosisSource) {
    println!(
        "{} ({}):\n  {}",
        "Possible fix".green().bold(),
        source,
        fix.bold()
    );
}

pub fn advisory(text: &str) {
    println!("{} {}", "Hint:".yellow().bold(), text);
}

pub fn no_fix_found() {
    println!("{}", "No automatic fix found.".yellow());
}

pub fn outcome(outcome: &RemediationOutcome) {
    let line = match outcome {
        RemediationOutcome::NoFixFound { .. } => "Remediation finished without a fix.".yellow(),
        RemediationOutcome::FixDeclined { .. } => "Fix declined.".yellow(),
        RemediationOutcome::FixFailed { .. } => "Fix failed; not retrying.".red(),
        RemediationOutcome::FixApplied { retried: false, .. } => "Fix applied.".green(),
        RemediationOutcome::FixApplied {
            retry_result: Some(r),
            ..
        } if r.succeeded() => "Fix applied and original command succeeded.".green(),
        RemediationOutcome::FixApplied { .. } => {
            "Fix applied but the original command still fails.".yellow()
        }
    };
    println!("{}", line);
}

pub fn continue_hint() {
    println!("\nContinue working... (enter 'p' for new prompt, 'c' to close)");
}

pub fn next_prompt_hint() {
    println!("Enter new prompt (or 'p' for prompt mode, 'c' to close):");
}

pub fn prompt_mode() {
    println!("Enter your prompt:");
}

pub fn error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn unexpected_error(message: &str) {
    eprintln!("{} {}", "Unexpected error:".red().bold(), message);
    println!("Enter new prompt (or 'c' to close):");
}

pub fn goodbye() {
    println!("\nClosing conversation. Goodbye!");
}

/// End-of-session counters.
pub fn summary(turns: usize, commands: usize, fixes: usize) {
    println!(
        "Session summary: {} turns, {} commands executed, {} fixes applied",
        turns, commands, fixes
    );
}
