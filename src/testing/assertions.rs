//! Custom assertions for domain-specific testing.

use super::mocks::MockCommandRunner;
use crate::conversation::{ConversationLog, Role};

/// Assert the log holds exactly these roles, in order.
///
/// # Panics
///
/// Panics listing the actual roles if they differ.
///
/// # Example
///
/// ```rust,ignore
/// assert_roles(ctx.log(), &[Role::User, Role::Assistant]);
/// ```
pub fn assert_roles(log: &ConversationLog, expected: &[Role]) {
    let actual: Vec<Role> = log.turns().iter().map(|t| t.role()).collect();
    assert_eq!(
        actual, expected,
        "Conversation roles differ.\nExpected: {:?}\nActual:   {:?}",
        expected, actual
    );
}

/// Assert some turn with `role` contains `substring`.
///
/// # Panics
///
/// Panics with the full log if no such turn exists.
pub fn assert_log_contains(log: &ConversationLog, role: Role, substring: &str) {
    let found = log
        .turns()
        .iter()
        .any(|t| t.role() == role && t.content().contains(substring));
    assert!(
        found,
        "Expected a {} turn containing '{}'.\nLog: {:#?}",
        role,
        substring,
        log.turns()
    );
}

/// Assert the runner never executed `command`.
///
/// # Panics
///
/// Panics with the list of executed commands.
pub fn assert_not_executed(runner: &MockCommandRunner, command: &str) {
    assert_eq!(
        runner.count_for(command),
        0,
        "Expected '{}' not to run. Executed: {:?}",
        command,
        runner.commands()
    );
}

/// Assert the runner executed `command` exactly `times` times.
///
/// # Panics
///
/// Panics with the list of executed commands.
pub fn assert_executed_times(runner: &MockCommandRunner, command: &str, times: usize) {
    assert_eq!(
        runner.count_for(command),
        times,
        "Expected '{}' to run {} time(s). Executed: {:?}",
        command,
        times,
        runner.commands()
    );
}
