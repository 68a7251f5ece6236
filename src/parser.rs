//! Extraction of an explanation and an optional command from model replies.
//!
//! Replies are free text expected to carry two marker lines:
//!
//! ```text
//! EXPLANATION: Lists files in the current directory
//! COMMAND: ls -la
//! ```
//!
//! Parsing never fails. Missing markers degrade to "the whole reply is the
//! explanation, there is no command". The marker format sits behind
//! [`ResponseFormat`] so callers do not depend on it.

use regex::Regex;
use std::sync::LazyLock;

/// Sentinel meaning "no command to run".
pub const NO_COMMAND_SENTINEL: &str = "NONE";

static EXPLANATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?(?:EXPLANATION|RESPONSE)(?:\*\*)?\s*:(?:\*\*)?\s*(.*)$")
        .expect("explanation marker regex is valid")
});

static COMMAND_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?COMMAND(?:\*\*)?\s*:(?:\*\*)?\s*(.*)$")
        .expect("command marker regex is valid")
});

/// What the model suggested for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSuggestion {
    /// Human readable text. Never empty for a non-empty reply.
    pub explanation: String,
    /// A single shell line, if the model proposed one.
    pub command: Option<String>,
}

impl ParsedSuggestion {
    /// A suggestion that only carries text.
    pub fn explanation_only(text: impl Into<String>) -> Self {
        Self {
            explanation: text.into(),
            command: None,
        }
    }
}

/// A reply format the session can parse suggestions out of.
pub trait ResponseFormat: Send + Sync {
    /// Split a raw reply into explanation and command.
    fn parse(&self, raw: &str) -> ParsedSuggestion;

    /// Extract only the command field.
    fn extract_command(&self, raw: &str) -> Option<String> {
        self.parse(raw).command
    }

    /// Instructions to append to a prompt so the model answers in this format.
    fn instructions(&self) -> &'static str;
}

/// Line-prefix marker format (`EXPLANATION:` / `COMMAND:`).
///
/// The first matching line wins for each marker, so a reply that repeats a
/// marker always parses the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFormat;

impl MarkerFormat {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ResponseFormat for MarkerFormat {
    fn parse(&self, raw: &str) -> ParsedSuggestion {
        let mut explanation: Option<String> = None;
        let mut command_seen = false;
        let mut command: Option<String> = None;

        for line in raw.lines() {
            let line = line.trim();

            if explanation.is_none() {
                if let Some(caps) = EXPLANATION_LINE.captures(line) {
                    let text = caps.get(1).map_or("", |m| m.as_str()).trim();
                    if !text.is_empty() {
                        explanation = Some(text.to_string());
                    }
                    continue;
                }
            }

            if !command_seen {
                if let Some(caps) = COMMAND_LINE.captures(line) {
                    command_seen = true;
                    command = normalize_command(caps.get(1).map_or("", |m| m.as_str()));
                }
            }
        }

        let explanation = explanation.unwrap_or_else(|| raw.trim().to_string());

        ParsedSuggestion {
            explanation,
            command,
        }
    }

    fn instructions(&self) -> &'static str {
        "Format your response as:\n\
         EXPLANATION: [Your helpful response here]\n\
         COMMAND: [Single terminal command to execute, or NONE if no command needed]"
    }
}

/// Strip wrapping backticks and apply the `NONE` sentinel.
fn normalize_command(value: &str) -> Option<String> {
    let mut cmd = value.trim();
    if cmd.len() >= 2 && cmd.starts_with('`') && cmd.ends_with('`') && !cmd.starts_with("``") {
        cmd = cmd[1..cmd.len() - 1].trim();
    }

    if cmd.is_empty() || cmd.eq_ignore_ascii_case(NO_COMMAND_SENTINEL) {
        None
    } else {
        Some(cmd.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ParsedSuggestion {
        MarkerFormat::new().parse(raw)
    }

    #[test]
    fn test_both_markers() {
        let parsed = parse("EXPLANATION: Lists files\nCOMMAND: ls -la\n");
        assert_eq!(parsed.explanation, "Lists files");
        assert_eq!(parsed.command.as_deref(), Some("ls -la"));
    }

    #[test]
    fn test_no_markers_falls_back_to_raw() {
        let raw = "I am not sure what you mean.";
        let parsed = parse(raw);
        assert_eq!(parsed.explanation, raw);
        assert!(parsed.command.is_none());
    }

    #[test]
    fn test_none_sentinel_any_case() {
        for sentinel in ["NONE", "none", "None", "nOnE"] {
            let parsed = parse(&format!("EXPLANATION: nothing to run\nCOMMAND: {sentinel}"));
            assert!(parsed.command.is_none(), "sentinel {sentinel} should clear command");
            assert_eq!(parsed.explanation, "nothing to run");
        }
    }

    #[test]
    fn test_command_without_explanation_keeps_raw_text() {
        let raw = "Here you go\nCOMMAND: whoami";
        let parsed = parse(raw);
        assert_eq!(parsed.explanation, raw);
        assert_eq!(parsed.command.as_deref(), Some("whoami"));
    }

    #[test]
    fn test_first_match_wins() {
        let parsed = parse(
            "EXPLANATION: first\nCOMMAND: echo one\nEXPLANATION: second\nCOMMAND: echo two",
        );
        assert_eq!(parsed.explanation, "first");
        assert_eq!(parsed.command.as_deref(), Some("echo one"));
    }

    #[test]
    fn test_first_command_none_is_final() {
        let parsed = parse("EXPLANATION: x\nCOMMAND: NONE\nCOMMAND: rm -rf /tmp/x");
        assert!(parsed.command.is_none());
    }

    #[test]
    fn test_response_alias_and_markdown_bold() {
        let parsed = parse("**RESPONSE:** Shows disk usage\n**COMMAND:** `df -h`");
        assert_eq!(parsed.explanation, "Shows disk usage");
        assert_eq!(parsed.command.as_deref(), Some("df -h"));
    }

    #[test]
    fn test_indented_markers() {
        let parsed = parse("  EXPLANATION: Shows uptime\n  COMMAND: uptime  ");
        assert_eq!(parsed.explanation, "Shows uptime");
        assert_eq!(parsed.command.as_deref(), Some("uptime"));
    }

    #[test]
    fn test_lowercase_markers_are_not_markers() {
        let raw = "explanation: hi\ncommand: ls";
        let parsed = parse(raw);
        assert_eq!(parsed.explanation, raw);
        assert!(parsed.command.is_none());
    }

    #[test]
    fn test_empty_command_value() {
        let parsed = parse("EXPLANATION: text\nCOMMAND:");
        assert!(parsed.command.is_none());
    }

    #[test]
    fn test_extract_command_only() {
        let format = MarkerFormat::new();
        assert_eq!(
            format.extract_command("COMMAND: sudo apt install nmap").as_deref(),
            Some("sudo apt install nmap")
        );
        assert!(format.extract_command("no idea").is_none());
    }

    #[test]
    fn test_instructions_mention_markers() {
        let text = MarkerFormat::new().instructions();
        assert!(text.contains("EXPLANATION:"));
        assert!(text.contains("COMMAND:"));
        assert!(text.contains(NO_COMMAND_SENTINEL));
    }
}
