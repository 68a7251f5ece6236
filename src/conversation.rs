//! Append-only conversation record.
//!
//! The log keeps every turn for the lifetime of the process. Model calls
//! only ever see a bounded window of the most recent turns, so the prompt
//! size stays bounded while the full history stays available.

use chrono::{DateTime, Local};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Lowercase role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged, timestamped entry in the conversation.
///
/// Fields are private so a turn cannot change after it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    role: Role,
    content: String,
    timestamp: DateTime<Local>,
}

impl Turn {
    /// Create a turn stamped with the current local time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Ordered, unbounded store of turns with a bounded read window.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Never rejects input.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The most recent `n` turns, oldest first.
    #[must_use]
    pub fn window_for(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// All turns in insertion order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The newest turn, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

/// Render turns as `ROLE: content` lines for a prompt.
#[must_use]
pub fn render_history(turns: &[Turn]) -> String {
    let mut out = String::new();
    for turn in turns {
        out.push_str(&turn.role().as_str().to_uppercase());
        out.push_str(": ");
        out.push_str(turn.content());
        out.push('\n');
    }
    out
}
