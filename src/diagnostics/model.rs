//! Model-backed fallback diagnosis.
//!
//! Used only when the pattern table has nothing to say. The request is
//! standalone (no conversation window): the failed command and its output
//! are the whole context. Any collaborator fault resolves to "no fix".

use crate::llm::LlmClient;
use crate::parser::ResponseFormat;
use tracing::{debug, warn};

/// Asks the model for a single corrective command.
#[derive(Debug, Clone)]
pub struct ModelDiagnostics {
    max_output_chars: usize,
}

impl Default for ModelDiagnostics {
    fn default() -> Self {
        Self::new(4000)
    }
}

impl ModelDiagnostics {
    #[must_use]
    pub fn new(max_output_chars: usize) -> Self {
        Self { max_output_chars }
    }

    /// Prompt sent for a failed command.
    #[must_use]
    pub fn fix_prompt(&self, command: &str, failure_output: &str) -> String {
        format!(
            "You are HackAssistant's error analyst. A Linux shell command failed.

FAILED COMMAND: {}

OUTPUT:
{}

Suggest ONE corrective terminal command that fixes the cause of this failure.
If no command can fix it, answer NONE.

Format your response as:
EXPLANATION: [One sentence describing the cause]
COMMAND: [Single corrective command, or NONE]",
            command,
            truncate_chars(failure_output, self.max_output_chars),
        )
    }

    /// Ask the model for a fix. Faults and the `NONE` sentinel yield `None`.
    pub async fn suggest_fix(
        &self,
        llm: &dyn LlmClient,
        format: &dyn ResponseFormat,
        command: &str,
        failure_output: &str,
    ) -> Option<String> {
        let prompt = self.fix_prompt(command, failure_output);
        debug!("Requesting model diagnosis for `{}`", command);

        match llm.run_prompt(&prompt).await {
            Ok(reply) => {
                let fix = format.extract_command(&reply);
                // proposing the same failing line again is not a fix
                fix.filter(|f| f.trim() != command.trim())
            }
            Err(e) => {
                warn!("Model diagnosis failed: {}", e);
                None
            }
        }
    }
}

/// Keep the last `max` characters, where errors usually are.
fn truncate_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max).collect();
    format!("... (truncated)\n{}", tail)
}
