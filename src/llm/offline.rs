//! Provider that works without a model.
//!
//! Every prompt gets the same reply: an explanation and no command. This
//! keeps the loop usable (and testable end to end) when no API key exists.

use crate::llm::LlmClient;
use anyhow::Result;
use async_trait::async_trait;

/// Reply used by the offline provider.
pub const OFFLINE_REPLY: &str = "EXPLANATION: Offline mode: no language model is configured, so no command can be suggested.\nCOMMAND: NONE";

/// Stateless client answering every prompt with [`OFFLINE_REPLY`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineClient;

impl OfflineClient {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for OfflineClient {
    async fn run_prompt(&self, _prompt: &str) -> Result<String> {
        Ok(OFFLINE_REPLY.to_string())
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MarkerFormat, ResponseFormat};

    #[tokio::test]
    async fn test_offline_reply_never_suggests_a_command() {
        let client = OfflineClient::new();
        let reply = client.run_prompt("scan the network").await.unwrap();
        let parsed = MarkerFormat::new().parse(&reply);
        assert!(parsed.explanation.starts_with("Offline mode"));
        assert_eq!(parsed.command, None);
        assert_eq!(client.model_name(), "offline");
    }
}
