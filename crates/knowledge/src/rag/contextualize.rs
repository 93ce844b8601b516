//! Follow-up question rewriting.

use crate::history::{to_chat_messages, Turn};
use charter_core::AppResult;
use charter_llm::{LlmClient, LlmRequest};
use charter_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Rewrites a question that leans on earlier turns into one that stands on
/// its own. Never answers it.
pub struct QueryContextualizer {
    client: Arc<dyn LlmClient>,
    model: String,
    system_prompt: String,
}

impl QueryContextualizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Render the system prompt from a prompt definition with no variables.
    pub fn from_prompt(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: &PromptDefinition,
    ) -> AppResult<Self> {
        let built = build_prompt(prompt, HashMap::new())?;
        Ok(Self::new(client, model, built.text))
    }

    /// Standalone form of `question`.
    ///
    /// With no history there is nothing to resolve, so the question is
    /// returned as is without calling the model. A blank rewrite falls back
    /// to the original question.
    pub async fn contextualize(&self, question: &str, history: &[Turn]) -> AppResult<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let request = LlmRequest::new(question, &self.model)
            .with_system(&self.system_prompt)
            .with_history(to_chat_messages(history))
            .with_temperature(0.0);

        let response = self.client.complete(&request).await?;
        let rewritten = response.content.trim();

        if rewritten.is_empty() {
            tracing::warn!("Contextualizer returned nothing, using the original question");
            return Ok(question.to_string());
        }

        tracing::debug!(original = %question, standalone = %rewritten, "Contextualized question");
        Ok(rewritten.to_string())
    }
}
