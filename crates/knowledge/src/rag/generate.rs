//! Grounded answer generation.

use crate::types::ScoredUnit;
use charter_core::{AppError, AppResult};
use charter_llm::{LlmClient, LlmRequest};
use charter_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Answers a standalone question from retrieved passages only.
///
/// The system prompt carries the passages and the sentinel sentence the
/// model must reply with when they are insufficient. Citations are not the
/// generator's concern.
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    sentinel: String,
}

impl AnswerGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Render the system prompt for a set of passages.
    pub fn system_prompt(&self, units: &[ScoredUnit]) -> AppResult<String> {
        let context = units
            .iter()
            .map(|u| u.unit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut variables = HashMap::new();
        variables.insert("context".to_string(), context);
        variables.insert("sentinel".to_string(), self.sentinel.clone());

        Ok(build_prompt(&self.prompt, variables)?.text)
    }

    pub async fn generate(&self, standalone_question: &str, units: &[ScoredUnit]) -> AppResult<String> {
        let system = self.system_prompt(units)?;
        let request = LlmRequest::new(standalone_question, &self.model)
            .with_system(system)
            .with_temperature(0.0);

        let response = self.client.complete(&request).await?;
        let answer = response.content.trim();

        if answer.is_empty() {
            return Err(AppError::Generation(format!(
                "Model '{}' returned an empty answer",
                response.model
            )));
        }

        tracing::debug!(
            passages = units.len(),
            completion_tokens = response.usage.completion_tokens,
            "Generated answer"
        );

        Ok(answer.to_string())
    }

    /// Whether `answer` is the sentinel, ignoring surrounding whitespace,
    /// quotes and a trailing period.
    pub fn is_sentinel(&self, answer: &str) -> bool {
        normalize_sentence(answer) == normalize_sentence(&self.sentinel)
    }
}

fn normalize_sentence(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .trim_end_matches('.')
        .trim_end()
}
