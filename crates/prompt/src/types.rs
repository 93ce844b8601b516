//! Prompt types for Charter.

use charter_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// What the prompt is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Variables the template expects; each must be supplied at render time
    #[serde(default)]
    pub variables: Vec<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

impl PromptDefinition {
    /// Reject definitions with blank required fields or an apiVersion not
    /// shaped like `x.y`.
    pub fn validate(&self) -> AppResult<()> {
        let blank = [
            ("id", self.id.as_str()),
            ("title", self.title.as_str()),
            ("apiVersion", self.api_version.as_str()),
            ("template", self.template.as_str()),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        if let Some((field, _)) = blank {
            return Err(AppError::Prompt(format!(
                "Prompt {} cannot be empty",
                field
            )));
        }

        let numeric = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        let well_formed = self
            .api_version
            .split_once('.')
            .is_some_and(|(major, minor)| numeric(major) && numeric(minor));
        if !well_formed {
            return Err(AppError::Prompt(format!(
                "Invalid apiVersion '{}' in prompt '{}'. Expected 'x.y'",
                self.api_version, self.id
            )));
        }

        Ok(())
    }
}

/// A rendered system prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    pub fn new(
        text: String,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            text,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}
