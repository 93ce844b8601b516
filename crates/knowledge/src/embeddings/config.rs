//! Embedding configuration types.

use charter_core::config::EmbeddingSettings;
use charter_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding model identity and request settings.
///
/// `provider`, `model` and `dimensions` identify the vector space and are
/// stamped into the index manifest. The remaining fields only affect how
/// requests are made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Service endpoint for remote providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            normalize: true,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            normalize: true,
            batch_size: settings.batch_size.max(1),
            endpoint: settings.endpoint.clone(),
        }
    }
}

impl EmbeddingConfig {
    /// Short identifier, e.g. `ollama/nomic-embed-text@768`.
    pub fn identifier(&self) -> String {
        format!("{}/{}@{}", self.provider, self.model, self.dimensions)
    }

    /// Validate that the configuration recorded in an index (`self`) matches
    /// the one about to be used for queries (`other`).
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::IndexMismatch(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::IndexMismatch(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::IndexMismatch(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert!(config.normalize);
        assert_eq!(config.identifier(), "trigram/trigram-v1@384");
    }

    #[test]
    fn test_from_settings() {
        let settings = EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 0,
            endpoint: Some("http://gpu:11434".to_string()),
        };
        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu:11434"));
    }

    #[test]
    fn test_validate_consistency_success() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            batch_size: 8,
            ..config1.clone()
        };
        assert!(config1.validate_consistency(&config2).is_ok());
    }

    #[test]
    fn test_validate_consistency_model_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            model: "trigram-v2".to_string(),
            ..config1.clone()
        };

        match config1.validate_consistency(&config2) {
            Err(AppError::IndexMismatch(msg)) => assert!(msg.contains("Model mismatch")),
            other => panic!("Expected index mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            dimensions: 1536,
            ..config1.clone()
        };

        let result = config1.validate_consistency(&config2);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Dimension mismatch"));
    }
}
