//! Shared test doubles and end-to-end pipeline tests.

mod pipeline_scenarios;
mod rag_ranking;

use crate::embeddings::EmbeddingProvider;
use charter_core::AppResult;
use charter_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use regex::Regex;
use std::sync::Mutex;

type Script = Box<dyn Fn(&LlmRequest) -> AppResult<String> + Send + Sync>;

/// Chat client whose replies come from a closure over the request.
pub(crate) struct ScriptedClient {
    script: Script,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new(
        script: impl Fn(&LlmRequest) -> AppResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = (self.script)(request)?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

/// Embeds every "Article N" mention as a one-hot component at dimension N,
/// so retrieval by article number is exact.
#[derive(Debug)]
pub(crate) struct LocatorEmbedder {
    dimensions: usize,
    pattern: Regex,
}

impl LocatorEmbedder {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            pattern: Regex::new(r"Article (\d+)").unwrap(),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for capture in self.pattern.captures_iter(text) {
            let n: usize = capture[1].parse().unwrap();
            vector[n % self.dimensions] += 1.0;
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LocatorEmbedder {
    fn provider_name(&self) -> &str {
        "locator"
    }

    fn model_name(&self) -> &str {
        "locator-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
