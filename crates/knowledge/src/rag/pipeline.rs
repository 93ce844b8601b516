//! Conversational RAG orchestration.
//!
//! A turn runs contextualize, retrieve and generate in sequence, assembles
//! the citation from the passages that were retrieved, and only then records
//! the exchange in the session. Any failure leaves the session untouched.

use crate::history::{HistoryBuffer, TokenCounter};
use crate::profile::Profile;
use crate::rag::contextualize::QueryContextualizer;
use crate::rag::generate::AnswerGenerator;
use crate::rag::retry::RetryPolicy;
use crate::rag::session::Session;
use crate::rag::types::{AnswerRecord, Stage};
use crate::retriever::Retriever;
use crate::types::ScoredUnit;
use charter_core::config::HistorySettings;
use charter_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::Instrument;

const CITATION_SEPARATOR: &str = "; ";

/// A fully wired pipeline, shareable between sessions.
pub struct RagPipeline {
    contextualizer: QueryContextualizer,
    retriever: Arc<Retriever>,
    generator: AnswerGenerator,
    top_k: usize,
    retry: RetryPolicy,
    no_sources: String,
    history: HistorySettings,
    token_counter: Option<TokenCounter>,
}

impl RagPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// New conversation with this pipeline's history bounds.
    pub fn new_session(&self) -> AppResult<Session> {
        let history = HistoryBuffer::from_settings(&self.history, self.token_counter.clone())?;
        Ok(Session::new(history))
    }

    /// Answer one question within `session`.
    ///
    /// On success the exchange is appended to the session history. If the
    /// session was reset while the turn was running, the answer is dropped
    /// and `Cancelled` is returned.
    pub async fn answer(&self, question: &str, session: &Session) -> AppResult<AnswerRecord> {
        let span = tracing::info_span!(
            "turn",
            session = %session.id(),
            stage = Stage::Ready.as_str()
        );

        async {
            let epoch = session.epoch();
            let history = session.history()?;
            tracing::info!(human = %question, "Question received");

            let span = tracing::Span::current();

            span.record("stage", Stage::Contextualizing.as_str());
            let standalone = self
                .retry
                .run(Stage::Contextualizing.as_str(), || {
                    self.contextualizer.contextualize(question, &history)
                })
                .await?;

            span.record("stage", Stage::Retrieving.as_str());
            let retrieved = self
                .retry
                .run(Stage::Retrieving.as_str(), || {
                    self.retriever.retrieve(&standalone, self.top_k)
                })
                .await?;
            if retrieved.is_empty() {
                tracing::info!("No passages retrieved, generating without context");
            }

            span.record("stage", Stage::Generating.as_str());
            let generated = self
                .retry
                .run(Stage::Generating.as_str(), || {
                    self.generator.generate(&standalone, &retrieved.units)
                })
                .await?;

            let record = self.assemble(generated, standalone, retrieved.units);

            session.commit(epoch, question, &record.text)?;
            span.record("stage", Stage::Ready.as_str());

            tracing::info!(
                assistant = %record.text,
                citation = %record.citation,
                grounded = record.grounded,
                "Answer produced"
            );

            Ok::<_, AppError>(record)
        }
        .instrument(span)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Turn failed"))
    }

    fn assemble(&self, generated: String, standalone: String, sources: Vec<ScoredUnit>) -> AnswerRecord {
        let is_sentinel = self.generator.is_sentinel(&generated);
        if is_sentinel || sources.is_empty() {
            let text = if is_sentinel {
                self.generator.sentinel().to_string()
            } else {
                generated
            };
            return AnswerRecord {
                text,
                citation: self.no_sources.clone(),
                grounded: false,
                standalone_question: standalone,
                sources,
            };
        }

        let citation = sources
            .iter()
            .map(|s| s.unit.citation.as_str())
            .collect::<Vec<_>>()
            .join(CITATION_SEPARATOR);

        AnswerRecord {
            text: generated,
            citation,
            grounded: true,
            standalone_question: standalone,
            sources,
        }
    }
}

/// Wires the components of a [`RagPipeline`].
///
/// `build` fails unless a contextualizer, a retriever and a generator were
/// all supplied.
#[derive(Default)]
pub struct PipelineBuilder {
    contextualizer: Option<QueryContextualizer>,
    retriever: Option<Arc<Retriever>>,
    generator: Option<AnswerGenerator>,
    top_k: Option<usize>,
    retry: Option<RetryPolicy>,
    no_sources: Option<String>,
    history: Option<HistorySettings>,
    token_counter: Option<TokenCounter>,
}

impl PipelineBuilder {
    pub fn contextualizer(mut self, contextualizer: QueryContextualizer) -> Self {
        self.contextualizer = Some(contextualizer);
        self
    }

    pub fn retriever(mut self, retriever: Arc<Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn generator(mut self, generator: AnswerGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn no_sources(mut self, marker: impl Into<String>) -> Self {
        self.no_sources = Some(marker.into());
        self
    }

    pub fn history(mut self, settings: HistorySettings) -> Self {
        self.history = Some(settings);
        self
    }

    /// Share one tokenizer between all sessions.
    pub fn token_counter(mut self, counter: TokenCounter) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn build(self) -> AppResult<RagPipeline> {
        let contextualizer = self
            .contextualizer
            .ok_or_else(|| missing("query contextualizer"))?;
        let retriever = self.retriever.ok_or_else(|| missing("retriever"))?;
        let generator = self.generator.ok_or_else(|| missing("answer generator"))?;

        let top_k = self.top_k.unwrap_or(2);
        if top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        let history = self.history.unwrap_or_default();
        let token_counter = match (self.token_counter, history.max_tokens) {
            (Some(counter), _) => Some(counter),
            (None, Some(_)) => Some(TokenCounter::cl100k()?),
            (None, None) => None,
        };

        tracing::debug!(
            top_k,
            embedding = %retriever.manifest().embedding.identifier(),
            "RAG pipeline ready"
        );

        Ok(RagPipeline {
            contextualizer,
            retriever,
            generator,
            top_k,
            retry: self.retry.unwrap_or_default(),
            no_sources: self
                .no_sources
                .unwrap_or_else(|| Profile::default().no_sources),
            history,
            token_counter,
        })
    }
}

fn missing(component: &str) -> AppError {
    AppError::Config(format!("RAG pipeline is missing a {}", component))
}
