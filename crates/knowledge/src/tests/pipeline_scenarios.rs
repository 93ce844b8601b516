//! End-to-end conversations over an indexed sample constitution.

use super::{LocatorEmbedder, ScriptedClient};
use crate::history::HistoryBuffer;
use crate::index::SqliteIndex;
use crate::indexer::Indexer;
use crate::profile::Profile;
use crate::rag::{AnswerGenerator, QueryContextualizer, RagPipeline, RetryPolicy, Session};
use crate::retriever::Retriever;
use crate::segment::tests::sample_document;
use crate::segment::Segmenter;
use charter_core::AppError;
use charter_llm::LlmRequest;
use charter_prompt::builtin::{ANSWER, CONTEXTUALIZE};
use charter_prompt::{builtin_prompt, PromptDefinition};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

const SENTINEL: &str = "Unfortunately I do not know the answer";

struct Fixture {
    pipeline: RagPipeline,
    contextualizer: Arc<ScriptedClient>,
    generator: Arc<ScriptedClient>,
}

fn prompt(id: &str) -> PromptDefinition {
    builtin_prompt(id).unwrap().unwrap()
}

/// Pipeline over a 3-chapter, 10-article document.
async fn fixture(contextualizer: ScriptedClient, generator: ScriptedClient) -> Fixture {
    let profile = Profile::english();
    let units = Segmenter::new(&profile)
        .unwrap()
        .segment(&sample_document(&[3, 4, 3]));
    assert_eq!(units.len(), 11);

    let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
    let embedder = Arc::new(LocatorEmbedder::new(64));
    Indexer::new("constitution", index.clone(), embedder.clone())
        .build_index(&units, "digest")
        .await
        .unwrap();
    let retriever = Arc::new(Retriever::open(index, embedder).unwrap());

    let contextualizer = Arc::new(contextualizer);
    let generator = Arc::new(generator);

    let pipeline = RagPipeline::builder()
        .contextualizer(
            QueryContextualizer::from_prompt(contextualizer.clone(), "test-model", &prompt(CONTEXTUALIZE))
                .unwrap(),
        )
        .retriever(retriever)
        .generator(AnswerGenerator::new(
            generator.clone(),
            "test-model",
            prompt(ANSWER),
            profile.sentinel.clone(),
        ))
        .no_sources(profile.no_sources.clone())
        .retry(RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        })
        .build()
        .unwrap();

    Fixture {
        pipeline,
        contextualizer,
        generator,
    }
}

/// Answers from the passage of the article the question names, if that
/// passage is in the system prompt; otherwise the sentinel.
fn grounded_answer(request: &LlmRequest) -> charter_core::AppResult<String> {
    let article = Regex::new(r"Article (\d+)").unwrap();
    let system = request.system.clone().unwrap_or_default();
    if let Some(capture) = article.captures(&request.prompt) {
        let body = format!("This is the body of article number {}.", &capture[1]);
        if system.contains(&body) {
            return Ok(format!("Article {} states: {}", &capture[1], body));
        }
    }
    Ok(format!("{}.", SENTINEL))
}

/// Resolves "the next one" against the last article mentioned in history.
fn resolve_next_article(request: &LlmRequest) -> charter_core::AppResult<String> {
    let article = Regex::new(r"Article (\d+)").unwrap();
    let previous = request
        .history
        .iter()
        .rev()
        .find_map(|m| article.captures(&m.content))
        .map(|c| c[1].parse::<u32>().unwrap());

    match previous {
        Some(n) if request.prompt.contains("next one") => {
            Ok(format!("What does Article {} say?", n + 1))
        }
        _ => Ok(request.prompt.clone()),
    }
}

#[tokio::test]
async fn test_question_about_an_article_cites_it() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(grounded_answer),
    )
    .await;
    let session = fx.pipeline.new_session().unwrap();

    let record = fx
        .pipeline
        .answer("What does Article 5 say?", &session)
        .await
        .unwrap();

    assert_eq!(record.sources[0].unit.citation, "Chapter II, Article 5");
    assert!(record.citation.contains("Chapter II, Article 5"));
    assert_eq!(record.sources.len(), 2);
    assert_eq!(
        record.citation,
        format!(
            "{}; {}",
            record.sources[0].unit.citation, record.sources[1].unit.citation
        )
    );
    assert!(record.grounded);
    assert!(record.text.contains("article number 5"));
    assert_eq!(fx.contextualizer.call_count(), 0);
    assert_eq!(session.history().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unanswerable_question_yields_sentinel_and_no_sources() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(grounded_answer),
    )
    .await;
    let session = fx.pipeline.new_session().unwrap();

    let record = fx
        .pipeline
        .answer("What does the constitution say about space travel?", &session)
        .await
        .unwrap();

    assert_eq!(record.text, SENTINEL);
    assert_eq!(record.citation, Profile::english().no_sources);
    assert!(!record.grounded);
}

#[tokio::test]
async fn test_follow_up_is_rewritten_before_retrieval() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(grounded_answer),
    )
    .await;
    let session = fx.pipeline.new_session().unwrap();

    fx.pipeline
        .answer("What does Article 5 say?", &session)
        .await
        .unwrap();
    let record = fx
        .pipeline
        .answer("And what about the next one?", &session)
        .await
        .unwrap();

    assert_eq!(record.standalone_question, "What does Article 6 say?");
    assert_eq!(record.sources[0].unit.citation, "Chapter II, Article 6");
    assert!(record.grounded);

    let rewrites = fx.contextualizer.requests();
    assert_eq!(rewrites.len(), 1);
    assert_eq!(rewrites[0].history.len(), 2);
    assert_eq!(rewrites[0].prompt, "And what about the next one?");

    let generations = fx.generator.requests();
    assert_eq!(generations.last().unwrap().prompt, "What does Article 6 say?");

    let history = session.history().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].content, "And what about the next one?");
}

#[tokio::test]
async fn test_reset_forgets_previous_turns() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(grounded_answer),
    )
    .await;
    let session = fx.pipeline.new_session().unwrap();

    fx.pipeline
        .answer("What does Article 5 say?", &session)
        .await
        .unwrap();
    session.reset().unwrap();
    assert!(session.history().unwrap().is_empty());

    let record = fx
        .pipeline
        .answer("And what about the next one?", &session)
        .await
        .unwrap();

    assert_eq!(record.standalone_question, "And what about the next one?");
    assert_eq!(fx.contextualizer.call_count(), 0);
}

#[tokio::test]
async fn test_failed_turn_leaves_history_untouched() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(|_| Err(AppError::Llm("service unavailable".to_string()))),
    )
    .await;
    let session = fx.pipeline.new_session().unwrap();

    let result = fx.pipeline.answer("What does Article 5 say?", &session).await;

    assert!(matches!(result, Err(AppError::Llm(_))));
    assert_eq!(fx.generator.call_count(), 2);
    assert!(session.history().unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_during_turn_discards_answer() {
    let session = Arc::new(Session::new(HistoryBuffer::default()));
    let in_flight = session.clone();

    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(move |request| {
            in_flight.reset().unwrap();
            grounded_answer(request)
        }),
    )
    .await;

    let result = fx.pipeline.answer("What does Article 5 say?", &session).await;

    assert!(matches!(result, Err(AppError::Cancelled)));
    assert!(session.history().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_stays_within_window() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(grounded_answer),
    )
    .await;
    let session = fx.pipeline.new_session().unwrap();

    for n in 1..=5 {
        fx.pipeline
            .answer(&format!("What does Article {} say?", n), &session)
            .await
            .unwrap();
        assert!(session.history().unwrap().len() <= 6);
    }

    let history = session.history().unwrap();
    assert_eq!(history[0].content, "What does Article 3 say?");
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let fx = fixture(
        ScriptedClient::new(resolve_next_article),
        ScriptedClient::new(grounded_answer),
    )
    .await;
    let first = fx.pipeline.new_session().unwrap();
    let second = fx.pipeline.new_session().unwrap();

    let (a, b) = tokio::join!(
        fx.pipeline.answer("What does Article 2 say?", &first),
        fx.pipeline.answer("What does Article 9 say?", &second),
    );

    assert_eq!(a.unwrap().sources[0].unit.citation, "Chapter I, Article 2");
    assert_eq!(b.unwrap().sources[0].unit.citation, "Chapter III, Article 9");
    assert_eq!(first.history().unwrap()[0].content, "What does Article 2 say?");
    assert_eq!(second.history().unwrap()[0].content, "What does Article 9 say?");
}

#[tokio::test]
async fn test_builder_requires_every_component() {
    let result = RagPipeline::builder().top_k(2).build();
    match result {
        Err(AppError::Config(message)) => assert!(message.contains("contextualizer")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("pipeline built without components"),
    }
}
