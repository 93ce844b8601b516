//! Ask command handler.
//!
//! Answers a single question in a fresh session.

use crate::commands::{print_answer, print_json};
use charter_core::{config::AppConfig, AppError, AppResult};
use clap::Args;

/// Ask one question about the constitution
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let pipeline = charter_knowledge::open_pipeline(config).await?;
        let session = pipeline.new_session()?;
        let record = pipeline.answer(question, &session).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": record.text,
                "citation": record.citation,
                "grounded": record.grounded,
                "standaloneQuestion": record.standalone_question,
                "sources": record.sources.iter().map(|s| serde_json::json!({
                    "citation": s.unit.citation,
                    "score": s.score,
                })).collect::<Vec<_>>(),
            });
            print_json(&output)?;
        } else {
            print_answer(&record);
        }

        Ok(())
    }
}
