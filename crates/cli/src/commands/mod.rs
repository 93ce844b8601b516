//! Command handlers for the Charter CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod index;
pub mod prompts;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;
pub use prompts::PromptsCommand;

use charter_knowledge::AnswerRecord;

/// Print an answer followed by its citation line.
pub(crate) fn print_answer(record: &AnswerRecord) {
    println!("{}", record.text);
    println!();
    println!("Source: {}", record.citation);
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> charter_core::AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
