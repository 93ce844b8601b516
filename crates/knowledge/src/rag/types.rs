//! RAG answer types.

use crate::types::ScoredUnit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Answer text, or exactly the sentinel sentence
    pub text: String,

    /// Citations of the passages given to the generator joined with `"; "`,
    /// or the no-sources marker
    pub citation: String,

    /// False exactly when `citation` is the no-sources marker
    pub grounded: bool,

    /// Question after contextualization, as used for retrieval
    pub standalone_question: String,

    /// Passages given to the generator, in retrieval order
    pub sources: Vec<ScoredUnit>,
}

/// Orchestrator stage, recorded on the tracing span of each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ready,
    Contextualizing,
    Retrieving,
    Generating,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ready => "ready",
            Stage::Contextualizing => "contextualizing",
            Stage::Retrieving => "retrieving",
            Stage::Generating => "generating",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
