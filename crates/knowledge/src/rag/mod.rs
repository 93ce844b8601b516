//! Conversational retrieval-augmented answering.
//!
//! [`RagPipeline`] composes the [`QueryContextualizer`], the shared
//! [`Retriever`](crate::retriever::Retriever) and the [`AnswerGenerator`];
//! each user holds a [`Session`].

pub mod contextualize;
pub mod generate;
pub mod pipeline;
pub mod retry;
pub mod session;
pub mod types;

pub use contextualize::QueryContextualizer;
pub use generate::AnswerGenerator;
pub use pipeline::{PipelineBuilder, RagPipeline};
pub use retry::RetryPolicy;
pub use session::Session;
pub use types::{AnswerRecord, Stage};
