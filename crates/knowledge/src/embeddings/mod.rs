//! Embedding providers.
//!
//! The same provider, model and dimensions must be used to build an index and
//! to query it; [`EmbeddingConfig::validate_consistency`] enforces this.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
