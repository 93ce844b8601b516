//! LLM integration crate for Charter.
//!
//! This crate provides a provider-agnostic abstraction for chat models.
//! Every request is a system prompt, an optional conversation history and a
//! final user message; providers translate that into their own wire format.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default), `/api/chat`
//! - **OpenAI**: Any OpenAI-compatible `/chat/completions` endpoint
//!
//! # Example
//! ```no_run
//! use charter_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What does Article 5 say?", "llama3.2").with_temperature(0.0);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::{ChatMessage, ChatRole, ProviderType};
