//! Prompt system for Charter.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in prompts for query contextualization and grounded answering
//! - Workspace overrides under `.charter/prompts/<id>.yml`
//! - Handlebars template rendering with declared-variable checks

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::{builtin_prompt, builtin_prompt_ids};
pub use loader::{list_prompts, load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
