//! Charter Core Library
//!
//! This crate provides the foundational utilities shared by every Charter crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration (defaults, `.charter/config.yaml`, environment, CLI)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
