//! Chat provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use charter_core::AppError;
use reqwest::StatusCode;

/// Map a non-success HTTP status to an error.
///
/// Client errors other than 408 and 429 (bad key, unknown model, malformed
/// request) will not succeed on retry and become `Config`; everything else
/// stays a transient `Llm` error.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    let retryable = !status.is_client_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;

    if retryable {
        AppError::Llm(message)
    } else {
        AppError::Config(message)
    }
}
