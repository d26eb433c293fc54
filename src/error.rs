//! Typed errors at the store and generator boundaries.
//!
//! Application code wraps these in `anyhow` with context; the pipeline
//! matches on them only to decide what to log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("context store is not open; call open() first")]
    NotOpen,
    #[error("invalid entry: {0}")]
    InvalidEntry(&'static str),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unknown LLM provider '{0}': must be anthropic or openai")]
    UnknownProvider(String),
    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
