//! Crate-level error types.
//!
//! [`GenerateError`] is what the text-generation collaborator can fail with.
//! The chat widget never lets it escape: every variant is turned into the same
//! apology turn. [`FolioError`] covers the hosts (config loading, the HTTP
//! surface) and is propagated with `?` up to `main`.

use thiserror::Error;

/// Failure at the text-generation boundary.
///
/// Each variant carries enough context to diagnose the failure in logs
/// without needing to inspect the originating error directly.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The request could not be sent or the connection dropped.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },
    /// The provider replied with a non-2xx status code.
    #[error("HTTP {status} from provider: {message}")]
    Http { status: u16, message: String },
    /// The response body was not the expected JSON shape.
    #[error("JSON parse error on field '{field}': {detail}")]
    Json { field: String, detail: String },
}

/// Errors surfaced by the CLI and HTTP hosts.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed HTTP request: {0}")]
    Request(String),
}
