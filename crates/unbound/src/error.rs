use std::path::PathBuf;

use thiserror::Error;

use crate::pool::Transport;

/// Errors raised while building the plugin from its configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A zone in `from` or `except` does not normalize to a domain name.
    #[error("invalid '{field}' value, should be normalizable as a non-empty domain name: {value:?}")]
    InvalidZone { field: &'static str, value: String },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unknown property '{name}'")]
    UnknownProperty { line: usize, name: String },

    #[error("line {line}: wrong argument count for '{directive}': expected {expected}, got {got}")]
    ArgumentCount {
        line: usize,
        directive: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("line {line}: unbound can only be configured once per server block")]
    Duplicate { line: usize },

    #[error("no unbound block found")]
    Missing,

    #[error("failed to read {file}: {source}", file = .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Errors raised by the resolver context pool.
///
/// Each names the context it happened on and carries the engine's error as cause.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create {transport} context: {cause:#}")]
    CreateContext { transport: Transport, cause: anyhow::Error },

    #[error("failed to set option {key:?} with value {value:?} on {transport} context: {cause:#}")]
    SetOption {
        key: String,
        value: String,
        transport: Transport,
        cause: anyhow::Error,
    },

    #[error("failed to read config file ({file}) on {transport} context: {cause:#}", file = .path.display())]
    LoadConfig {
        path: PathBuf,
        transport: Transport,
        cause: anyhow::Error,
    },

    #[error("failed to read trust anchor file ({file}) on {transport} context: {cause:#}", file = .path.display())]
    LoadTrustAnchor {
        path: PathBuf,
        transport: Transport,
        cause: anyhow::Error,
    },
}

/// Per query failures. Each of them is answered with SERVFAIL.
#[derive(Debug, Error)]
pub enum UnboundError {
    #[error("resolution failed: {0:#}")]
    Resolve(anyhow::Error),

    #[error("engine returned no answer")]
    NoAnswer,

    #[error("answer has no question section")]
    NoQuestion,

    /// Strict mode rejected an answer that failed validation.
    #[error("{0}")]
    Bogus(String),

    #[error("failed to prepare answer: {0:#}")]
    Sanitize(anyhow::Error),
}
