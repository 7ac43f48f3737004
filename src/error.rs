//! Error taxonomy for the ingestion pipeline.
//!
//! Quote errors are isolated per security; only persistence errors abort a
//! pipeline run.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single quote fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed quote payload: {0}")]
    Parse(String),

    /// The provider answered but had no bars for the requested range.
    #[error("no data for requested range")]
    Empty,
}

/// Coarse classification used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteErrorKind {
    Transport,
    Parse,
    Empty,
}

impl QuoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteErrorKind::Transport => "transport",
            QuoteErrorKind::Parse => "parse",
            QuoteErrorKind::Empty => "empty",
        }
    }
}

impl QuoteError {
    pub fn kind(&self) -> QuoteErrorKind {
        match self {
            QuoteError::Network(_) | QuoteError::Timeout(_) => QuoteErrorKind::Transport,
            QuoteError::Parse(_) => QuoteErrorKind::Parse,
            QuoteError::Empty => QuoteErrorKind::Empty,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == QuoteErrorKind::Transport
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured deadline
            QuoteError::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            QuoteError::Parse(err.to_string())
        } else {
            QuoteError::Network(err.to_string())
        }
    }
}

/// Failure reported by a storage collaborator.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl From<tokio_postgres::Error> for PersistenceError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            PersistenceError::Unavailable(err.to_string())
        } else {
            PersistenceError::Query(err.to_string())
        }
    }
}

/// Fatal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("persistence failure during {stage}: {source}")]
    Persistence {
        stage: &'static str,
        #[source]
        source: PersistenceError,
    },

    #[error("a pipeline run is already in progress")]
    AlreadyRunning,
}

impl PipelineError {
    pub fn persistence(stage: &'static str, source: PersistenceError) -> Self {
        PipelineError::Persistence { stage, source }
    }
}
