//! Shared error types for the services crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use revise_core::model::{EvaluationError, ScoreError};
use storage::StorageError;

/// Errors emitted while fetching or decoding the term corpus.
///
/// Any of these blocks revision entirely and must reach the learner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CorpusLoadError {
    #[error("corpus request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("cannot read corpus file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors emitted while reading revision configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("session size must be a positive integer, got {0:?}")]
    InvalidSessionSize(String),
    #[error("cooldown must be a non-negative number of milliseconds, got {0:?}")]
    InvalidCooldown(String),
    #[error("unknown selection policy {0:?} (expected \"priority\" or \"rotation\")")]
    UnknownPolicy(String),
}

/// Errors emitted by the revision session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no terms available for revision")]
    EmptyCorpus,
    #[error("answer cannot be blank")]
    BlankAnswer,
    #[error(transparent)]
    InvalidEvaluation(#[from] EvaluationError),
    #[error("no revision session in progress")]
    NotInSession,
    #[error("a revision session is already in progress")]
    AlreadyInSession,
    #[error("the current answer is waiting for a self-evaluation")]
    AwaitingEvaluation,
    #[error("no answer has been submitted for the current term")]
    NotAwaitingEvaluation,
    #[error("next term is not ready until {ready_at}")]
    CoolingDown { ready_at: DateTime<Utc> },
    #[error("session already completed")]
    Completed,
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
