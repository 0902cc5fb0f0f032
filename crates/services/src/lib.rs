#![forbid(unsafe_code)]

pub mod config;
pub mod corpus_loader;
pub mod error;
pub mod sessions;

pub use revise_core::Clock;

pub use config::{RevisionConfig, SelectionPolicyKind};
pub use corpus_loader::{
    CorpusSource, FileCorpusSource, HttpCorpusSource, InlineCorpusSource, corpus_source_for,
    load_corpus, parse_corpus,
};
pub use error::{ConfigError, CorpusLoadError, SessionError};

pub use sessions::{
    CycleReset, EvaluationOutcome, NextStep, PriorityFirstPolicy, RevisionEngine, RevisionState,
    RotationPolicy, SelectionPolicy, SessionPlan, SessionProgress, SessionStarted,
};
