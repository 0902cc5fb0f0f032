use thiserror::Error;

use crate::model::{EvaluationError, ScoreError, TermError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Term(#[from] TermError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}
