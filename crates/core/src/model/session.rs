use thiserror::Error;

use crate::model::{Evaluation, EvaluationTally, Term};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("cannot score a session without results")]
    Empty,

    #[error("too many results for a single session: {len}")]
    TooManyResults { len: usize },
}

/// One reviewed term: what was asked, what the learner wrote, how they rated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub term: Term,
    pub answer: String,
    pub evaluation: Evaluation,
}

impl SessionResult {
    #[must_use]
    pub fn new(term: Term, answer: impl Into<String>, evaluation: Evaluation) -> Self {
        Self {
            term,
            answer: answer.into(),
            evaluation,
        }
    }
}

/// Colour band of a session score on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// 80 % and above.
    Strong,
    /// 60 % to 79 %.
    Fair,
    /// Below 60 %.
    Weak,
}

impl ScoreBand {
    #[must_use]
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            80.. => Self::Strong,
            60..80 => Self::Fair,
            _ => Self::Weak,
        }
    }
}

/// Aggregate score for a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionScore {
    total: u32,
    tally: EvaluationTally,
    percentage: u32,
}

impl SessionScore {
    /// Score a finished session.
    ///
    /// `percentage = round(100 * (correct + partial / 2) / total)`, halves rounding up.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::Empty` when there are no results. A finished session
    /// always has at least one, so this indicates a bug upstream.
    pub fn from_results(results: &[SessionResult]) -> Result<Self, ScoreError> {
        let total = u32::try_from(results.len())
            .map_err(|_| ScoreError::TooManyResults { len: results.len() })?;
        Self::from_tally(results.iter().map(|r| r.evaluation).collect(), total)
    }

    fn from_tally(tally: EvaluationTally, total: u32) -> Result<Self, ScoreError> {
        if total == 0 {
            return Err(ScoreError::Empty);
        }

        let earned_halves = u64::from(tally.correct) * 2 + u64::from(tally.partial);
        let possible_halves = u64::from(total) * 2;
        // round-half-up of 100 * earned / possible
        let rounded = (200 * earned_halves + possible_halves) / (2 * possible_halves);
        let percentage = u32::try_from(rounded).unwrap_or(100);

        Ok(Self {
            total,
            tally,
            percentage,
        })
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.tally.correct
    }

    #[must_use]
    pub fn partial(&self) -> u32 {
        self.tally.partial
    }

    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.tally.wrong
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    #[must_use]
    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_percentage(self.percentage)
    }
}
