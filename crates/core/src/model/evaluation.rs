use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Raised when something other than `correct`, `partial` or `wrong` is offered as a
/// self-evaluation. Callers that hit this have a bug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("invalid evaluation class: {0:?}")]
    Invalid(String),
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// The learner's self-assessment of one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    /// Answer matched the definition. Marks the term mastered.
    Correct,
    /// Answer was incomplete. The term stays a priority.
    Partial,
    /// Answer was wrong. The term stays a priority.
    Wrong,
}

impl Evaluation {
    pub const ALL: [Evaluation; 3] = [Self::Correct, Self::Partial, Self::Wrong];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Evaluation::Correct => "correct",
            Evaluation::Partial => "partial",
            Evaluation::Wrong => "wrong",
        }
    }

    /// Whether this evaluation marks the term as mastered.
    #[must_use]
    pub fn masters_term(self) -> bool {
        matches!(self, Evaluation::Correct)
    }

    /// Weight in the session score: 1 for correct, ½ for partial, 0 for wrong.
    /// Expressed in halves to keep scoring in integers.
    #[must_use]
    pub fn score_halves(self) -> u32 {
        match self {
            Evaluation::Correct => 2,
            Evaluation::Partial => 1,
            Evaluation::Wrong => 0,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Evaluation {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct" => Ok(Self::Correct),
            "partial" => Ok(Self::Partial),
            "wrong" => Ok(Self::Wrong),
            other => Err(EvaluationError::Invalid(other.to_string())),
        }
    }
}

//
// ─── TALLY ─────────────────────────────────────────────────────────────────────
//

/// Per-class evaluation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationTally {
    pub correct: u32,
    pub partial: u32,
    pub wrong: u32,
}

impl EvaluationTally {
    pub fn record(&mut self, evaluation: Evaluation) {
        let slot = match evaluation {
            Evaluation::Correct => &mut self.correct,
            Evaluation::Partial => &mut self.partial,
            Evaluation::Wrong => &mut self.wrong,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct
            .saturating_add(self.partial)
            .saturating_add(self.wrong)
    }
}

impl FromIterator<Evaluation> for EvaluationTally {
    fn from_iter<I: IntoIterator<Item = Evaluation>>(iter: I) -> Self {
        let mut tally = Self::default();
        for evaluation in iter {
            tally.record(evaluation);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_classes() {
        for evaluation in Evaluation::ALL {
            assert_eq!(evaluation.as_str().parse::<Evaluation>().unwrap(), evaluation);
        }
    }

    #[test]
    fn rejects_unknown_class() {
        let err = "Correct".parse::<Evaluation>().unwrap_err();
        assert_eq!(err, EvaluationError::Invalid("Correct".into()));
    }

    #[test]
    fn only_correct_masters() {
        assert!(Evaluation::Correct.masters_term());
        assert!(!Evaluation::Partial.masters_term());
        assert!(!Evaluation::Wrong.masters_term());
    }

    #[test]
    fn tally_counts_each_class() {
        let tally: EvaluationTally = [
            Evaluation::Correct,
            Evaluation::Partial,
            Evaluation::Wrong,
            Evaluation::Correct,
        ]
        .into_iter()
        .collect();
        assert_eq!(tally.correct, 2);
        assert_eq!(tally.partial, 1);
        assert_eq!(tally.wrong, 1);
        assert_eq!(tally.total(), 4);
    }
}
