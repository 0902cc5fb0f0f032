use rand::RngCore;
use rand::seq::SliceRandom;

use revise_core::model::{Corpus, ProgressState, Term};

use crate::config::SelectionPolicyKind;
use crate::error::SessionError;

/// Bookkeeping that has to be cleared before a plan is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleReset {
    /// Every term was mastered: forget mastery and start over.
    Mastery,
    /// Every term was used this rotation: clear the rotation list.
    Rotation,
}

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub terms: Vec<Term>,
    /// Terms taken from the primary pool (unmastered, or unused this rotation).
    pub priority_selected: usize,
    /// Already-mastered terms added to fill the session.
    pub padding_selected: usize,
    /// Set when the plan was built as if the given reset had already happened.
    pub cycle_reset: Option<CycleReset>,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Chooses the terms of the next session.
///
/// Implementations must not mutate the corpus or progress. When a plan needs a cycle
/// reset, they report it in [`SessionPlan::cycle_reset`] and the caller applies it.
/// Duplicate keys in the corpus count once.
pub trait SelectionPolicy: Send + Sync {
    fn kind(&self) -> SelectionPolicyKind;

    /// Build a plan of at most `limit` terms.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyCorpus` if the corpus has no terms.
    fn select(
        &self,
        corpus: &Corpus,
        progress: &ProgressState,
        limit: usize,
        rng: &mut dyn RngCore,
    ) -> Result<SessionPlan, SessionError>;
}

/// Unmastered terms first, padded with mastered ones.
///
/// Both partitions are shuffled independently. When every term is mastered the
/// mastery cycle restarts, so the whole corpus becomes priority again: a mastery
/// rate of 100% drops back to 0% at the next session start.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityFirstPolicy;

impl SelectionPolicy for PriorityFirstPolicy {
    fn kind(&self) -> SelectionPolicyKind {
        SelectionPolicyKind::PriorityFirst
    }

    fn select(
        &self,
        corpus: &Corpus,
        progress: &ProgressState,
        limit: usize,
        rng: &mut dyn RngCore,
    ) -> Result<SessionPlan, SessionError> {
        if corpus.is_empty() {
            return Err(SessionError::EmptyCorpus);
        }

        let (mut priority, mut mastered): (Vec<&Term>, Vec<&Term>) = corpus
            .unique_terms()
            .into_iter()
            .partition(|term| !progress.is_mastered(term.key()));

        let cycle_reset = if priority.is_empty() {
            priority = std::mem::take(&mut mastered);
            Some(CycleReset::Mastery)
        } else {
            None
        };

        priority.shuffle(rng);
        mastered.shuffle(rng);

        let mut terms: Vec<Term> = priority.into_iter().take(limit).cloned().collect();
        let priority_selected = terms.len();
        let needed = limit.saturating_sub(priority_selected);
        terms.extend(mastered.into_iter().take(needed).cloned());

        Ok(SessionPlan {
            priority_selected,
            padding_selected: terms.len() - priority_selected,
            terms,
            cycle_reset,
        })
    }
}

/// Each term once per cycle.
///
/// Terms not yet used this rotation are shuffled and taken up to the limit; there is
/// no padding, so the tail of a cycle yields a short session. Once every term has
/// been used the rotation list is cleared and the full corpus is available again.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationPolicy;

impl SelectionPolicy for RotationPolicy {
    fn kind(&self) -> SelectionPolicyKind {
        SelectionPolicyKind::Rotation
    }

    fn select(
        &self,
        corpus: &Corpus,
        progress: &ProgressState,
        limit: usize,
        rng: &mut dyn RngCore,
    ) -> Result<SessionPlan, SessionError> {
        if corpus.is_empty() {
            return Err(SessionError::EmptyCorpus);
        }

        let pool = corpus.unique_terms();
        let mut available: Vec<&Term> = pool
            .iter()
            .copied()
            .filter(|term| !progress.is_used(term.key()))
            .collect();

        let cycle_reset = if available.is_empty() {
            available = pool;
            Some(CycleReset::Rotation)
        } else {
            None
        };

        available.shuffle(rng);
        let terms: Vec<Term> = available.into_iter().take(limit).cloned().collect();

        Ok(SessionPlan {
            priority_selected: terms.len(),
            padding_selected: 0,
            terms,
            cycle_reset,
        })
    }
}
