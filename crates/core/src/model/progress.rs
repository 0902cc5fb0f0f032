use std::collections::BTreeSet;

use crate::model::evaluation::{Evaluation, EvaluationTally};
use crate::model::term::{Term, TermKey};

/// Durable learning progress across sessions.
///
/// Holds both bookkeeping shapes the selection policies rely on:
/// - the mastery set: keys answered correctly last time they were seen
/// - the rotation list: keys already used in the current cycle, in use order
///
/// plus the distinct keys ever evaluated and cumulative evaluation counters.
/// `total_terms` mirrors the corpus size at the time of the last save so the persisted
/// figures are readable without the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    mastered: BTreeSet<TermKey>,
    used: Vec<TermKey>,
    seen: BTreeSet<TermKey>,
    tally: EvaluationTally,
    total_terms: usize,
}

impl ProgressState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate progress from persisted parts.
    ///
    /// Duplicate keys in `used` are dropped, keeping the first occurrence.
    #[must_use]
    pub fn from_persisted(
        mastered: impl IntoIterator<Item = TermKey>,
        used: impl IntoIterator<Item = TermKey>,
        seen: impl IntoIterator<Item = TermKey>,
        tally: EvaluationTally,
        total_terms: usize,
    ) -> Self {
        let mut state = Self {
            mastered: mastered.into_iter().collect(),
            seen: seen.into_iter().collect(),
            tally,
            total_terms,
            ..Self::default()
        };
        for key in used {
            state.push_used(key);
        }
        state
    }

    //
    // ─── MASTERY SET ──────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn is_mastered(&self, key: &TermKey) -> bool {
        self.mastered.contains(key)
    }

    /// Returns true if the key was not mastered before.
    pub fn mark_mastered(&mut self, key: &TermKey) -> bool {
        self.mastered.insert(key.clone())
    }

    /// Returns true if the key was mastered before.
    pub fn mark_unmastered(&mut self, key: &TermKey) -> bool {
        self.mastered.remove(key)
    }

    pub fn mastered(&self) -> impl Iterator<Item = &TermKey> {
        self.mastered.iter()
    }

    #[must_use]
    pub fn mastered_len(&self) -> usize {
        self.mastered.len()
    }

    /// Forget every mastery mark, starting a new mastery cycle.
    pub fn reset_mastery(&mut self) {
        self.mastered.clear();
    }

    //
    // ─── ROTATION ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn is_used(&self, key: &TermKey) -> bool {
        self.used.contains(key)
    }

    #[must_use]
    pub fn used(&self) -> &[TermKey] {
        &self.used
    }

    /// Clear the rotation list, starting a new rotation cycle.
    pub fn reset_rotation(&mut self) {
        self.used.clear();
    }

    fn push_used(&mut self, key: TermKey) {
        if !self.used.contains(&key) {
            self.used.push(key);
        }
    }

    /// Record that `key` was evaluated: appends it to the rotation list (once per
    /// cycle), adds it to the seen set and bumps the counter for `evaluation`.
    pub fn record_seen(&mut self, key: &TermKey, evaluation: Evaluation) {
        self.push_used(key.clone());
        self.seen.insert(key.clone());
        self.tally.record(evaluation);
    }

    //
    // ─── EVALUATIONS ──────────────────────────────────────────────────────────
    //

    /// Apply one self-evaluation: toggle mastery and record the term as seen.
    pub fn apply_evaluation(&mut self, term: &Term, evaluation: Evaluation) {
        if evaluation.masters_term() {
            self.mark_mastered(term.key());
        } else {
            self.mark_unmastered(term.key());
        }
        self.record_seen(term.key(), evaluation);
    }

    #[must_use]
    pub fn has_seen(&self, key: &TermKey) -> bool {
        self.seen.contains(key)
    }

    pub fn seen(&self) -> impl Iterator<Item = &TermKey> {
        self.seen.iter()
    }

    #[must_use]
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn tally(&self) -> EvaluationTally {
        self.tally
    }

    #[must_use]
    pub fn total_terms(&self) -> usize {
        self.total_terms
    }

    pub fn set_total_terms(&mut self, total: usize) {
        self.total_terms = total;
    }

    /// Drop everything except the corpus size mirror.
    pub fn reset_all(&mut self) {
        *self = Self {
            total_terms: self.total_terms,
            ..Self::default()
        };
    }
}
