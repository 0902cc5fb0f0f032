use crate::model::{Corpus, EvaluationTally, ProgressState};

/// Dashboard figures derived from the corpus and the learner's progress.
///
/// Always computed fresh; nothing here is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalStats {
    pub total_terms: usize,
    pub mastered_terms: usize,
    pub priority_terms: usize,
    pub seen_terms: usize,
    pub mastery_rate: u32,
    pub evaluations: EvaluationTally,
}

impl GlobalStats {
    /// Counts run over the corpus as loaded, so a term listed in two courses counts twice.
    #[must_use]
    pub fn compute(corpus: &Corpus, progress: &ProgressState) -> Self {
        let total_terms = corpus.len();
        let mastered_terms = corpus
            .iter()
            .filter(|term| progress.is_mastered(term.key()))
            .count();
        let seen_terms = corpus
            .iter()
            .filter(|term| progress.has_seen(term.key()))
            .count();

        Self {
            total_terms,
            mastered_terms,
            priority_terms: total_terms - mastered_terms,
            seen_terms,
            mastery_rate: percentage(mastered_terms, total_terms),
            evaluations: progress.tally(),
        }
    }
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let rounded = (200 * part + whole) / (2 * whole);
    u32::try_from(rounded).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Evaluation, Term};

    fn corpus(n: usize) -> Corpus {
        Corpus::from_terms(
            (0..n)
                .map(|i| Term::new(format!("T{i}"), "def", "1.1", "Course").unwrap())
                .collect(),
        )
    }

    #[test]
    fn empty_corpus_has_zero_rate() {
        let stats = GlobalStats::compute(&Corpus::default(), &ProgressState::new());
        assert_eq!(stats.total_terms, 0);
        assert_eq!(stats.mastery_rate, 0);
    }

    #[test]
    fn counts_mastered_seen_and_priority() {
        let corpus = corpus(3);
        let mut progress = ProgressState::new();
        progress.apply_evaluation(&corpus.terms()[0], Evaluation::Correct);
        progress.apply_evaluation(&corpus.terms()[1], Evaluation::Partial);

        let stats = GlobalStats::compute(&corpus, &progress);

        assert_eq!(stats.total_terms, 3);
        assert_eq!(stats.mastered_terms, 1);
        assert_eq!(stats.priority_terms, 2);
        assert_eq!(stats.seen_terms, 2);
        assert_eq!(stats.mastery_rate, 33);
        assert_eq!(stats.evaluations.partial, 1);
    }

    #[test]
    fn recomputes_after_mutation() {
        let corpus = corpus(2);
        let mut progress = ProgressState::new();
        let before = GlobalStats::compute(&corpus, &progress);

        progress.apply_evaluation(&corpus.terms()[0], Evaluation::Correct);
        let after = GlobalStats::compute(&corpus, &progress);

        assert_eq!(before.mastered_terms, 0);
        assert_eq!(after.mastered_terms, 1);
        assert_eq!(after.mastery_rate, 50);
    }

    #[test]
    fn ignores_mastery_for_terms_outside_corpus() {
        let corpus = corpus(1);
        let mut progress = ProgressState::new();
        progress.mark_mastered(&crate::model::TermKey::from_raw("gone_9.9"));

        let stats = GlobalStats::compute(&corpus, &progress);
        assert_eq!(stats.mastered_terms, 0);
    }
}
