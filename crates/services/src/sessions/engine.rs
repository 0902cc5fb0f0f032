use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;

use revise_core::Clock;
use revise_core::model::{
    Corpus, Evaluation, GlobalStats, ProgressState, SessionResult, SessionScore, Term,
};
use revise_core::time::Cooldown;
use storage::ProgressStore;

use super::plan::{CycleReset, SelectionPolicy};
use super::progress::SessionProgress;
use crate::config::{RevisionConfig, SelectionPolicyKind};
use crate::error::SessionError;

//
// ─── PUBLIC VIEWS ──────────────────────────────────────────────────────────────
//

/// Where the engine is in the revision flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionState {
    Idle,
    /// Waiting for an answer to the term at `index`.
    InSession { index: usize, total: usize },
    /// An answer was submitted for the term at `index`; waiting for a self-evaluation.
    AwaitingEvaluation { index: usize, total: usize },
    Finished { total: usize },
}

/// What `start_revision` selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStarted {
    pub total: usize,
    pub priority_selected: usize,
    pub padding_selected: usize,
    pub cycle_reset: Option<CycleReset>,
}

/// What comes after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Term { index: usize, total: usize },
    Finished(SessionScore),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub result: SessionResult,
    pub next: NextStep,
    /// When the next term (or the results) become interactive.
    pub ready_at: Option<DateTime<Utc>>,
}

//
// ─── INTERNAL PHASES ───────────────────────────────────────────────────────────
//

struct ActiveSession {
    terms: Vec<Term>,
    index: usize,
    results: Vec<SessionResult>,
    pending_answer: Option<String>,
    started_at: DateTime<Utc>,
}

struct FinishedSession {
    results: Vec<SessionResult>,
    score: SessionScore,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

enum Phase {
    Idle,
    Active(ActiveSession),
    Finished(FinishedSession),
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Owns the corpus, the learner's progress and the current session.
///
/// Every evaluation is written through to the [`ProgressStore`] before the session
/// advances, so abandoning a session never loses committed answers. If the write
/// fails, neither progress nor the session move and the evaluation can be retried.
pub struct RevisionEngine {
    corpus: Corpus,
    progress: ProgressState,
    store: ProgressStore,
    policy: Box<dyn SelectionPolicy>,
    config: RevisionConfig,
    clock: Clock,
    rng: Box<dyn RngCore + Send>,
    cooldown: Cooldown,
    phase: Phase,
}

impl RevisionEngine {
    /// Restore progress from `store` and get ready to revise `corpus`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store backend cannot be read. Corrupt
    /// stored progress is not an error; it loads as fresh progress.
    pub async fn open(
        corpus: Corpus,
        store: ProgressStore,
        config: RevisionConfig,
    ) -> Result<Self, SessionError> {
        let mut progress = store.load().await?;
        progress.set_total_terms(corpus.len());

        Ok(Self {
            corpus,
            progress,
            store,
            policy: config.policy().build(),
            config,
            clock: Clock::default_clock(),
            rng: Box::new(StdRng::from_os_rng()),
            cooldown: Cooldown::default(),
            phase: Phase::Idle,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the shuffle source, e.g. with a seeded generator in tests.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    //
    // ─── TRANSITIONS ──────────────────────────────────────────────────────────
    //

    /// Select a new session and present its first term.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyCorpus` if there is nothing to revise,
    /// `SessionError::AlreadyInSession` / `SessionError::Completed` outside `Idle`, and
    /// `SessionError::Storage` if a cycle reset cannot be persisted.
    pub async fn start_revision(&mut self) -> Result<SessionStarted, SessionError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Active(_) => return Err(SessionError::AlreadyInSession),
            Phase::Finished(_) => return Err(SessionError::Completed),
        }
        if self.corpus.is_empty() {
            tracing::warn!("cannot start revision: corpus is empty");
            return Err(SessionError::EmptyCorpus);
        }

        let plan = self.policy.select(
            &self.corpus,
            &self.progress,
            self.config.session_size(),
            self.rng.as_mut(),
        )?;

        if let Some(reset) = plan.cycle_reset {
            let mut next = self.progress.clone();
            match reset {
                CycleReset::Mastery => next.reset_mastery(),
                CycleReset::Rotation => next.reset_rotation(),
            }
            self.store.save(&next).await?;
            self.progress = next;
            tracing::info!(?reset, "selection cycle restarted");
        }

        if plan.is_empty() {
            return Err(SessionError::EmptyCorpus);
        }

        let started = SessionStarted {
            total: plan.total(),
            priority_selected: plan.priority_selected,
            padding_selected: plan.padding_selected,
            cycle_reset: plan.cycle_reset,
        };
        tracing::info!(
            policy = %self.policy.kind(),
            total = started.total,
            priority = started.priority_selected,
            padding = started.padding_selected,
            "revision session started"
        );

        self.cooldown.clear();
        self.phase = Phase::Active(ActiveSession {
            terms: plan.terms,
            index: 0,
            results: Vec::new(),
            pending_answer: None,
            started_at: self.clock.now(),
        });
        Ok(started)
    }

    /// Record the learner's answer for the current term. The answer is not scored;
    /// the definition can now be revealed for self-evaluation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::BlankAnswer` for an empty or whitespace-only answer,
    /// `SessionError::CoolingDown` while the previous transition is settling, and
    /// state errors when no term is waiting for an answer.
    pub fn submit_answer(&mut self, text: &str) -> Result<&Term, SessionError> {
        let now = self.clock.now();
        let session = match &mut self.phase {
            Phase::Active(session) => session,
            Phase::Idle => return Err(SessionError::NotInSession),
            Phase::Finished(_) => return Err(SessionError::Completed),
        };
        if session.pending_answer.is_some() {
            return Err(SessionError::AwaitingEvaluation);
        }
        if !self.cooldown.is_ready(now) {
            return Err(SessionError::CoolingDown {
                ready_at: self.cooldown.ready_at().unwrap_or(now),
            });
        }

        let answer = text.trim();
        if answer.is_empty() {
            return Err(SessionError::BlankAnswer);
        }
        session.pending_answer = Some(answer.to_string());
        session.terms.get(session.index).ok_or(SessionError::Completed)
    }

    /// Apply the learner's self-evaluation to the current term, persist progress and
    /// advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAwaitingEvaluation` if no answer was submitted and
    /// `SessionError::Storage` if progress cannot be persisted.
    pub async fn evaluate(
        &mut self,
        evaluation: Evaluation,
    ) -> Result<EvaluationOutcome, SessionError> {
        let (term, answer) = {
            let session = self.active_session()?;
            let Some(answer) = session.pending_answer.clone() else {
                return Err(SessionError::NotAwaitingEvaluation);
            };
            let term = session
                .terms
                .get(session.index)
                .cloned()
                .ok_or(SessionError::Completed)?;
            (term, answer)
        };

        let mut next = self.progress.clone();
        next.apply_evaluation(&term, evaluation);
        next.set_total_terms(self.corpus.len());
        self.store.save(&next).await?;
        self.progress = next;

        let now = self.clock.now();
        self.cooldown.start(now, self.config.cooldown());

        let Phase::Active(session) = &mut self.phase else {
            return Err(SessionError::NotInSession);
        };
        let result = SessionResult::new(term, answer, evaluation);
        session.pending_answer = None;
        session.results.push(result.clone());
        session.index += 1;
        let total = session.terms.len();
        tracing::debug!(
            term = %result.term.key(),
            %evaluation,
            position = session.index,
            total,
            "term evaluated"
        );

        let next = if session.index < total {
            NextStep::Term {
                index: session.index,
                total,
            }
        } else {
            let score = SessionScore::from_results(&session.results).inspect_err(|err| {
                tracing::error!(error = %err, "finished session could not be scored");
            })?;
            let Phase::Active(done) = std::mem::replace(&mut self.phase, Phase::Idle) else {
                return Err(SessionError::NotInSession);
            };
            tracing::info!(
                score = score.percentage(),
                correct = score.correct(),
                partial = score.partial(),
                wrong = score.wrong(),
                "revision session finished"
            );
            self.phase = Phase::Finished(FinishedSession {
                results: done.results,
                score,
                started_at: done.started_at,
                completed_at: now,
            });
            NextStep::Finished(score)
        };

        Ok(EvaluationOutcome {
            result,
            next,
            ready_at: self.cooldown.ready_at(),
        })
    }

    /// Like [`Self::evaluate`], for an evaluation class given as text.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidEvaluation` for anything other than `correct`,
    /// `partial` or `wrong`; the session does not change.
    pub async fn evaluate_class(
        &mut self,
        class: &str,
    ) -> Result<EvaluationOutcome, SessionError> {
        let evaluation = class.parse::<Evaluation>().inspect_err(|err| {
            tracing::error!(error = %err, "rejected evaluation class");
        })?;
        self.evaluate(evaluation).await
    }

    /// Leave the results (or an unfinished session) and return to `Idle`.
    ///
    /// Evaluations already made stay persisted.
    pub fn start_new_session(&mut self) {
        if let Phase::Active(session) = &self.phase {
            tracing::info!(
                answered = session.results.len(),
                total = session.terms.len(),
                "abandoning unfinished session"
            );
        }
        self.phase = Phase::Idle;
        self.cooldown.clear();
    }

    /// Forget all progress: mastery, rotation, seen terms and counters.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the cleared state cannot be persisted.
    pub async fn reset_progress(&mut self) -> Result<(), SessionError> {
        let mut next = ProgressState::new();
        next.set_total_terms(self.corpus.len());
        self.store.save(&next).await?;
        self.progress = next;
        tracing::info!("progress reset");
        Ok(())
    }

    //
    // ─── QUERIES ──────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn state(&self) -> RevisionState {
        match &self.phase {
            Phase::Idle => RevisionState::Idle,
            Phase::Active(session) => {
                let index = session.index;
                let total = session.terms.len();
                if session.pending_answer.is_some() {
                    RevisionState::AwaitingEvaluation { index, total }
                } else {
                    RevisionState::InSession { index, total }
                }
            }
            Phase::Finished(done) => RevisionState::Finished {
                total: done.results.len(),
            },
        }
    }

    #[must_use]
    pub fn current_term(&self) -> Option<&Term> {
        match &self.phase {
            Phase::Active(session) => session.terms.get(session.index),
            _ => None,
        }
    }

    #[must_use]
    pub fn pending_answer(&self) -> Option<&str> {
        match &self.phase {
            Phase::Active(session) => session.pending_answer.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn session_progress(&self) -> Option<SessionProgress> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Active(session) => {
                let total = session.terms.len();
                Some(SessionProgress {
                    position: (session.index + 1).min(total),
                    total,
                    answered: session.results.len(),
                    remaining: total.saturating_sub(session.index),
                    is_complete: false,
                })
            }
            Phase::Finished(done) => {
                let total = done.results.len();
                Some(SessionProgress {
                    position: total,
                    total,
                    answered: total,
                    remaining: 0,
                    is_complete: true,
                })
            }
        }
    }

    /// Results so far in the active session, or all results of the finished one.
    #[must_use]
    pub fn results(&self) -> &[SessionResult] {
        match &self.phase {
            Phase::Idle => &[],
            Phase::Active(session) => &session.results,
            Phase::Finished(done) => &done.results,
        }
    }

    #[must_use]
    pub fn score(&self) -> Option<SessionScore> {
        match &self.phase {
            Phase::Finished(done) => Some(done.score),
            _ => None,
        }
    }

    /// Results of the finished session for side-by-side review.
    #[must_use]
    pub fn review(&self) -> Option<&[SessionResult]> {
        match &self.phase {
            Phase::Finished(done) => Some(&done.results),
            _ => None,
        }
    }

    /// Start and end time of the finished session.
    #[must_use]
    pub fn finished_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match &self.phase {
            Phase::Finished(done) => Some((done.started_at, done.completed_at)),
            _ => None,
        }
    }

    /// Whether the current term accepts an answer right now.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        matches!(self.state(), RevisionState::InSession { .. })
            && self.cooldown.is_ready(self.clock.now())
    }

    #[must_use]
    pub fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.cooldown.ready_at()
    }

    /// Dashboard figures, computed from the current corpus and progress.
    #[must_use]
    pub fn stats(&self) -> GlobalStats {
        GlobalStats::compute(&self.corpus, &self.progress)
    }

    #[must_use]
    pub fn is_mastered(&self, term: &Term) -> bool {
        self.progress.is_mastered(term.key())
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[must_use]
    pub fn policy_kind(&self) -> SelectionPolicyKind {
        self.policy.kind()
    }

    fn active_session(&self) -> Result<&ActiveSession, SessionError> {
        match &self.phase {
            Phase::Active(session) => Ok(session),
            Phase::Idle => Err(SessionError::NotInSession),
            Phase::Finished(_) => Err(SessionError::Completed),
        }
    }
}

impl fmt::Debug for RevisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionEngine")
            .field("corpus_len", &self.corpus.len())
            .field("policy", &self.policy.kind())
            .field("state", &self.state())
            .field("mastered", &self.progress.mastered_len())
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
