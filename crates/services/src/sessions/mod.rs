mod engine;
mod plan;
mod progress;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use engine::{EvaluationOutcome, NextStep, RevisionEngine, RevisionState, SessionStarted};
pub use plan::{CycleReset, PriorityFirstPolicy, RotationPolicy, SelectionPolicy, SessionPlan};
pub use progress::SessionProgress;
