mod corpus;
mod evaluation;
mod progress;
mod session;
mod stats;
mod term;

pub use corpus::{Corpus, CorpusDocument, CourseEntry, DefinitionEntry};
pub use evaluation::{Evaluation, EvaluationError, EvaluationTally};
pub use progress::ProgressState;
pub use session::{ScoreBand, ScoreError, SessionResult, SessionScore};
pub use stats::GlobalStats;
pub use term::{TERM_KEY_SEPARATOR, Term, TermError, TermKey};
