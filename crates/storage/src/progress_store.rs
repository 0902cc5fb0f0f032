//! Persisted learner progress.
//!
//! Progress lives under two keys of a [`KeyValueStore`]:
//! - [`PROGRESS_KEY`]: `{ usedTerms, seenKeys, stats }` as JSON
//! - [`MASTERED_KEY`]: a JSON array of mastered term keys
//!
//! Older writers stored full term objects in `usedTerms` and had no `seenKeys`; both
//! forms are accepted on read. Each key decodes independently, so a corrupt entry
//! only loses its own data.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use revise_core::model::{EvaluationTally, ProgressState, TermKey};

use crate::repository::{KeyValueStore, StorageError};

pub const PROGRESS_KEY: &str = "ifsi_revision_progress";
pub const MASTERED_KEY: &str = "masteredTerms";

/// A stored progress entry could not be decoded.
///
/// Never surfaced past [`ProgressStore::load`], which logs it and starts the entry
/// fresh.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressDecodeError {
    #[error("stored entry {key:?} is corrupt: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecord {
    #[serde(default)]
    used_terms: Vec<UsedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seen_keys: Option<Vec<TermKey>>,
    #[serde(default)]
    stats: StatsRecord,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum UsedEntry {
    Key(TermKey),
    Term(LegacyTermRecord),
}

impl UsedEntry {
    fn into_key(self) -> TermKey {
        match self {
            UsedEntry::Key(key) => key,
            UsedEntry::Term(term) => TermKey::derive(&term.term, &term.ue),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyTermRecord {
    term: String,
    #[serde(default)]
    ue: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatsRecord {
    total_terms: u64,
    seen_terms: u64,
    correct_answers: u32,
    partial_answers: u32,
    wrong_answers: u32,
}

/// Serialized forms of a progress state, one string per store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedProgress {
    pub progress: String,
    pub mastered: String,
}

//
// ─── CODEC ─────────────────────────────────────────────────────────────────────
//

/// Encode progress into its two stored entries.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if JSON encoding fails.
pub fn encode_progress(state: &ProgressState) -> Result<EncodedProgress, StorageError> {
    let tally = state.tally();
    let record = ProgressRecord {
        used_terms: state.used().iter().cloned().map(UsedEntry::Key).collect(),
        seen_keys: Some(state.seen().cloned().collect()),
        stats: StatsRecord {
            total_terms: state.total_terms() as u64,
            seen_terms: state.seen_len() as u64,
            correct_answers: tally.correct,
            partial_answers: tally.partial,
            wrong_answers: tally.wrong,
        },
    };
    let mastered: Vec<&TermKey> = state.mastered().collect();

    Ok(EncodedProgress {
        progress: serde_json::to_string(&record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
        mastered: serde_json::to_string(&mastered)
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
    })
}

fn decode_record(raw: &str) -> Result<ProgressRecord, ProgressDecodeError> {
    serde_json::from_str(raw).map_err(|source| ProgressDecodeError::Corrupt {
        key: PROGRESS_KEY,
        source,
    })
}

fn decode_mastered(raw: &str) -> Result<Vec<TermKey>, ProgressDecodeError> {
    serde_json::from_str(raw).map_err(|source| ProgressDecodeError::Corrupt {
        key: MASTERED_KEY,
        source,
    })
}

/// Decode both stored entries, failing on the first corrupt one.
///
/// `None` means the entry was never written.
///
/// # Errors
///
/// Returns `ProgressDecodeError::Corrupt` naming the entry that failed.
pub fn decode_progress(
    progress: Option<&str>,
    mastered: Option<&str>,
) -> Result<ProgressState, ProgressDecodeError> {
    let record = progress.map(decode_record).transpose()?.unwrap_or_default();
    let mastered = mastered.map(decode_mastered).transpose()?.unwrap_or_default();
    Ok(assemble(record, mastered))
}

fn assemble(record: ProgressRecord, mastered: Vec<TermKey>) -> ProgressState {
    let used: Vec<TermKey> = record
        .used_terms
        .into_iter()
        .map(UsedEntry::into_key)
        .collect();
    // Older records did not track seen keys separately; everything used was seen.
    let seen = record.seen_keys.unwrap_or_else(|| used.clone());
    let tally = EvaluationTally {
        correct: record.stats.correct_answers,
        partial: record.stats.partial_answers,
        wrong: record.stats.wrong_answers,
    };
    let total_terms = usize::try_from(record.stats.total_terms).unwrap_or(usize::MAX);

    ProgressState::from_persisted(mastered, used, seen, tally, total_terms)
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Loads and saves [`ProgressState`] through a key-value backend.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load progress, treating absent or corrupt entries as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself cannot be read.
    pub async fn load(&self) -> Result<ProgressState, StorageError> {
        let progress_raw = self.kv.get(PROGRESS_KEY).await?;
        let mastered_raw = self.kv.get(MASTERED_KEY).await?;

        let record = match progress_raw.as_deref().map(decode_record).transpose() {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "discarding corrupt progress entry");
                ProgressRecord::default()
            }
        };
        let mastered = match mastered_raw.as_deref().map(decode_mastered).transpose() {
            Ok(keys) => keys.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "discarding corrupt mastery entry");
                Vec::new()
            }
        };

        let state = assemble(record, mastered);
        tracing::debug!(
            mastered = state.mastered_len(),
            used = state.used().len(),
            seen = state.seen_len(),
            "progress loaded"
        );
        Ok(state)
    }

    /// Overwrite both stored entries in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the backend write fails.
    pub async fn save(&self, state: &ProgressState) -> Result<(), StorageError> {
        let encoded = encode_progress(state)?;
        self.kv
            .put_many(&[
                (PROGRESS_KEY, encoded.progress),
                (MASTERED_KEY, encoded.mastered),
            ])
            .await
    }

    /// Delete both stored entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend delete fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove_many(&[PROGRESS_KEY, MASTERED_KEY]).await
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;
    use revise_core::model::{Evaluation, Term};

    fn store() -> (InMemoryKeyValueStore, ProgressStore) {
        let kv = InMemoryKeyValueStore::new();
        let store = ProgressStore::new(Arc::new(kv.clone()));
        (kv, store)
    }

    fn sample_state() -> ProgressState {
        let mut state = ProgressState::new();
        state.set_total_terms(3);
        let a = Term::new("Biofilm", "d", "3.10", "Micro").unwrap();
        let b = Term::new("Asepsie", "d", "2.10", "Infectio").unwrap();
        state.apply_evaluation(&a, Evaluation::Correct);
        state.apply_evaluation(&b, Evaluation::Partial);
        state
    }

    #[tokio::test]
    async fn empty_store_loads_default() {
        let (_, store) = store();
        assert_eq!(store.load().await.unwrap(), ProgressState::default());
    }

    #[tokio::test]
    async fn save_then_load_restores_state() {
        let (_, store) = store();
        let state = sample_state();
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn resaving_loaded_state_is_byte_identical() {
        let (kv, store) = store();
        store.save(&sample_state()).await.unwrap();
        let first = (
            kv.get(PROGRESS_KEY).await.unwrap(),
            kv.get(MASTERED_KEY).await.unwrap(),
        );

        let loaded = store.load().await.unwrap();
        store.save(&loaded).await.unwrap();
        let second = (
            kv.get(PROGRESS_KEY).await.unwrap(),
            kv.get(MASTERED_KEY).await.unwrap(),
        );

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn corrupt_progress_keeps_mastery() {
        let (kv, store) = store();
        kv.put(PROGRESS_KEY, "{not json".into()).await.unwrap();
        kv.put(MASTERED_KEY, r#"["biofilm_3.10"]"#.into())
            .await
            .unwrap();

        let state = store.load().await.unwrap();

        assert!(state.is_mastered(&TermKey::from_raw("biofilm_3.10")));
        assert!(state.used().is_empty());
        assert_eq!(state.tally(), EvaluationTally::default());
    }

    #[tokio::test]
    async fn corrupt_mastery_keeps_progress() {
        let (kv, store) = store();
        kv.put(
            PROGRESS_KEY,
            r#"{"usedTerms":["biofilm_3.10"],"stats":{"correctAnswers":4}}"#.into(),
        )
        .await
        .unwrap();
        kv.put(MASTERED_KEY, r#"{"oops":true}"#.into()).await.unwrap();

        let state = store.load().await.unwrap();

        assert_eq!(state.mastered_len(), 0);
        assert_eq!(state.used(), &[TermKey::from_raw("biofilm_3.10")]);
        assert_eq!(state.tally().correct, 4);
    }

    #[test]
    fn decode_reports_which_entry_is_corrupt() {
        let err = decode_progress(None, Some("[1, 2")).unwrap_err();
        assert!(matches!(
            err,
            ProgressDecodeError::Corrupt { key: MASTERED_KEY, .. }
        ));
    }

    #[test]
    fn decode_accepts_legacy_term_objects() {
        let legacy = r#"{
            "usedTerms": [
                {"term": "Biofilm", "definition": "x", "ue": "3.10", "courseTitle": "Micro"},
                {"term": "Système nerveux", "definition": "y", "ue": "2.2", "courseTitle": "Neuro"}
            ],
            "stats": {"totalTerms": 40, "seenTerms": 7, "correctAnswers": 3, "wrongAnswers": 4}
        }"#;

        let state = decode_progress(Some(legacy), Some(r#"["biofilm_3.10"]"#)).unwrap();

        assert_eq!(
            state.used(),
            &[
                TermKey::from_raw("biofilm_3.10"),
                TermKey::from_raw("système_nerveux_2.2")
            ]
        );
        assert_eq!(state.seen_len(), 2);
        assert_eq!(state.total_terms(), 40);
        assert_eq!(state.tally().correct, 3);
        assert_eq!(state.tally().partial, 0);
        assert_eq!(state.tally().wrong, 4);
        assert!(state.is_mastered(&TermKey::from_raw("biofilm_3.10")));
    }

    #[test]
    fn encoded_shape_is_stable() {
        let mut state = ProgressState::new();
        state.set_total_terms(2);
        let a = Term::new("Biofilm", "d", "3.10", "Micro").unwrap();
        state.apply_evaluation(&a, Evaluation::Correct);

        let encoded = encode_progress(&state).unwrap();

        assert_eq!(
            encoded.progress,
            r#"{"usedTerms":["biofilm_3.10"],"seenKeys":["biofilm_3.10"],"stats":{"totalTerms":2,"seenTerms":1,"correctAnswers":1,"partialAnswers":0,"wrongAnswers":0}}"#
        );
        assert_eq!(encoded.mastered, r#"["biofilm_3.10"]"#);
    }

    #[tokio::test]
    async fn clear_removes_both_entries() {
        let (kv, store) = store();
        store.save(&sample_state()).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(kv.get(PROGRESS_KEY).await.unwrap(), None);
        assert_eq!(kv.get(MASTERED_KEY).await.unwrap(), None);
    }
}
