use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TermError {
    #[error("term name cannot be empty")]
    EmptyName,
}

//
// ─── TERM KEY ──────────────────────────────────────────────────────────────────
//

/// Separator between the normalised term name and UE code.
pub const TERM_KEY_SEPARATOR: char = '_';

/// Mastery-tracking identity of a term.
///
/// Derived from the term name and its UE: each part is trimmed, inner whitespace runs
/// collapse to `_`, everything is lowercased, and the parts are joined by
/// [`TERM_KEY_SEPARATOR`]. Persisted progress refers to terms by this key, so the
/// derivation must never change.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermKey(String);

impl TermKey {
    /// Derive the key for a `(term, ue)` pair.
    #[must_use]
    pub fn derive(term: &str, ue: &str) -> Self {
        let mut key = normalize_part(term);
        key.push(TERM_KEY_SEPARATOR);
        key.push_str(&normalize_part(ue));
        Self(key)
    }

    /// Wrap a key that was already derived, e.g. one read back from storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_part(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

impl fmt::Debug for TermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermKey({})", self.0)
    }
}

impl fmt::Display for TermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── TERM ──────────────────────────────────────────────────────────────────────
//

/// A vocabulary flashcard: a term, its definition, and where it comes from.
///
/// Terms are immutable once built; the key is computed up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    key: TermKey,
    name: String,
    definition: String,
    ue: String,
    course_title: String,
}

impl Term {
    /// Build a term.
    ///
    /// # Errors
    ///
    /// Returns `TermError::EmptyName` if the term name is blank.
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        ue: impl Into<String>,
        course_title: impl Into<String>,
    ) -> Result<Self, TermError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TermError::EmptyName);
        }
        let ue = ue.into();
        Ok(Self {
            key: TermKey::derive(&name, &ue),
            name,
            definition: definition.into(),
            ue,
            course_title: course_title.into(),
        })
    }

    #[must_use]
    pub fn key(&self) -> &TermKey {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn ue(&self) -> &str {
        &self.ue
    }

    #[must_use]
    pub fn course_title(&self) -> &str {
        &self.course_title
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
