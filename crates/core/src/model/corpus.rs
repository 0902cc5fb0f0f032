use serde::Deserialize;
use std::collections::HashSet;

use crate::model::term::{Term, TermKey};

//
// ─── WIRE SHAPE ────────────────────────────────────────────────────────────────
//

/// Top-level course export: `{ "courses": [[key, course], ...] }`.
///
/// Extra fields (export date, server-side stats) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusDocument {
    #[serde(default)]
    pub courses: Vec<(String, CourseEntry)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseEntry {
    #[serde(default)]
    pub ue: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub definitions: Vec<DefinitionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionEntry {
    pub term: String,
    #[serde(default)]
    pub definition: String,
}

//
// ─── CORPUS ────────────────────────────────────────────────────────────────────
//

/// Every term of every course, flattened in document order.
///
/// Keys are not unique: the same term may appear in several courses. Selection
/// treats each key as one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    terms: Vec<Term>,
    course_count: usize,
    skipped: usize,
}

impl Corpus {
    /// Flatten a course export into a corpus, keeping input order.
    ///
    /// Definitions with a blank term name cannot be revised; they are left out and
    /// counted in [`Corpus::skipped`].
    #[must_use]
    pub fn from_document(document: CorpusDocument) -> Self {
        let course_count = document.courses.len();
        let mut terms = Vec::new();
        let mut skipped = 0;

        for (_, course) in document.courses {
            for def in course.definitions {
                match Term::new(def.term, def.definition, course.ue.clone(), course.title.clone()) {
                    Ok(term) => terms.push(term),
                    Err(_) => skipped += 1,
                }
            }
        }

        Self {
            terms,
            course_count,
            skipped,
        }
    }

    #[must_use]
    pub fn from_terms(terms: Vec<Term>) -> Self {
        Self {
            terms,
            course_count: 0,
            skipped: 0,
        }
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[must_use]
    pub fn course_count(&self) -> usize {
        self.course_count
    }

    /// Definitions dropped while flattening because their term name was blank.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// One term per key, first occurrence wins, in corpus order.
    #[must_use]
    pub fn unique_terms(&self) -> Vec<&Term> {
        let mut seen: HashSet<&TermKey> = HashSet::with_capacity(self.terms.len());
        self.terms
            .iter()
            .filter(|term| seen.insert(term.key()))
            .collect()
    }

    #[must_use]
    pub fn find(&self, key: &TermKey) -> Option<&Term> {
        self.terms.iter().find(|term| term.key() == key)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
