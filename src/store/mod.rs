//! Persistence seam for grade records.
//!
//! The service layer only talks to [`GradeStore`]; the SQLite workspace
//! database and the in-memory test store both implement it.

#[cfg(test)]
mod memory;
mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::{in_transaction, SqliteStore};

use crate::error::GradeError;
use crate::model::{GradeKey, GradeRecord, RankScope};

/// Conjunctive filter over the composite key; `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeFilter {
    pub student_id: Option<String>,
    pub class_id: Option<String>,
    pub subject: Option<String>,
    pub term: Option<String>,
    pub academic_year: Option<String>,
}

impl GradeFilter {
    pub fn for_key(key: &GradeKey) -> Self {
        Self {
            student_id: Some(key.student_id.clone()),
            class_id: Some(key.class_id.clone()),
            subject: Some(key.subject.clone()),
            term: Some(key.term.clone()),
            academic_year: Some(key.academic_year.clone()),
        }
    }

    pub fn for_scope(scope: &RankScope) -> Self {
        Self {
            student_id: None,
            class_id: Some(scope.class_id.clone()),
            subject: Some(scope.subject.clone()),
            term: Some(scope.term.clone()),
            academic_year: Some(scope.academic_year.clone()),
        }
    }

    pub fn for_student_term(student_id: &str, term: &str, academic_year: &str) -> Self {
        Self {
            student_id: Some(student_id.to_string()),
            class_id: None,
            subject: None,
            term: Some(term.to_string()),
            academic_year: Some(academic_year.to_string()),
        }
    }

    #[cfg(test)]
    pub fn matches(&self, key: &GradeKey) -> bool {
        fn field_ok(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map(|w| w == have).unwrap_or(true)
        }
        field_ok(&self.student_id, &key.student_id)
            && field_ok(&self.class_id, &key.class_id)
            && field_ok(&self.subject, &key.subject)
            && field_ok(&self.term, &key.term)
            && field_ok(&self.academic_year, &key.academic_year)
    }
}

pub trait GradeStore {
    fn find(&self, id: &str) -> Result<Option<GradeRecord>, GradeError>;

    /// Records matching `filter`, ordered by
    /// (student, class, subject, term, academic year).
    fn find_where(&self, filter: &GradeFilter) -> Result<Vec<GradeRecord>, GradeError>;

    fn insert(&mut self, record: &GradeRecord) -> Result<(), GradeError>;

    /// Replace the stored record (entries included) with `record`.
    fn update(&mut self, record: &GradeRecord) -> Result<(), GradeError>;

    fn delete(&mut self, id: &str) -> Result<(), GradeError>;

    fn find_by_key(&self, key: &GradeKey) -> Result<Option<GradeRecord>, GradeError> {
        Ok(self.find_where(&GradeFilter::for_key(key))?.into_iter().next())
    }
}
