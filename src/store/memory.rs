use super::{GradeFilter, GradeStore};
use crate::error::GradeError;
use crate::model::GradeRecord;
use serde_json::json;

/// Vec-backed store for exercising the service without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<GradeRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl GradeStore for MemoryStore {
    fn find(&self, id: &str) -> Result<Option<GradeRecord>, GradeError> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn find_where(&self, filter: &GradeFilter) -> Result<Vec<GradeRecord>, GradeError> {
        let mut out: Vec<GradeRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(&r.key))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            (
                &a.key.student_id,
                &a.key.class_id,
                &a.key.subject,
                &a.key.term,
                &a.key.academic_year,
            )
                .cmp(&(
                    &b.key.student_id,
                    &b.key.class_id,
                    &b.key.subject,
                    &b.key.term,
                    &b.key.academic_year,
                ))
        });
        Ok(out)
    }

    fn insert(&mut self, record: &GradeRecord) -> Result<(), GradeError> {
        if self
            .records
            .iter()
            .any(|r| r.id == record.id || r.key == record.key)
        {
            return Err(GradeError::storage("db_insert_failed", "duplicate grade record")
                .with_details(json!({ "gradeId": record.id })));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn update(&mut self, record: &GradeRecord) -> Result<(), GradeError> {
        let Some(slot) = self.records.iter_mut().find(|r| r.id == record.id) else {
            return Err(GradeError::not_found("grade record not found")
                .with_details(json!({ "gradeId": record.id })));
        };
        *slot = record.clone();
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), GradeError> {
        self.records.retain(|r| r.id != id);
        Ok(())
    }
}
