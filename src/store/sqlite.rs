use super::{GradeFilter, GradeStore};
use crate::error::{db_err, GradeError};
use crate::model::{
    Category, Derived, GradeKey, GradeRecord, LetterGrade, PassStatus, Rank, ScoreEntry,
    ScoreKind, Weights,
};
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const RECORD_COLUMNS: &str = "id, student_id, class_id, subject, term, academic_year,
    class_weight, exam_weight, class_percentage, exam_percentage, total_score,
    max_total_score, percentage, letter_grade, grade_point, status,
    rank_position, rank_total, created_at, updated_at";

pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn load_entries(
        &self,
        record_ids: &[String],
    ) -> Result<HashMap<String, (Vec<ScoreEntry>, Vec<ScoreEntry>)>, GradeError> {
        let mut out: HashMap<String, (Vec<ScoreEntry>, Vec<ScoreEntry>)> = HashMap::new();
        if record_ids.is_empty() {
            return Ok(out);
        }

        let placeholders = std::iter::repeat("?")
            .take(record_ids.len())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "SELECT grade_record_id, kind, id, category, title, score, max_score, date, comment
             FROM score_entries
             WHERE grade_record_id IN ({})
             ORDER BY grade_record_id, kind, sort_order",
            placeholders
        );
        let bind_values: Vec<Value> = record_ids.iter().map(|id| Value::Text(id.clone())).collect();

        let mut stmt = self.conn.prepare(&sql).map_err(db_err("db_query_failed"))?;
        let rows = stmt
            .query_map(params_from_iter(bind_values), |r| {
                let record_id: String = r.get(0)?;
                let kind = parse_text(r, 1, ScoreKind::parse)?;
                let entry = ScoreEntry {
                    id: r.get(2)?,
                    category: parse_text(r, 3, Category::parse)?,
                    title: r.get(4)?,
                    score: r.get(5)?,
                    max_score: r.get(6)?,
                    date: r.get(7)?,
                    comment: r.get(8)?,
                };
                Ok((record_id, kind, entry))
            })
            .map_err(db_err("db_query_failed"))?;

        for row in rows {
            let (record_id, kind, entry) = row.map_err(db_err("db_query_failed"))?;
            let slot = out.entry(record_id).or_default();
            match kind {
                ScoreKind::Class => slot.0.push(entry),
                ScoreKind::Exam => slot.1.push(entry),
            }
        }
        Ok(out)
    }

    fn attach_entries(&self, mut records: Vec<GradeRecord>) -> Result<Vec<GradeRecord>, GradeError> {
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut entries = self.load_entries(&ids)?;
        for r in &mut records {
            if let Some((class_scores, exam_scores)) = entries.remove(&r.id) {
                r.class_scores = class_scores;
                r.exam_scores = exam_scores;
            }
        }
        Ok(records)
    }

    fn insert_entries(&self, record: &GradeRecord) -> Result<(), GradeError> {
        let mut stmt = self
            .conn
            .prepare(
                "INSERT INTO score_entries(
                    id, grade_record_id, kind, sort_order, category, title,
                    score, max_score, date, comment
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .map_err(db_err("db_insert_failed"))?;
        for kind in [ScoreKind::Class, ScoreKind::Exam] {
            for (i, e) in record.entries(kind).iter().enumerate() {
                stmt.execute((
                    &e.id,
                    &record.id,
                    kind.as_str(),
                    i as i64,
                    e.category.as_str(),
                    &e.title,
                    e.score,
                    e.max_score,
                    &e.date,
                    &e.comment,
                ))
                .map_err(|err| {
                    GradeError::storage("db_insert_failed", err.to_string())
                        .with_details(serde_json::json!({ "table": "score_entries" }))
                })?;
            }
        }
        Ok(())
    }
}

fn parse_text<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{}'", raw).into(),
        )
    })
}

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<GradeRecord> {
    let rank_position: Option<u32> = r.get(16)?;
    let rank_total: Option<u32> = r.get(17)?;
    Ok(GradeRecord {
        id: r.get(0)?,
        key: GradeKey {
            student_id: r.get(1)?,
            class_id: r.get(2)?,
            subject: r.get(3)?,
            term: r.get(4)?,
            academic_year: r.get(5)?,
        },
        class_scores: Vec::new(),
        exam_scores: Vec::new(),
        weights: Weights {
            class_weight: r.get(6)?,
            exam_weight: r.get(7)?,
        },
        derived: Derived {
            class_percentage: r.get(8)?,
            exam_percentage: r.get(9)?,
            total_score: r.get(10)?,
            max_total_score: r.get(11)?,
            percentage: r.get(12)?,
            letter_grade: parse_text(r, 13, LetterGrade::parse)?,
            grade_point: r.get(14)?,
            status: parse_text(r, 15, PassStatus::parse)?,
        },
        rank: match (rank_position, rank_total) {
            (Some(position), Some(total_students)) => Some(Rank {
                position,
                total_students,
            }),
            _ => None,
        },
        created_at: r.get(18)?,
        updated_at: r.get(19)?,
    })
}

impl GradeStore for SqliteStore<'_> {
    fn find(&self, id: &str) -> Result<Option<GradeRecord>, GradeError> {
        let sql = format!("SELECT {} FROM grade_records WHERE id = ?", RECORD_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, [id], record_from_row)
            .optional()
            .map_err(db_err("db_query_failed"))?;
        match record {
            Some(r) => Ok(self.attach_entries(vec![r])?.into_iter().next()),
            None => Ok(None),
        }
    }

    fn find_where(&self, filter: &GradeFilter) -> Result<Vec<GradeRecord>, GradeError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        for (column, want) in [
            ("student_id = ?", &filter.student_id),
            ("class_id = ?", &filter.class_id),
            ("subject = ?", &filter.subject),
            ("term = ?", &filter.term),
            ("academic_year = ?", &filter.academic_year),
        ] {
            if let Some(v) = want {
                clauses.push(column);
                bind_values.push(Value::Text(v.clone()));
            }
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM grade_records {}
             ORDER BY student_id, class_id, subject, term, academic_year",
            RECORD_COLUMNS, where_sql
        );

        let mut stmt = self.conn.prepare(&sql).map_err(db_err("db_query_failed"))?;
        let records = stmt
            .query_map(params_from_iter(bind_values), record_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(db_err("db_query_failed"))?;
        self.attach_entries(records)
    }

    fn insert(&mut self, record: &GradeRecord) -> Result<(), GradeError> {
        let sql = format!(
            "INSERT INTO grade_records({})
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            RECORD_COLUMNS
        );
        let d = &record.derived;
        self.conn
            .execute(
                &sql,
                rusqlite::params![
                    record.id,
                    record.key.student_id,
                    record.key.class_id,
                    record.key.subject,
                    record.key.term,
                    record.key.academic_year,
                    record.weights.class_weight,
                    record.weights.exam_weight,
                    d.class_percentage,
                    d.exam_percentage,
                    d.total_score,
                    d.max_total_score,
                    d.percentage,
                    d.letter_grade.as_str(),
                    d.grade_point,
                    d.status.as_str(),
                    record.rank.map(|k| k.position),
                    record.rank.map(|k| k.total_students),
                    record.created_at,
                    record.updated_at,
                ],
            )
            .map_err(|e| {
                GradeError::storage("db_insert_failed", e.to_string())
                    .with_details(serde_json::json!({ "table": "grade_records" }))
            })?;
        self.insert_entries(record)
    }

    fn update(&mut self, record: &GradeRecord) -> Result<(), GradeError> {
        let d = &record.derived;
        let changed = self
            .conn
            .execute(
                "UPDATE grade_records SET
                    class_weight = ?, exam_weight = ?,
                    class_percentage = ?, exam_percentage = ?,
                    total_score = ?, max_total_score = ?, percentage = ?,
                    letter_grade = ?, grade_point = ?, status = ?,
                    rank_position = ?, rank_total = ?, updated_at = ?
                 WHERE id = ?",
                rusqlite::params![
                    record.weights.class_weight,
                    record.weights.exam_weight,
                    d.class_percentage,
                    d.exam_percentage,
                    d.total_score,
                    d.max_total_score,
                    d.percentage,
                    d.letter_grade.as_str(),
                    d.grade_point,
                    d.status.as_str(),
                    record.rank.map(|k| k.position),
                    record.rank.map(|k| k.total_students),
                    record.updated_at,
                    record.id,
                ],
            )
            .map_err(db_err("db_update_failed"))?;
        if changed == 0 {
            return Err(GradeError::not_found("grade record not found")
                .with_details(serde_json::json!({ "gradeId": record.id })));
        }

        self.conn
            .execute(
                "DELETE FROM score_entries WHERE grade_record_id = ?",
                [&record.id],
            )
            .map_err(db_err("db_update_failed"))?;
        self.insert_entries(record)
    }

    fn delete(&mut self, id: &str) -> Result<(), GradeError> {
        self.conn
            .execute("DELETE FROM score_entries WHERE grade_record_id = ?", [id])
            .map_err(db_err("db_delete_failed"))?;
        self.conn
            .execute("DELETE FROM grade_records WHERE id = ?", [id])
            .map_err(db_err("db_delete_failed"))?;
        Ok(())
    }
}

/// Run `f` against a store bound to one transaction; any error rolls the
/// whole mutation back.
pub fn in_transaction<T>(
    conn: &mut Connection,
    f: impl FnOnce(&mut SqliteStore<'_>) -> Result<T, GradeError>,
) -> Result<T, GradeError> {
    let tx = conn.transaction().map_err(db_err("db_tx_failed"))?;
    let out = {
        let mut store = SqliteStore::new(&tx);
        f(&mut store)?
    };
    tx.commit().map_err(db_err("db_tx_failed"))?;
    Ok(out)
}
