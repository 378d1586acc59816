//! Grade operations shared by the sidecar and HTTP transports.
//!
//! Every mutation follows the same path: validate, load (or lazily create)
//! the record, apply the change, re-derive the record, persist it, then
//! re-rank its whole sibling set. Callers wrap each call in one store
//! transaction so a failure at any step leaves nothing behind.

use crate::calc;
use crate::error::GradeError;
use crate::model::{
    Category, GradeKey, GradeRecord, LetterGrade, RankScope, ReportSummary, ScoreEntry,
    ScoreKind, Weights,
};
use crate::rank::{self, TieRule};
use crate::report;
use crate::settings::GradingSettings;
use crate::store::{GradeFilter, GradeStore};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn record_not_found(grade_id: &str) -> GradeError {
    GradeError::not_found("grade record not found").with_details(json!({ "gradeId": grade_id }))
}

fn load_record<S: GradeStore>(store: &S, grade_id: &str) -> Result<GradeRecord, GradeError> {
    store.find(grade_id)?.ok_or_else(|| record_not_found(grade_id))
}

/// Partial update for a single score entry; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScorePatch {
    pub category: Option<Category>,
    pub title: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub date: Option<String>,
    /// `Some(None)` clears the comment.
    pub comment: Option<Option<String>>,
}

impl ScorePatch {
    fn apply(&self, entry: &mut ScoreEntry) {
        if let Some(c) = self.category {
            entry.category = c;
        }
        if let Some(t) = &self.title {
            entry.title = t.clone();
        }
        if let Some(s) = self.score {
            entry.score = s;
        }
        if let Some(m) = self.max_score {
            entry.max_score = m;
        }
        if let Some(d) = &self.date {
            entry.date = d.clone();
        }
        if let Some(c) = &self.comment {
            entry.comment = c.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreRemoval {
    Updated(GradeRecord),
    /// The removed entry was the last one, so the record went with it.
    RecordDeleted { grade_id: String },
}

impl ScoreRemoval {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Updated(record) => json!(record),
            Self::RecordDeleted { grade_id } => json!({ "gradeId": grade_id, "deleted": true }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub grade_id: String,
    pub student_id: String,
    pub percentage: f64,
    pub letter_grade: LetterGrade,
    pub grade_point: f64,
    pub position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRanking {
    #[serde(flatten)]
    pub scope: RankScope,
    pub total_students: usize,
    pub rankings: Vec<RankingRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeOutcome {
    pub recomputed: usize,
    pub rederived: usize,
    pub reranked: usize,
}

/// Re-rank every record in `scope`, persisting only the ranks that moved.
/// Returns the set in standing order.
fn rerank_scope<S: GradeStore>(
    store: &mut S,
    scope: &RankScope,
    rule: TieRule,
) -> Result<(Vec<GradeRecord>, usize), GradeError> {
    let mut siblings = store.find_where(&GradeFilter::for_scope(scope))?;
    let changed: HashSet<String> = rank::rank_siblings(&mut siblings, rule).into_iter().collect();
    for r in siblings.iter().filter(|r| changed.contains(&r.id)) {
        store.update(r)?;
    }
    tracing::debug!(
        class_id = %scope.class_id,
        subject = %scope.subject,
        term = %scope.term,
        academic_year = %scope.academic_year,
        size = siblings.len(),
        moved = changed.len(),
        "re-ranked sibling set"
    );
    Ok((siblings, changed.len()))
}

/// Re-rank every sibling set in the store under `rule`. Returns how many
/// records moved.
pub fn rerank_all<S: GradeStore>(store: &mut S, rule: TieRule) -> Result<usize, GradeError> {
    let mut seen = HashSet::new();
    let scopes: Vec<RankScope> = store
        .find_where(&GradeFilter::default())?
        .into_iter()
        .map(|r| r.key.scope())
        .filter(|scope| seen.insert(scope.clone()))
        .collect();
    let mut moved = 0;
    for scope in &scopes {
        moved += rerank_scope(store, scope, rule)?.1;
    }
    Ok(moved)
}

/// Persist a re-derived record and return it with its fresh rank.
fn save_and_rerank<S: GradeStore>(
    store: &mut S,
    record: GradeRecord,
    is_new: bool,
    rule: TieRule,
) -> Result<GradeRecord, GradeError> {
    if is_new {
        store.insert(&record)?;
    } else {
        store.update(&record)?;
    }
    let (siblings, _) = rerank_scope(store, &record.key.scope(), rule)?;
    siblings
        .into_iter()
        .find(|r| r.id == record.id)
        .ok_or_else(|| record_not_found(&record.id))
}

fn audit(operation: &str, record: &GradeRecord) {
    tracing::info!(
        target: "gradebook_audit",
        operation,
        grade_id = %record.id,
        student_id = %record.key.student_id,
        class_id = %record.key.class_id,
        subject = %record.key.subject,
        percentage = record.derived.percentage,
        letter_grade = record.derived.letter_grade.as_str(),
        "grade record changed"
    );
}

/// Record a class or exam score, creating the grade record on first use.
pub fn add_score<S: GradeStore>(
    store: &mut S,
    settings: &GradingSettings,
    kind: ScoreKind,
    key: GradeKey,
    entry: ScoreEntry,
) -> Result<GradeRecord, GradeError> {
    calc::validate_entry(kind, &entry)?;
    let ts = now();

    let (mut record, is_new) = match store.find_by_key(&key)? {
        Some(existing) => (existing, false),
        None => {
            let weights = settings.default_weights();
            let derived = calc::derive(&[], &[], &weights)?;
            (
                GradeRecord {
                    id: Uuid::new_v4().to_string(),
                    key,
                    class_scores: Vec::new(),
                    exam_scores: Vec::new(),
                    weights,
                    derived,
                    rank: None,
                    created_at: ts.clone(),
                    updated_at: ts.clone(),
                },
                true,
            )
        }
    };

    record.entries_mut(kind).push(entry);
    record.derived = calc::derive(&record.class_scores, &record.exam_scores, &record.weights)?;
    record.updated_at = ts;

    let record = save_and_rerank(store, record, is_new, settings.tie_rule)?;
    audit(
        match kind {
            ScoreKind::Class => "grades.addClassScore",
            ScoreKind::Exam => "grades.addExamScore",
        },
        &record,
    );
    Ok(record)
}

pub fn update_weights<S: GradeStore>(
    store: &mut S,
    settings: &GradingSettings,
    grade_id: &str,
    weights: Weights,
) -> Result<GradeRecord, GradeError> {
    calc::validate_weights(&weights)?;
    let mut record = load_record(store, grade_id)?;

    record.weights = weights;
    record.derived = calc::derive(&record.class_scores, &record.exam_scores, &record.weights)?;
    record.updated_at = now();

    let record = save_and_rerank(store, record, false, settings.tie_rule)?;
    audit("grades.updateWeights", &record);
    Ok(record)
}

/// Patch one entry. `kind`, when given, must match the list the entry lives in.
pub fn update_score<S: GradeStore>(
    store: &mut S,
    settings: &GradingSettings,
    grade_id: &str,
    score_id: &str,
    kind: Option<ScoreKind>,
    patch: &ScorePatch,
) -> Result<GradeRecord, GradeError> {
    let mut record = load_record(store, grade_id)?;
    let (found_kind, idx) = record
        .locate_entry(score_id)
        .filter(|(k, _)| kind.map(|want| want == *k).unwrap_or(true))
        .ok_or_else(|| {
            GradeError::not_found("score entry not found")
                .with_details(json!({ "gradeId": grade_id, "scoreId": score_id }))
        })?;

    let mut entry = record.entries(found_kind)[idx].clone();
    patch.apply(&mut entry);
    calc::validate_entry(found_kind, &entry)?;
    record.entries_mut(found_kind)[idx] = entry;

    record.derived = calc::derive(&record.class_scores, &record.exam_scores, &record.weights)?;
    record.updated_at = now();

    let record = save_and_rerank(store, record, false, settings.tie_rule)?;
    audit("grades.updateScore", &record);
    Ok(record)
}

pub fn delete_score<S: GradeStore>(
    store: &mut S,
    settings: &GradingSettings,
    grade_id: &str,
    score_id: &str,
    kind: ScoreKind,
) -> Result<ScoreRemoval, GradeError> {
    let mut record = load_record(store, grade_id)?;
    let Some(idx) = record.entries(kind).iter().position(|e| e.id == score_id) else {
        return Err(GradeError::not_found("score entry not found").with_details(json!({
            "gradeId": grade_id,
            "scoreId": score_id,
            "scoreType": kind
        })));
    };
    record.entries_mut(kind).remove(idx);

    if record.is_empty() {
        store.delete(&record.id)?;
        rerank_scope(store, &record.key.scope(), settings.tie_rule)?;
        audit("grades.deleteRecord", &record);
        return Ok(ScoreRemoval::RecordDeleted {
            grade_id: record.id,
        });
    }

    record.derived = calc::derive(&record.class_scores, &record.exam_scores, &record.weights)?;
    record.updated_at = now();

    let record = save_and_rerank(store, record, false, settings.tie_rule)?;
    audit("grades.deleteScore", &record);
    Ok(ScoreRemoval::Updated(record))
}

pub fn get_record<S: GradeStore>(store: &S, grade_id: &str) -> Result<GradeRecord, GradeError> {
    load_record(store, grade_id)
}

pub fn list_records<S: GradeStore>(
    store: &S,
    filter: &GradeFilter,
) -> Result<Vec<GradeRecord>, GradeError> {
    store.find_where(filter)
}

/// Stored standings for one sibling set, best first.
pub fn class_ranking<S: GradeStore>(
    store: &S,
    scope: &RankScope,
) -> Result<ClassRanking, GradeError> {
    let mut records = store.find_where(&GradeFilter::for_scope(scope))?;
    records.sort_by(|a, b| {
        let pa = a.rank.map(|k| k.position).unwrap_or(u32::MAX);
        let pb = b.rank.map(|k| k.position).unwrap_or(u32::MAX);
        pa.cmp(&pb)
            .then_with(|| a.key.student_id.cmp(&b.key.student_id))
    });
    let rankings: Vec<RankingRow> = records
        .into_iter()
        .map(|r| RankingRow {
            grade_id: r.id,
            student_id: r.key.student_id,
            percentage: r.derived.percentage,
            letter_grade: r.derived.letter_grade,
            grade_point: r.derived.grade_point,
            position: r.rank.map(|k| k.position),
        })
        .collect();
    Ok(ClassRanking {
        scope: scope.clone(),
        total_students: rankings.len(),
        rankings,
    })
}

/// Re-derive every record in `scope` from its entries and re-rank the set.
/// Running it twice in a row changes nothing the second time.
pub fn recompute_scope<S: GradeStore>(
    store: &mut S,
    settings: &GradingSettings,
    scope: &RankScope,
) -> Result<RecomputeOutcome, GradeError> {
    let records = store.find_where(&GradeFilter::for_scope(scope))?;
    let mut rederived = 0_usize;
    for mut r in records.iter().cloned() {
        let derived = calc::derive(&r.class_scores, &r.exam_scores, &r.weights)?;
        if derived != r.derived {
            r.derived = derived;
            r.updated_at = now();
            store.update(&r)?;
            rederived += 1;
        }
    }
    let (_, reranked) = rerank_scope(store, scope, settings.tie_rule)?;
    let outcome = RecomputeOutcome {
        recomputed: records.len(),
        rederived,
        reranked,
    };
    tracing::info!(
        target: "gradebook_audit",
        operation = "grades.recompute",
        class_id = %scope.class_id,
        subject = %scope.subject,
        recomputed = outcome.recomputed,
        rederived = outcome.rederived,
        reranked = outcome.reranked,
        "sibling set recomputed"
    );
    Ok(outcome)
}

pub fn report_card<S: GradeStore>(
    store: &S,
    student_id: &str,
    term: &str,
    academic_year: &str,
) -> Result<ReportSummary, GradeError> {
    let records = store.find_where(&GradeFilter::for_student_term(
        student_id,
        term,
        academic_year,
    ))?;
    report::build_report(student_id, term, academic_year, records)
}
