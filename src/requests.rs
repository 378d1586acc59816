//! Parameter parsing shared by the sidecar handlers and the HTTP routes.
//! HTTP path segments are folded into the JSON params before they get here,
//! so both transports validate identically.

use crate::error::GradeError;
use crate::model::{Category, GradeKey, RankScope, ScoreEntry, ScoreKind, Weights};
use crate::service::ScorePatch;
use crate::store::GradeFilter;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn missing(field: &str) -> GradeError {
    GradeError::bad_params(format!("missing {}", field)).with_details(json!({ "field": field }))
}

/// Non-empty trimmed string at `params[field]`.
pub fn require_text(params: &Value, field: &str) -> Result<String, GradeError> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| missing(field))
}

fn optional_text(params: &Value, field: &str) -> Result<Option<String>, GradeError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(_) => Err(GradeError::bad_params(format!("{} must be a string", field))),
    }
}

fn number(v: &Value, field: &str) -> Result<f64, GradeError> {
    v.as_f64().ok_or_else(|| {
        GradeError::bad_params(format!("{} must be a number", field))
            .with_details(json!({ "field": field }))
    })
}

fn require_number(obj: &Map<String, Value>, field: &str) -> Result<f64, GradeError> {
    match obj.get(field) {
        Some(v) => number(v, field),
        None => Err(missing(field)),
    }
}

fn object<'a>(v: Option<&'a Value>, field: &str) -> Result<&'a Map<String, Value>, GradeError> {
    v.and_then(|v| v.as_object())
        .ok_or_else(|| GradeError::bad_params(format!("{} must be an object", field)))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp; stored as a date.
pub fn parse_date(raw: &str) -> Result<String, GradeError> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(d.format(DATE_FORMAT).to_string());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive().format(DATE_FORMAT).to_string());
    }
    Err(GradeError::bad_params("date must be YYYY-MM-DD").with_details(json!({ "date": raw })))
}

fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

fn parse_category(v: &Value) -> Result<Category, GradeError> {
    v.as_str().and_then(Category::parse).ok_or_else(|| {
        GradeError::bad_params(
            "category must be one of: quiz, assignment, project, participation, midterm, final",
        )
        .with_details(json!({ "category": v }))
    })
}

fn parse_comment(v: &Value) -> Result<Option<String>, GradeError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        _ => Err(GradeError::bad_params("comment must be a string")),
    }
}

pub fn parse_kind(raw: &str) -> Result<ScoreKind, GradeError> {
    ScoreKind::parse(raw).ok_or_else(|| {
        GradeError::bad_params("scoreType must be one of: class, exam")
            .with_details(json!({ "scoreType": raw }))
    })
}

pub fn parse_grade_key(params: &Value) -> Result<GradeKey, GradeError> {
    Ok(GradeKey {
        student_id: require_text(params, "studentId")?,
        class_id: require_text(params, "classId")?,
        subject: require_text(params, "subject")?,
        term: require_text(params, "term")?,
        academic_year: require_text(params, "academicYear")?,
    })
}

pub fn parse_scope(params: &Value) -> Result<RankScope, GradeError> {
    Ok(RankScope {
        class_id: require_text(params, "classId")?,
        subject: require_text(params, "subject")?,
        term: require_text(params, "term")?,
        academic_year: require_text(params, "academicYear")?,
    })
}

pub fn parse_filter(params: &Value) -> Result<GradeFilter, GradeError> {
    Ok(GradeFilter {
        student_id: optional_text(params, "studentId")?,
        class_id: optional_text(params, "classId")?,
        subject: optional_text(params, "subject")?,
        term: optional_text(params, "term")?,
        academic_year: optional_text(params, "academicYear")?,
    })
}

/// A brand-new entry from `params.score`. The id is always server-assigned.
pub fn parse_new_entry(params: &Value) -> Result<ScoreEntry, GradeError> {
    let obj = object(params.get("score"), "score")?;
    let category = match obj.get("category") {
        Some(v) => parse_category(v)?,
        None => return Err(missing("category")),
    };
    let title = obj
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| missing("title"))?;
    let date = match obj.get("date").and_then(|v| v.as_str()) {
        Some(raw) => parse_date(raw)?,
        None => today(),
    };
    let comment = match obj.get("comment") {
        Some(v) => parse_comment(v)?,
        None => None,
    };
    Ok(ScoreEntry {
        id: Uuid::new_v4().to_string(),
        category,
        title,
        score: require_number(obj, "score")?,
        max_score: require_number(obj, "maxScore")?,
        date,
        comment,
    })
}

/// Partial entry from `params.score`; unknown fields are rejected.
pub fn parse_score_patch(params: &Value) -> Result<ScorePatch, GradeError> {
    let obj = object(params.get("score"), "score")?;
    let mut patch = ScorePatch::default();
    for (k, v) in obj {
        match k.as_str() {
            "category" => patch.category = Some(parse_category(v)?),
            "title" => {
                let Some(t) = v.as_str() else {
                    return Err(GradeError::bad_params("title must be a string"));
                };
                patch.title = Some(t.trim().to_string());
            }
            "score" => patch.score = Some(number(v, "score")?),
            "maxScore" => patch.max_score = Some(number(v, "maxScore")?),
            "date" => {
                let Some(raw) = v.as_str() else {
                    return Err(GradeError::bad_params("date must be YYYY-MM-DD"));
                };
                patch.date = Some(parse_date(raw)?);
            }
            "comment" => patch.comment = Some(parse_comment(v)?),
            // Echoed back by clients that send a whole entry.
            "id" => {}
            _ => {
                return Err(GradeError::bad_params(format!("unknown score field: {}", k))
                    .with_details(json!({ "field": k })))
            }
        }
    }
    if patch == ScorePatch::default() {
        return Err(GradeError::bad_params("score patch is empty"));
    }
    Ok(patch)
}

/// `{ classScore, examScore }`, also accepting `classWeight`/`examWeight`,
/// either at the top level or under `weights`.
pub fn parse_weights(params: &Value) -> Result<Weights, GradeError> {
    let src = match params.get("weights") {
        Some(w) => object(Some(w), "weights")?,
        None => object(Some(params), "params")?,
    };
    let pick = |primary: &str, alias: &str| -> Result<f64, GradeError> {
        match src.get(primary).or_else(|| src.get(alias)) {
            Some(v) => number(v, primary),
            None => Err(missing(primary)),
        }
    };
    Ok(Weights {
        class_weight: pick("classScore", "classWeight")?,
        exam_weight: pick("examScore", "examWeight")?,
    })
}
