use crate::calc;
use crate::db;
use crate::error::{db_err, GradeError};
use crate::model::Weights;
use crate::rank::TieRule;
use crate::service;
use crate::store::SqliteStore;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const GRADING_KEY: &str = "setup.grading";

/// Workspace-level grading policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSettings {
    pub default_class_weight: f64,
    pub default_exam_weight: f64,
    pub tie_rule: TieRule,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            default_class_weight: 30.0,
            default_exam_weight: 70.0,
            tie_rule: TieRule::Competition,
        }
    }
}

fn parse_weight(v: &Value, key: &str) -> Result<f64, String> {
    let Some(n) = v.as_f64() else {
        return Err(format!("{} must be a number", key));
    };
    if !(0.0..=100.0).contains(&n) {
        return Err(format!("{} must be between 0 and 100", key));
    }
    Ok(n)
}

impl GradingSettings {
    pub fn default_weights(&self) -> Weights {
        Weights {
            class_weight: self.default_class_weight,
            exam_weight: self.default_exam_weight,
        }
    }

    /// Apply a partial update. Fields are validated one by one and the
    /// resulting default weights must still sum to 100.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = *self;
        for (k, v) in patch {
            match k.as_str() {
                "defaultClassWeight" => next.default_class_weight = parse_weight(v, k)?,
                "defaultExamWeight" => next.default_exam_weight = parse_weight(v, k)?,
                "tieRule" => {
                    next.tie_rule = v
                        .as_str()
                        .and_then(TieRule::parse)
                        .ok_or_else(|| "tieRule must be one of: competition, ordinal".to_string())?;
                }
                _ => return Err(format!("unknown grading field: {}", k)),
            }
        }
        calc::validate_weights(&next.default_weights()).map_err(|e| e.message)?;
        *self = next;
        Ok(())
    }

    pub fn to_json(self) -> Value {
        json!(self)
    }
}

pub fn load_grading(conn: &Connection) -> anyhow::Result<GradingSettings> {
    let mut current = GradingSettings::default();
    if let Some(saved) = db::settings_get_json(conn, GRADING_KEY)? {
        let applied = match saved.as_object() {
            Some(saved_obj) => current.apply_patch(saved_obj),
            None => Err("stored value is not an object".to_string()),
        };
        if let Err(e) = applied {
            tracing::warn!(
                key = GRADING_KEY,
                error = %e,
                "stored grading settings are invalid; using defaults"
            );
            current = GradingSettings::default();
        }
    }
    Ok(current)
}

/// Save a grading patch. A changed tie rule re-ranks every sibling set in
/// the same transaction, so stored ranks never follow a stale rule.
pub fn update_grading(
    conn: &Connection,
    patch: &Map<String, Value>,
) -> Result<GradingSettings, GradeError> {
    let mut current = load_grading(conn).map_err(db_err("db_query_failed"))?;
    let previous_rule = current.tie_rule;
    current.apply_patch(patch).map_err(GradeError::bad_params)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(db_err("db_tx_failed"))?;
    db::settings_set_json(&tx, GRADING_KEY, &current.to_json())
        .map_err(db_err("db_update_failed"))?;
    let reranked = if current.tie_rule != previous_rule {
        service::rerank_all(&mut SqliteStore::new(&tx), current.tie_rule)?
    } else {
        0
    };
    tx.commit().map_err(db_err("db_tx_failed"))?;

    tracing::info!(
        target: "gradebook_audit",
        operation = "settings.update",
        tie_rule = ?current.tie_rule,
        reranked,
        "grading settings updated"
    );
    Ok(current)
}
