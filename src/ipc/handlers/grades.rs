use crate::error::GradeError;
use crate::ipc::error::reply;
use crate::ipc::types::{AppState, Request};
use crate::model::ScoreKind;
use crate::requests;
use crate::service;
use serde_json::json;

fn handle_add_score(state: &mut AppState, req: &Request, kind: ScoreKind) -> serde_json::Value {
    let res = requests::parse_grade_key(&req.params).and_then(|key| {
        let entry = requests::parse_new_entry(&req.params)?;
        state.mutate(|store, grading| service::add_score(store, grading, kind, key, entry))
    });
    reply(&req.id, res, |r| json!(r))
}

fn handle_update_weights(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = requests::require_text(&req.params, "gradeId").and_then(|grade_id| {
        let weights = requests::parse_weights(&req.params)?;
        state.mutate(|store, grading| service::update_weights(store, grading, &grade_id, weights))
    });
    reply(&req.id, res, |r| json!(r))
}

fn handle_update_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = (|| -> Result<_, GradeError> {
        let grade_id = requests::require_text(&req.params, "gradeId")?;
        let score_id = requests::require_text(&req.params, "scoreId")?;
        let kind = match req.params.get("scoreType").and_then(|v| v.as_str()) {
            Some(raw) => Some(requests::parse_kind(raw)?),
            None => None,
        };
        let patch = requests::parse_score_patch(&req.params)?;
        state.mutate(|store, grading| {
            service::update_score(store, grading, &grade_id, &score_id, kind, &patch)
        })
    })();
    reply(&req.id, res, |r| json!(r))
}

fn handle_delete_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = (|| -> Result<_, GradeError> {
        let grade_id = requests::require_text(&req.params, "gradeId")?;
        let score_id = requests::require_text(&req.params, "scoreId")?;
        let kind = requests::parse_kind(&requests::require_text(&req.params, "scoreType")?)?;
        state.mutate(|store, grading| {
            service::delete_score(store, grading, &grade_id, &score_id, kind)
        })
    })();
    reply(&req.id, res, |removal| removal.to_json())
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = requests::require_text(&req.params, "gradeId")
        .and_then(|grade_id| state.read(|store| service::get_record(store, &grade_id)));
    reply(&req.id, res, |r| json!(r))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = requests::parse_filter(&req.params)
        .and_then(|filter| state.read(|store| service::list_records(store, &filter)));
    reply(&req.id, res, |grades| json!({ "grades": grades }))
}

fn handle_class_ranking(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = requests::parse_scope(&req.params)
        .and_then(|scope| state.read(|store| service::class_ranking(store, &scope)));
    reply(&req.id, res, |r| json!(r))
}

fn handle_recompute(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = requests::parse_scope(&req.params).and_then(|scope| {
        state.mutate(|store, grading| service::recompute_scope(store, grading, &scope))
    });
    reply(&req.id, res, |r| json!(r))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.addClassScore" => Some(handle_add_score(state, req, ScoreKind::Class)),
        "grades.addExamScore" => Some(handle_add_score(state, req, ScoreKind::Exam)),
        "grades.updateWeights" => Some(handle_update_weights(state, req)),
        "grades.updateScore" => Some(handle_update_score(state, req)),
        "grades.deleteScore" => Some(handle_delete_score(state, req)),
        "grades.get" => Some(handle_get(state, req)),
        "grades.list" => Some(handle_list(state, req)),
        "grades.classRanking" => Some(handle_class_ranking(state, req)),
        "grades.recompute" => Some(handle_recompute(state, req)),
        _ => None,
    }
}
