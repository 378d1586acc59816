use super::HttpState;
use crate::error::{db_err, ErrorKind, GradeError};
use crate::model::ScoreKind;
use crate::requests;
use crate::service;
use crate::settings;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub(crate) struct ApiError(GradeError);

impl From<GradeError> for ApiError {
    fn from(e: GradeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = self.0.code, message = %self.0.message, "request failed");
        } else {
            tracing::debug!(code = self.0.code, message = %self.0.message, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_json() }))).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn ok_json(status: StatusCode, body: Value) -> ApiResult {
    Ok((status, Json(body)).into_response())
}

/// Bodies are parsed by hand so malformed JSON maps onto `bad_json`.
fn parse_body(body: &Bytes) -> Result<Value, GradeError> {
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let v: Value =
        serde_json::from_slice(body).map_err(|e| GradeError::bad_json(e.to_string()))?;
    if !v.is_object() {
        return Err(GradeError::bad_json("request body must be a JSON object"));
    }
    Ok(v)
}

/// Fold path segments into the params; `:id` is the grade record id.
fn with_path(mut params: Value, path: HashMap<String, String>) -> Value {
    if let Some(obj) = params.as_object_mut() {
        for (k, v) in path {
            let k = if k == "id" { "gradeId".to_string() } else { k };
            obj.insert(k, Value::String(v));
        }
    }
    params
}

fn path_params(path: HashMap<String, String>) -> Value {
    with_path(Value::Object(Map::new()), path)
}

pub(crate) async fn healthz() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

async fn add_score(state: HttpState, kind: ScoreKind, body: Bytes) -> ApiResult {
    let params = parse_body(&body)?;
    let key = requests::parse_grade_key(&params)?;
    let entry = requests::parse_new_entry(&params)?;
    let record = state
        .mutate(move |store, grading| service::add_score(store, grading, kind, key, entry))
        .await?;
    ok_json(StatusCode::CREATED, json!(record))
}

pub(crate) async fn add_class_score(State(state): State<HttpState>, body: Bytes) -> ApiResult {
    add_score(state, ScoreKind::Class, body).await
}

pub(crate) async fn add_exam_score(State(state): State<HttpState>, body: Bytes) -> ApiResult {
    add_score(state, ScoreKind::Exam, body).await
}

pub(crate) async fn update_weights(
    State(state): State<HttpState>,
    Path(path): Path<HashMap<String, String>>,
    body: Bytes,
) -> ApiResult {
    let params = with_path(parse_body(&body)?, path);
    let grade_id = requests::require_text(&params, "gradeId")?;
    let weights = requests::parse_weights(&params)?;
    let record = state
        .mutate(move |store, grading| service::update_weights(store, grading, &grade_id, weights))
        .await?;
    ok_json(StatusCode::OK, json!(record))
}

pub(crate) async fn update_score(
    State(state): State<HttpState>,
    Path(path): Path<HashMap<String, String>>,
    body: Bytes,
) -> ApiResult {
    let params = with_path(parse_body(&body)?, path);
    let grade_id = requests::require_text(&params, "gradeId")?;
    let score_id = requests::require_text(&params, "scoreId")?;
    let kind = match params.get("scoreType").and_then(|v| v.as_str()) {
        Some(raw) => Some(requests::parse_kind(raw)?),
        None => None,
    };
    let patch = requests::parse_score_patch(&params)?;
    let record = state
        .mutate(move |store, grading| {
            service::update_score(store, grading, &grade_id, &score_id, kind, &patch)
        })
        .await?;
    ok_json(StatusCode::OK, json!(record))
}

pub(crate) async fn delete_score(
    State(state): State<HttpState>,
    Path(path): Path<HashMap<String, String>>,
) -> ApiResult {
    let params = path_params(path);
    let grade_id = requests::require_text(&params, "gradeId")?;
    let score_id = requests::require_text(&params, "scoreId")?;
    let kind = requests::parse_kind(&requests::require_text(&params, "scoreType")?)?;
    let removal = state
        .mutate(move |store, grading| {
            service::delete_score(store, grading, &grade_id, &score_id, kind)
        })
        .await?;
    ok_json(StatusCode::OK, removal.to_json())
}

pub(crate) async fn get_grade(
    State(state): State<HttpState>,
    Path(path): Path<HashMap<String, String>>,
) -> ApiResult {
    let grade_id = requests::require_text(&path_params(path), "gradeId")?;
    let record = state
        .read(move |store| service::get_record(store, &grade_id))
        .await?;
    ok_json(StatusCode::OK, json!(record))
}

pub(crate) async fn list_grades(
    State(state): State<HttpState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult {
    let params = Value::Object(
        query
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    );
    let filter = requests::parse_filter(&params)?;
    let grades = state
        .read(move |store| service::list_records(store, &filter))
        .await?;
    ok_json(StatusCode::OK, json!({ "grades": grades }))
}

pub(crate) async fn class_ranking(
    State(state): State<HttpState>,
    Path(path): Path<HashMap<String, String>>,
) -> ApiResult {
    let scope = requests::parse_scope(&path_params(path))?;
    let ranking = state
        .read(move |store| service::class_ranking(store, &scope))
        .await?;
    ok_json(StatusCode::OK, json!(ranking))
}

pub(crate) async fn recompute(State(state): State<HttpState>, body: Bytes) -> ApiResult {
    let scope = requests::parse_scope(&parse_body(&body)?)?;
    let outcome = state
        .mutate(move |store, grading| service::recompute_scope(store, grading, &scope))
        .await?;
    ok_json(StatusCode::OK, json!(outcome))
}

pub(crate) async fn report_card(
    State(state): State<HttpState>,
    Path(path): Path<HashMap<String, String>>,
) -> ApiResult {
    let params = path_params(path);
    let student_id = requests::require_text(&params, "studentId")?;
    let term = requests::require_text(&params, "term")?;
    let academic_year = requests::require_text(&params, "academicYear")?;
    let report = state
        .read(move |store| service::report_card(store, &student_id, &term, &academic_year))
        .await?;
    ok_json(StatusCode::OK, json!(report))
}

pub(crate) async fn get_grading(State(state): State<HttpState>) -> ApiResult {
    let grading = state
        .with_conn(|conn| settings::load_grading(conn).map_err(db_err("db_query_failed")))
        .await?;
    ok_json(StatusCode::OK, grading.to_json())
}

pub(crate) async fn update_grading(State(state): State<HttpState>, body: Bytes) -> ApiResult {
    let patch = match parse_body(&body)? {
        Value::Object(map) => map,
        _ => return Err(GradeError::bad_params("patch must be an object").into()),
    };
    let grading = state
        .with_conn(move |conn| settings::update_grading(conn, &patch))
        .await?;
    ok_json(StatusCode::OK, grading.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_override_body_fields() {
        let mut path = HashMap::new();
        path.insert("id".to_string(), "g1".to_string());
        path.insert("scoreId".to_string(), "e1".to_string());
        let params = with_path(json!({ "gradeId": "other", "score": { "score": 3 } }), path);
        assert_eq!(params["gradeId"], json!("g1"));
        assert_eq!(params["scoreId"], json!("e1"));
        assert_eq!(params["score"]["score"], json!(3));
    }

    #[test]
    fn malformed_bodies_are_bad_json() {
        let err = parse_body(&Bytes::from_static(b"{not json")).expect_err("bad");
        assert_eq!(err.code, "bad_json");
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = parse_body(&Bytes::from_static(b"[1,2]")).expect_err("not an object");
        assert_eq!(err.code, "bad_json");
        assert_eq!(parse_body(&Bytes::new()).expect("empty"), json!({}));
    }

    #[test]
    fn error_kinds_map_to_statuses() {
        let cases = [
            (GradeError::bad_params("x"), StatusCode::BAD_REQUEST),
            (GradeError::not_found("x"), StatusCode::NOT_FOUND),
            (
                GradeError::storage("db_update_failed", "x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (e, status) in cases {
            assert_eq!(ApiError(e).into_response().status(), status);
        }
    }
}
