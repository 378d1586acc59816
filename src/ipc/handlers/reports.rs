use crate::error::GradeError;
use crate::ipc::error::reply;
use crate::ipc::types::{AppState, Request};
use crate::requests::require_text;
use crate::service;
use serde_json::json;

fn handle_report_card(state: &mut AppState, req: &Request) -> serde_json::Value {
    let res = (|| -> Result<_, GradeError> {
        let student_id = require_text(&req.params, "studentId")?;
        let term = require_text(&req.params, "term")?;
        let academic_year = require_text(&req.params, "academicYear")?;
        state.read(|store| service::report_card(store, &student_id, &term, &academic_year))
    })();
    reply(&req.id, res, |report| json!(report))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.reportCard" => Some(handle_report_card(state, req)),
        _ => None,
    }
}
