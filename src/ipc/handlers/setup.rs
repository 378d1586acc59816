use crate::error::db_err;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use serde_json::json;

#[derive(Clone, Copy)]
enum SetupSection {
    Grading,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "grading" => Some(Self::Grading),
            _ => None,
        }
    }
}

fn parse_section(req: &Request) -> Result<SetupSection, serde_json::Value> {
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", "missing section", None));
    };
    SetupSection::parse(section_raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "unknown section",
            Some(json!({ "section": section_raw })),
        )
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match state.conn() {
        Ok(c) => c,
        Err(e) => return fail(&req.id, &e),
    };
    let section = match parse_section(req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match section {
        SetupSection::Grading => match settings::load_grading(conn) {
            Ok(g) => ok(&req.id, g.to_json()),
            Err(e) => fail(&req.id, &db_err("db_query_failed")(e)),
        },
    }
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match state.conn() {
        Ok(c) => c,
        Err(e) => return fail(&req.id, &e),
    };
    let section = match parse_section(req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    match section {
        SetupSection::Grading => match settings::update_grading(conn, patch_obj) {
            Ok(g) => ok(&req.id, g.to_json()),
            Err(e) => fail(&req.id, &e),
        },
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
