use crate::error::GradeError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn fail(id: &str, e: &GradeError) -> serde_json::Value {
    json!({
        "id": id,
        "ok": false,
        "error": e.to_json(),
    })
}

/// Collapse an operation result into a response envelope.
pub fn reply<T>(
    id: &str,
    res: Result<T, GradeError>,
    to_json: impl FnOnce(T) -> serde_json::Value,
) -> serde_json::Value {
    match res {
        Ok(v) => ok(id, to_json(v)),
        Err(e) => fail(id, &e),
    }
}
