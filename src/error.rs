use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
}

/// Error carried by every grade operation. `code` is the stable wire code
/// shared by the sidecar and HTTP transports.
#[derive(Debug, Clone)]
pub struct GradeError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl GradeError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_json(message: impl Into<String>) -> Self {
        Self {
            code: "bad_json",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: "not_found",
            message: message.into(),
            details: None,
        }
    }

    pub fn storage(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code {
            "bad_params" | "bad_json" => ErrorKind::Validation,
            "not_found" => ErrorKind::NotFound,
            _ => ErrorKind::Storage,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut error = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(d) = &self.details {
            error["details"] = d.clone();
        }
        error
    }
}

impl fmt::Display for GradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GradeError {}

/// `map_err` adapter for storage failures, e.g. `.map_err(db_err("db_query_failed"))`.
pub fn db_err<E: fmt::Display>(code: &'static str) -> impl Fn(E) -> GradeError {
    move |e| GradeError::storage(code, e.to_string())
}
