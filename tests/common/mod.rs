#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
    pub workspace: TempDir,
}

impl Sidecar {
    /// Spawn the sidecar and select a fresh temp workspace.
    pub fn start() -> Self {
        let mut sc = Self::start_without_workspace();
        let path = sc.workspace.path().to_string_lossy().to_string();
        sc.ok("workspace.select", json!({ "path": path }));
        sc
    }

    pub fn start_without_workspace() -> Self {
        let exe = env!("CARGO_BIN_EXE_gradebookd");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn gradebookd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
            workspace: tempfile::tempdir().expect("temp workspace"),
        }
    }

    pub fn send_line(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        let value = self.send_line(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Expect a failure and return its error code.
    pub fn err_code(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .pointer("/error/code")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn grade_key(student_id: &str, subject: &str) -> serde_json::Value {
    json!({
        "studentId": student_id,
        "classId": "jhs-2a",
        "subject": subject,
        "term": "Term 1",
        "academicYear": "2024-2025"
    })
}

/// `grade_key` plus a `score` entry.
pub fn score_params(
    student_id: &str,
    subject: &str,
    category: &str,
    score: f64,
    max_score: f64,
) -> serde_json::Value {
    let mut params = grade_key(student_id, subject);
    params["score"] = json!({
        "category": category,
        "title": format!("{} 1", category),
        "score": score,
        "maxScore": max_score,
        "date": "2024-10-01"
    });
    params
}

pub fn str_field<'a>(v: &'a serde_json::Value, field: &str) -> &'a str {
    v.get(field)
        .and_then(|x| x.as_str())
        .unwrap_or_else(|| panic!("missing {} in {}", field, v))
}

pub fn f64_field(v: &serde_json::Value, field: &str) -> f64 {
    v.get(field)
        .and_then(|x| x.as_f64())
        .unwrap_or_else(|| panic!("missing {} in {}", field, v))
}
