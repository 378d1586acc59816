mod common;

use common::{score_params, str_field, Sidecar};
use serde_json::json;

#[test]
fn every_method_is_routed() {
    let mut sc = Sidecar::start_without_workspace();

    let health = sc.ok("health", json!({}));
    assert_eq!(health["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(health["workspacePath"], json!(null));
    assert_eq!(
        sc.err_code("grades.list", json!({})),
        "no_workspace",
        "grade methods need a workspace"
    );
    assert_eq!(sc.err_code("workspace.select", json!({})), "bad_params");

    let path = sc.workspace.path().to_string_lossy().to_string();
    sc.ok("workspace.select", json!({ "path": path }));

    let r = sc.ok(
        "grades.addClassScore",
        score_params("s1", "Mathematics", "quiz", 7.0, 10.0),
    );
    let grade_id = str_field(&r, "id").to_string();
    let score_id = str_field(&r["classScores"][0], "id").to_string();
    let scope = json!({
        "classId": "jhs-2a",
        "subject": "Mathematics",
        "term": "Term 1",
        "academicYear": "2024-2025"
    });

    sc.ok("grades.addExamScore", score_params("s1", "Mathematics", "midterm", 7.0, 10.0));
    sc.ok(
        "grades.updateWeights",
        json!({ "gradeId": grade_id, "classScore": 50, "examScore": 50 }),
    );
    sc.ok(
        "grades.updateScore",
        json!({ "gradeId": grade_id, "scoreId": score_id, "score": { "title": "Retake" } }),
    );
    sc.ok("grades.get", json!({ "gradeId": grade_id }));
    sc.ok("grades.list", json!({ "studentId": "s1" }));
    sc.ok("grades.classRanking", scope.clone());
    sc.ok("grades.recompute", scope);
    sc.ok(
        "reports.reportCard",
        json!({ "studentId": "s1", "term": "Term 1", "academicYear": "2024-2025" }),
    );
    sc.ok("setup.get", json!({ "section": "grading" }));
    sc.ok(
        "grades.deleteScore",
        json!({ "gradeId": grade_id, "scoreId": score_id, "scoreType": "class" }),
    );

    assert_eq!(sc.err_code("grades.teleport", json!({})), "not_implemented");
}

#[test]
fn malformed_lines_answer_bad_json() {
    let mut sc = Sidecar::start_without_workspace();
    let resp = sc.send_line("{ this is not json");
    assert_eq!(resp["ok"], json!(false));
    assert_eq!(resp.pointer("/error/code"), Some(&json!("bad_json")));

    // The loop keeps serving after a bad line.
    sc.ok("health", json!({}));
}
