mod common;

use common::{f64_field, score_params, str_field, Sidecar};
use serde_json::json;

fn exam_only(sc: &mut Sidecar, student: &str, subject: &str, score: f64, max_score: f64) {
    let r = sc.ok(
        "grades.addExamScore",
        score_params(student, subject, "final", score, max_score),
    );
    sc.ok(
        "grades.updateWeights",
        json!({ "gradeId": str_field(&r, "id"), "classScore": 0, "examScore": 100 }),
    );
}

#[test]
fn overall_percentage_weights_by_score_volume() {
    let mut sc = Sidecar::start();
    exam_only(&mut sc, "s1", "Science", 25.0, 50.0);
    exam_only(&mut sc, "s1", "English", 80.0, 100.0);
    exam_only(&mut sc, "s2", "English", 100.0, 100.0);

    let report = sc.ok(
        "reports.reportCard",
        json!({ "studentId": "s1", "term": "Term 1", "academicYear": "2024-2025" }),
    );
    assert_eq!(report["subjectCount"], json!(2));
    // (25 + 80) / (50 + 100), not the mean of 50% and 80%
    assert_eq!(f64_field(&report, "overallPercentage"), 70.0);
    assert_eq!(f64_field(&report, "totalScore"), 105.0);
    assert_eq!(f64_field(&report, "maxTotalScore"), 150.0);
    assert!((f64_field(&report, "averageGradePoint") - 1.15).abs() < 1e-9);
    assert_eq!(report["passedSubjects"], json!(1));
    assert_eq!(report["failedSubjects"], json!(1));

    let subjects: Vec<&str> = report["subjects"]
        .as_array()
        .expect("subjects")
        .iter()
        .map(|s| str_field(s, "subject"))
        .collect();
    assert_eq!(subjects, vec!["English", "Science"]);
}

#[test]
fn missing_report_is_not_found() {
    let mut sc = Sidecar::start();
    exam_only(&mut sc, "s1", "Science", 25.0, 50.0);
    assert_eq!(
        sc.err_code(
            "reports.reportCard",
            json!({ "studentId": "s1", "term": "Term 2", "academicYear": "2024-2025" })
        ),
        "not_found"
    );
    assert_eq!(
        sc.err_code(
            "reports.reportCard",
            json!({ "studentId": "s1", "term": "Term 1" })
        ),
        "bad_params"
    );
}
