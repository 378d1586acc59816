mod common;

use common::{f64_field, score_params, str_field, Sidecar};
use serde_json::json;

#[test]
fn weights_must_sum_to_one_hundred() {
    let mut sc = Sidecar::start();
    let r = sc.ok(
        "grades.addClassScore",
        score_params("s1", "Mathematics", "quiz", 6.0, 10.0),
    );
    let grade_id = str_field(&r, "id").to_string();

    for bad in [
        json!({ "classScore": 50, "examScore": 40 }),
        json!({ "classScore": 60, "examScore": 60 }),
        json!({ "classScore": -10, "examScore": 110 }),
        json!({ "classScore": 120, "examScore": -20 }),
        json!({ "classScore": "50", "examScore": 50 }),
        json!({ "classScore": 50 }),
    ] {
        let mut params = bad.clone();
        params["gradeId"] = json!(grade_id);
        assert_eq!(
            sc.err_code("grades.updateWeights", params),
            "bad_params",
            "{} should be rejected",
            bad
        );
    }

    let unchanged = sc.ok("grades.get", json!({ "gradeId": grade_id }));
    assert_eq!(unchanged, r, "rejected updates must not touch the record");

    let all_class = sc.ok(
        "grades.updateWeights",
        json!({ "gradeId": grade_id, "weights": { "classWeight": 100, "examWeight": 0 } }),
    );
    assert_eq!(f64_field(&all_class, "percentage"), 60.0);
    assert_eq!(str_field(&all_class, "letterGrade"), "D-");
}

#[test]
fn unknown_record_is_not_found() {
    let mut sc = Sidecar::start();
    assert_eq!(
        sc.err_code(
            "grades.updateWeights",
            json!({ "gradeId": "nope", "classScore": 50, "examScore": 50 })
        ),
        "not_found"
    );
}

#[test]
fn workspace_default_weights_apply_to_new_records() {
    let mut sc = Sidecar::start();
    sc.ok(
        "setup.update",
        json!({ "section": "grading", "patch": { "defaultClassWeight": 40, "defaultExamWeight": 60 } }),
    );
    let r = sc.ok(
        "grades.addExamScore",
        score_params("s1", "Mathematics", "midterm", 10.0, 10.0),
    );
    assert_eq!(r["weights"], json!({ "classWeight": 40.0, "examWeight": 60.0 }));
    assert_eq!(f64_field(&r, "percentage"), 60.0);
}
