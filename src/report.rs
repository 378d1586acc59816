use crate::error::GradeError;
use crate::model::{GradeRecord, PassStatus, ReportSummary};
use serde_json::json;

/// Fold one student's subject records for a term into a report card.
///
/// The overall percentage weighs each subject by its score volume
/// (`Σ totalScore / Σ maxTotalScore`), so a subject with more marks on offer
/// counts for more than a lightly assessed one.
pub fn build_report(
    student_id: &str,
    term: &str,
    academic_year: &str,
    mut records: Vec<GradeRecord>,
) -> Result<ReportSummary, GradeError> {
    if records.is_empty() {
        return Err(
            GradeError::not_found("no grade records for student in this term").with_details(
                json!({
                    "studentId": student_id,
                    "term": term,
                    "academicYear": academic_year
                }),
            ),
        );
    }

    records.sort_by(|a, b| {
        a.key
            .subject
            .cmp(&b.key.subject)
            .then_with(|| a.key.class_id.cmp(&b.key.class_id))
    });

    let subject_count = records.len();
    let mut grade_point_sum = 0.0_f64;
    let mut total_score = 0.0_f64;
    let mut max_total_score = 0.0_f64;
    let mut passed_subjects = 0_usize;

    for r in &records {
        grade_point_sum += r.derived.grade_point;
        total_score += r.derived.total_score;
        max_total_score += r.derived.max_total_score;
        if r.derived.status == PassStatus::Pass {
            passed_subjects += 1;
        }
    }

    let overall_percentage = if max_total_score > 0.0 {
        100.0 * total_score / max_total_score
    } else {
        0.0
    };

    Ok(ReportSummary {
        student_id: student_id.to_string(),
        term: term.to_string(),
        academic_year: academic_year.to_string(),
        subjects: records,
        subject_count,
        average_grade_point: grade_point_sum / subject_count as f64,
        overall_percentage,
        total_score,
        max_total_score,
        passed_subjects,
        failed_subjects: subject_count - passed_subjects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc;
    use crate::model::{Category, GradeKey, ScoreEntry, Weights};

    fn subject_record(subject: &str, score: f64, max_score: f64) -> GradeRecord {
        let exam = vec![ScoreEntry {
            id: format!("{}-final", subject),
            category: Category::Final,
            title: "Final".to_string(),
            score,
            max_score,
            date: "2025-03-20".to_string(),
            comment: None,
        }];
        let weights = Weights {
            class_weight: 0.0,
            exam_weight: 100.0,
        };
        let derived = calc::derive(&[], &exam, &weights).expect("derive");
        GradeRecord {
            id: format!("grade-{}", subject),
            key: GradeKey {
                student_id: "s1".to_string(),
                class_id: "c1".to_string(),
                subject: subject.to_string(),
                term: "Term 2".to_string(),
                academic_year: "2024-2025".to_string(),
            },
            class_scores: Vec::new(),
            exam_scores: exam,
            weights,
            derived,
            rank: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn overall_percentage_weighs_by_score_volume() {
        let records = vec![
            subject_record("Science", 25.0, 50.0),
            subject_record("English", 80.0, 100.0),
        ];
        let report = build_report("s1", "Term 2", "2024-2025", records).expect("report");

        assert_eq!(report.subject_count, 2);
        assert_eq!(report.total_score, 105.0);
        assert_eq!(report.max_total_score, 150.0);
        assert!((report.overall_percentage - 70.0).abs() < 1e-9);
        // The mean of the two subject percentages would be 65.
        assert!((report.overall_percentage - 65.0).abs() > 1.0);
    }

    #[test]
    fn average_grade_point_is_a_plain_mean() {
        let records = vec![
            subject_record("English", 80.0, 100.0),
            subject_record("Science", 25.0, 50.0),
        ];
        let report = build_report("s1", "Term 2", "2024-2025", records).expect("report");

        // B- (2.3) and F (0.0)
        assert!((report.average_grade_point - 1.15).abs() < 1e-9);
        assert_eq!(report.passed_subjects, 1);
        assert_eq!(report.failed_subjects, 1);
    }

    #[test]
    fn subjects_are_listed_alphabetically() {
        let records = vec![
            subject_record("Science", 25.0, 50.0),
            subject_record("Art", 45.0, 50.0),
            subject_record("English", 80.0, 100.0),
        ];
        let report = build_report("s1", "Term 2", "2024-2025", records).expect("report");
        let subjects: Vec<&str> = report
            .subjects
            .iter()
            .map(|r| r.key.subject.as_str())
            .collect();
        assert_eq!(subjects, vec!["Art", "English", "Science"]);
    }

    #[test]
    fn no_records_is_not_found() {
        let err = build_report("s1", "Term 2", "2024-2025", Vec::new()).expect_err("empty");
        assert_eq!(err.code, "not_found");
    }
}
