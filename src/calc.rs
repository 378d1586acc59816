use crate::error::GradeError;
use crate::model::{Derived, LetterGrade, PassStatus, ScoreEntry, ScoreKind, Weights};
use serde_json::json;

pub const PASS_MARK: f64 = 60.0;

/// Tolerance for `classWeight + examWeight == 100`; fractional weights
/// such as 33.3/66.7 must still be accepted.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Inclusive lower bounds, evaluated top-down.
const GRADE_BANDS: [(f64, LetterGrade); 12] = [
    (97.0, LetterGrade::APlus),
    (93.0, LetterGrade::A),
    (90.0, LetterGrade::AMinus),
    (87.0, LetterGrade::BPlus),
    (83.0, LetterGrade::B),
    (80.0, LetterGrade::BMinus),
    (77.0, LetterGrade::CPlus),
    (73.0, LetterGrade::C),
    (70.0, LetterGrade::CMinus),
    (67.0, LetterGrade::DPlus),
    (63.0, LetterGrade::D),
    (60.0, LetterGrade::DMinus),
];

pub fn letter_grade(percentage: f64) -> LetterGrade {
    GRADE_BANDS
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(LetterGrade::F)
}

pub fn grade_point(grade: LetterGrade) -> f64 {
    match grade {
        LetterGrade::APlus => 4.0,
        LetterGrade::A => 3.7,
        LetterGrade::AMinus => 3.3,
        LetterGrade::BPlus => 3.0,
        LetterGrade::B => 2.7,
        LetterGrade::BMinus => 2.3,
        LetterGrade::CPlus => 2.0,
        LetterGrade::C => 1.7,
        LetterGrade::CMinus => 1.3,
        LetterGrade::DPlus => 1.0,
        LetterGrade::D => 0.7,
        LetterGrade::DMinus => 0.3,
        LetterGrade::F => 0.0,
    }
}

pub fn pass_status(percentage: f64) -> PassStatus {
    if percentage >= PASS_MARK {
        PassStatus::Pass
    } else {
        PassStatus::Fail
    }
}

/// `100 * Σscore / ΣmaxScore`, or 0 when there is nothing to divide by.
pub fn category_percentage(entries: &[ScoreEntry]) -> f64 {
    let (sum, max) = entries
        .iter()
        .fold((0.0_f64, 0.0_f64), |(s, m), e| (s + e.score, m + e.max_score));
    if max > 0.0 {
        100.0 * sum / max
    } else {
        0.0
    }
}

pub fn validate_weights(weights: &Weights) -> Result<(), GradeError> {
    for (name, w) in [
        ("classWeight", weights.class_weight),
        ("examWeight", weights.exam_weight),
    ] {
        if !w.is_finite() || !(0.0..=100.0).contains(&w) {
            return Err(
                GradeError::bad_params(format!("{} must be between 0 and 100", name))
                    .with_details(json!({ "field": name, "value": w })),
            );
        }
    }
    let sum = weights.class_weight + weights.exam_weight;
    if (sum - 100.0).abs() > WEIGHT_SUM_EPSILON {
        return Err(
            GradeError::bad_params("class and exam weights must sum to 100").with_details(json!({
                "classWeight": weights.class_weight,
                "examWeight": weights.exam_weight,
                "sum": sum
            })),
        );
    }
    Ok(())
}

pub fn validate_entry(kind: ScoreKind, entry: &ScoreEntry) -> Result<(), GradeError> {
    if !kind.allows(entry.category) {
        return Err(GradeError::bad_params(format!(
            "category '{}' is not allowed for {} scores",
            entry.category.as_str(),
            kind.as_str()
        ))
        .with_details(json!({ "category": entry.category, "scoreType": kind })));
    }
    if entry.title.trim().is_empty() {
        return Err(GradeError::bad_params("score title must not be empty"));
    }
    if !entry.score.is_finite() || entry.score < 0.0 {
        return Err(GradeError::bad_params("score must be >= 0")
            .with_details(json!({ "score": entry.score })));
    }
    if !entry.max_score.is_finite() || entry.max_score < 1.0 {
        return Err(GradeError::bad_params("maxScore must be >= 1")
            .with_details(json!({ "maxScore": entry.max_score })));
    }
    Ok(())
}

/// Recompute every derived field of a record from its entries and weights.
pub fn derive(
    class_scores: &[ScoreEntry],
    exam_scores: &[ScoreEntry],
    weights: &Weights,
) -> Result<Derived, GradeError> {
    validate_weights(weights)?;

    let class_percentage = category_percentage(class_scores);
    let exam_percentage = category_percentage(exam_scores);
    // Divide last so whole-number percentages and weights stay exact.
    let percentage = (class_percentage * weights.class_weight
        + exam_percentage * weights.exam_weight)
        / 100.0;

    let (total_score, max_total_score) = class_scores
        .iter()
        .chain(exam_scores.iter())
        .fold((0.0_f64, 0.0_f64), |(s, m), e| (s + e.score, m + e.max_score));

    let letter = letter_grade(percentage);
    Ok(Derived {
        class_percentage,
        exam_percentage,
        total_score,
        max_total_score,
        percentage,
        letter_grade: letter,
        grade_point: grade_point(letter),
        status: pass_status(percentage),
    })
}
