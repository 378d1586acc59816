use crate::model::{GradeRecord, Rank};
use serde::Serialize;
use std::cmp::Ordering;

/// Tie resolution: percentages equal at this precision share a standing.
const TIE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TieRule {
    /// Equal percentages share a position; the next one skips ahead (1, 2, 2, 4).
    #[default]
    Competition,
    /// Equal percentages get consecutive positions by student id (1, 2, 3, 4).
    Ordinal,
}

impl TieRule {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "competition" => Some(Self::Competition),
            "ordinal" => Some(Self::Ordinal),
            _ => None,
        }
    }
}

/// Percentage quantized to `TIE_EPSILON` steps. Sorting and tie detection
/// both use it, so a tie always sorts by student id.
fn standing_key(percentage: f64) -> i64 {
    (percentage / TIE_EPSILON).round() as i64
}

fn by_standing(a: &GradeRecord, b: &GradeRecord) -> Ordering {
    standing_key(b.derived.percentage)
        .cmp(&standing_key(a.derived.percentage))
        .then_with(|| a.key.student_id.cmp(&b.key.student_id))
}

/// Sort a sibling set into standing order and assign every member its rank.
/// Returns the ids whose rank changed.
pub fn rank_siblings(records: &mut [GradeRecord], rule: TieRule) -> Vec<String> {
    records.sort_by(by_standing);

    let total_students = records.len() as u32;
    let mut changed = Vec::new();
    let mut previous: Option<i64> = None;
    let mut position: u32 = 0;

    for (i, r) in records.iter_mut().enumerate() {
        let key = standing_key(r.derived.percentage);
        let tied = previous == Some(key);
        position = match rule {
            TieRule::Competition if tied => position,
            _ => i as u32 + 1,
        };
        previous = Some(key);

        let rank = Some(Rank {
            position,
            total_students,
        });
        if r.rank != rank {
            r.rank = rank;
            changed.push(r.id.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Derived, GradeKey, LetterGrade, PassStatus, Weights};

    fn record(student_id: &str, percentage: f64) -> GradeRecord {
        GradeRecord {
            id: format!("grade-{}", student_id),
            key: GradeKey {
                student_id: student_id.to_string(),
                class_id: "c1".to_string(),
                subject: "Mathematics".to_string(),
                term: "Term 1".to_string(),
                academic_year: "2024-2025".to_string(),
            },
            class_scores: Vec::new(),
            exam_scores: Vec::new(),
            weights: Weights {
                class_weight: 30.0,
                exam_weight: 70.0,
            },
            derived: Derived {
                class_percentage: percentage,
                exam_percentage: percentage,
                total_score: percentage,
                max_total_score: 100.0,
                percentage,
                letter_grade: LetterGrade::F,
                grade_point: 0.0,
                status: PassStatus::Fail,
            },
            rank: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn positions(records: &[GradeRecord]) -> Vec<(String, u32)> {
        records
            .iter()
            .map(|r| {
                (
                    r.key.student_id.clone(),
                    r.rank.map(|k| k.position).unwrap_or(0),
                )
            })
            .collect()
    }

    #[test]
    fn ranks_descend_by_percentage() {
        let mut set = vec![record("s2", 80.0), record("s3", 70.0), record("s1", 90.0)];
        rank_siblings(&mut set, TieRule::Competition);
        assert_eq!(
            positions(&set),
            vec![
                ("s1".to_string(), 1),
                ("s2".to_string(), 2),
                ("s3".to_string(), 3)
            ]
        );
        assert!(set.iter().all(|r| r.rank.map(|k| k.total_students) == Some(3)));
    }

    #[test]
    fn new_top_record_shifts_everyone_down() {
        let mut set = vec![record("s1", 90.0), record("s2", 80.0), record("s3", 70.0)];
        rank_siblings(&mut set, TieRule::Competition);

        set.push(record("s4", 95.0));
        let changed = rank_siblings(&mut set, TieRule::Competition);

        assert_eq!(changed.len(), 4);
        assert_eq!(
            positions(&set),
            vec![
                ("s4".to_string(), 1),
                ("s1".to_string(), 2),
                ("s2".to_string(), 3),
                ("s3".to_string(), 4)
            ]
        );
        assert!(set.iter().all(|r| r.rank.map(|k| k.total_students) == Some(4)));
    }

    #[test]
    fn competition_ties_share_a_position() {
        let mut set = vec![
            record("s3", 80.0),
            record("s1", 90.0),
            record("s2", 80.0),
            record("s4", 60.0),
        ];
        rank_siblings(&mut set, TieRule::Competition);
        assert_eq!(
            positions(&set),
            vec![
                ("s1".to_string(), 1),
                ("s2".to_string(), 2),
                ("s3".to_string(), 2),
                ("s4".to_string(), 4)
            ]
        );
    }

    #[test]
    fn ordinal_ties_break_by_student_id() {
        let mut set = vec![record("s3", 80.0), record("s2", 80.0), record("s1", 90.0)];
        rank_siblings(&mut set, TieRule::Ordinal);
        assert_eq!(
            positions(&set),
            vec![
                ("s1".to_string(), 1),
                ("s2".to_string(), 2),
                ("s3".to_string(), 3)
            ]
        );
    }

    #[test]
    fn rounding_noise_does_not_split_a_tie() {
        // 97 reached through 30/70 weighting can land one ulp below 97.0.
        let weighted = 97.0 * 0.3 + 97.0 * 0.7;
        let mut set = vec![record("s2", 97.0), record("s1", weighted), record("s3", 90.0)];

        rank_siblings(&mut set, TieRule::Ordinal);
        assert_eq!(
            positions(&set),
            vec![
                ("s1".to_string(), 1),
                ("s2".to_string(), 2),
                ("s3".to_string(), 3)
            ]
        );

        rank_siblings(&mut set, TieRule::Competition);
        assert_eq!(
            positions(&set),
            vec![
                ("s1".to_string(), 1),
                ("s2".to_string(), 1),
                ("s3".to_string(), 3)
            ]
        );
    }

    #[test]
    fn unchanged_ranks_are_not_reported() {
        let mut set = vec![record("s1", 90.0), record("s2", 80.0)];
        assert_eq!(rank_siblings(&mut set, TieRule::Competition).len(), 2);
        assert!(rank_siblings(&mut set, TieRule::Competition).is_empty());

        set[1].derived.percentage = 85.0;
        assert!(rank_siblings(&mut set, TieRule::Competition).is_empty());

        set[1].derived.percentage = 95.0;
        assert_eq!(rank_siblings(&mut set, TieRule::Competition).len(), 2);
    }
}
