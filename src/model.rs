use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Class,
    Exam,
}

impl ScoreKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" | "classscore" | "class-score" => Some(Self::Class),
            "exam" | "examscore" | "exam-score" => Some(Self::Exam),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Exam => "exam",
        }
    }

    /// Class entries are continuous assessment; exam entries are sittings.
    pub fn allows(self, category: Category) -> bool {
        match self {
            Self::Class => matches!(
                category,
                Category::Quiz | Category::Assignment | Category::Project | Category::Participation
            ),
            Self::Exam => matches!(category, Category::Midterm | Category::Final),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Quiz,
    Assignment,
    Project,
    Participation,
    Midterm,
    Final,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiz" => Some(Self::Quiz),
            "assignment" => Some(Self::Assignment),
            "project" => Some(Self::Project),
            "participation" => Some(Self::Participation),
            "midterm" => Some(Self::Midterm),
            "final" => Some(Self::Final),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Assignment => "assignment",
            Self::Project => "project",
            Self::Participation => "participation",
            Self::Midterm => "midterm",
            Self::Final => "final",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub class_weight: f64,
    pub exam_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeKey {
    pub student_id: String,
    pub class_id: String,
    pub subject: String,
    pub term: String,
    pub academic_year: String,
}

impl GradeKey {
    pub fn scope(&self) -> RankScope {
        RankScope {
            class_id: self.class_id.clone(),
            subject: self.subject.clone(),
            term: self.term.clone(),
            academic_year: self.academic_year.clone(),
        }
    }
}

/// The sibling set a record is ranked within.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankScope {
    pub class_id: String,
    pub subject: String,
    pub term: String,
    pub academic_year: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F")]
    F,
}

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::DMinus => "D-",
            Self::F => "F",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(Self::APlus),
            "A" => Some(Self::A),
            "A-" => Some(Self::AMinus),
            "B+" => Some(Self::BPlus),
            "B" => Some(Self::B),
            "B-" => Some(Self::BMinus),
            "C+" => Some(Self::CPlus),
            "C" => Some(Self::C),
            "C-" => Some(Self::CMinus),
            "D+" => Some(Self::DPlus),
            "D" => Some(Self::D),
            "D-" => Some(Self::DMinus),
            "F" => Some(Self::F),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    Pass,
    Fail,
}

impl PassStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// Fields derived from entries and weights. Only `calc::derive` produces these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Derived {
    pub class_percentage: f64,
    pub exam_percentage: f64,
    pub total_score: f64,
    pub max_total_score: f64,
    pub percentage: f64,
    pub letter_grade: LetterGrade,
    pub grade_point: f64,
    pub status: PassStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    pub position: u32,
    pub total_students: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub id: String,
    #[serde(flatten)]
    pub key: GradeKey,
    pub class_scores: Vec<ScoreEntry>,
    pub exam_scores: Vec<ScoreEntry>,
    pub weights: Weights,
    #[serde(flatten)]
    pub derived: Derived,
    pub rank: Option<Rank>,
    pub created_at: String,
    pub updated_at: String,
}

impl GradeRecord {
    pub fn entries(&self, kind: ScoreKind) -> &[ScoreEntry] {
        match kind {
            ScoreKind::Class => &self.class_scores,
            ScoreKind::Exam => &self.exam_scores,
        }
    }

    pub fn entries_mut(&mut self, kind: ScoreKind) -> &mut Vec<ScoreEntry> {
        match kind {
            ScoreKind::Class => &mut self.class_scores,
            ScoreKind::Exam => &mut self.exam_scores,
        }
    }

    /// Locate an entry by id across both lists.
    pub fn locate_entry(&self, score_id: &str) -> Option<(ScoreKind, usize)> {
        for kind in [ScoreKind::Class, ScoreKind::Exam] {
            if let Some(i) = self.entries(kind).iter().position(|e| e.id == score_id) {
                return Some((kind, i));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.class_scores.is_empty() && self.exam_scores.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub student_id: String,
    pub term: String,
    pub academic_year: String,
    pub subjects: Vec<GradeRecord>,
    pub subject_count: usize,
    pub average_grade_point: f64,
    pub overall_percentage: f64,
    pub total_score: f64,
    pub max_total_score: f64,
    pub passed_subjects: usize,
    pub failed_subjects: usize,
}
