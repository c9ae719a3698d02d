// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Results-publication lifecycle of an exam category.
///
/// `Draft -> Open -> Closed -> Scoring -> Published`, one step at a time.
/// `Published` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Draft,
    Open,
    Closed,
    Scoring,
    Published,
}

impl ExamStatus {
    /// The only status this one may move to, `None` when terminal.
    pub fn next(self) -> Option<Self> {
        match self {
            ExamStatus::Draft => Some(ExamStatus::Open),
            ExamStatus::Open => Some(ExamStatus::Closed),
            ExamStatus::Closed => Some(ExamStatus::Scoring),
            ExamStatus::Scoring => Some(ExamStatus::Published),
            ExamStatus::Published => None,
        }
    }

    /// Staying put is allowed; anything other than the single next step is not.
    pub fn can_transition_to(self, target: Self) -> bool {
        self == target || self.next() == Some(target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExamStatus::Draft => "draft",
            ExamStatus::Open => "open",
            ExamStatus::Closed => "closed",
            ExamStatus::Scoring => "scoring",
            ExamStatus::Published => "published",
        }
    }
}

/// A named exam period (e.g. "First Term 2026") grouping subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: ExamStatus,

    /// Students sitting this exam. Empty means every student may be scored.
    pub selected_student_ids: Vec<i64>,

    pub created_at: DateTime<Utc>,
}

impl ExamCategory {
    pub fn accepts_student(&self, student_id: i64) -> bool {
        self.selected_student_ids.is_empty() || self.selected_student_ids.contains(&student_id)
    }
}

/// Category plus its subjects, as returned by the API.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    #[serde(flatten)]
    pub category: ExamCategory,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub selected_student_ids: Vec<i64>,
}

/// DTO for updating a category. `status` drives the lifecycle.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<ExamStatus>,
    pub selected_student_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryListParams {
    pub status: Option<ExamStatus>,
}

/// A scored component of an exam category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub max_score: f64,

    /// Minimum score to pass. Falls back to a fraction of `max_score` when unset.
    pub pass_marks: Option<f64>,

    /// Display order within the category.
    pub order: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_pass_marks_within_max))]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(exclusive_min = 0.0, max = 10000.0))]
    pub max_score: f64,
    #[validate(range(min = 0.0))]
    pub pass_marks: Option<f64>,
    #[serde(default)]
    pub order: i32,
}

fn validate_pass_marks_within_max(
    req: &CreateSubjectRequest,
) -> Result<(), validator::ValidationError> {
    match req.pass_marks {
        Some(pass) if pass > req.max_score => Err(validator::ValidationError::new(
            "pass_marks_exceed_max_score",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(exclusive_min = 0.0, max = 10000.0))]
    pub max_score: Option<f64>,
    #[validate(range(min = 0.0))]
    pub pass_marks: Option<f64>,
    pub order: Option<i32>,
}

/// One stored score. Unique per (student, subject).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub category_id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub score: f64,
    pub updated_at: DateTime<Utc>,
}

/// DTO for entering (or re-entering) one score.
#[derive(Debug, Deserialize, Validate)]
pub struct ScoreEntryRequest {
    pub category_id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    #[validate(range(min = 0.0))]
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BulkScoreEntry {
    pub student_id: i64,
    pub subject_id: i64,
    #[validate(range(min = 0.0))]
    pub score: f64,
}

/// DTO for entering many scores of one category at once.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkScoreRequest {
    pub category_id: i64,
    #[validate(length(min = 1, max = 5000), nested)]
    pub entries: Vec<BulkScoreEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ResultListParams {
    pub category_id: Option<i64>,
    pub student_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PublicResultParams {
    pub registration_number: String,
    pub date_of_birth: chrono::NaiveDate,
}
