// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::{validate_not_blank, validate_phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Draft,
    Active,
    Closed,
}

impl QuizStatus {
    /// Draft opens once; an active quiz can be closed and reopened.
    /// Returning to draft is decided by the caller, which knows about attempts.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (QuizStatus::Draft, QuizStatus::Active)
                | (QuizStatus::Active, QuizStatus::Closed)
                | (QuizStatus::Closed, QuizStatus::Active)
                | (QuizStatus::Active, QuizStatus::Draft)
                | (QuizStatus::Closed, QuizStatus::Draft)
        ) || self == target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_question_shape))]
pub struct Question {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
    pub question_type: QuestionType,
    #[validate(length(min = 2, max = 10))]
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, max = 100))]
    pub points: u32,
}

fn default_points() -> u32 {
    1
}

fn validate_question_shape(q: &Question) -> Result<(), validator::ValidationError> {
    if q.question_type == QuestionType::TrueFalse && q.options.len() != 2 {
        return Err(validator::ValidationError::new("true_false_needs_two_options"));
    }
    if q.correct_answer_index >= q.options.len() {
        return Err(validator::ValidationError::new("correct_answer_out_of_range"));
    }
    if q.options.iter().any(|opt| opt.trim().is_empty() || opt.len() > 500) {
        return Err(validator::ValidationError::new("invalid_option"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Time limit enforced by the client-side countdown.
    pub duration_minutes: u32,

    /// Minimum percentage (0..=100) to pass.
    pub passing_score: u32,

    pub questions: Vec<Question>,
    pub status: QuizStatus,

    /// Open to participants outside the school (name + phone instead of a student id).
    pub is_public: bool,

    /// Class the quiz is aimed at, informational only.
    pub class_id: Option<i64>,

    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// DTO for sending a question to participants (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub question: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub points: u32,
}

/// DTO for delivering a quiz paper.
#[derive(Debug, Serialize)]
pub struct QuizPaper {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub passing_score: u32,
    pub total_points: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Quiz> for QuizPaper {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            duration_minutes: quiz.duration_minutes,
            passing_score: quiz.passing_score,
            total_points: quiz.total_points(),
            questions: quiz
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    question: q.question.clone(),
                    question_type: q.question_type,
                    options: q.options.clone(),
                    points: q.points,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: u32,
    #[validate(range(max = 100))]
    pub passing_score: u32,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub is_public: bool,
    pub class_id: Option<i64>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<u32>,
    #[validate(range(max = 100))]
    pub passing_score: Option<u32>,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Option<Vec<Question>>,
    pub status: Option<QuizStatus>,
    pub is_public: Option<bool>,
    pub class_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    pub status: Option<QuizStatus>,
    pub is_public: Option<bool>,
}

/// Who took the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    Student {
        student_id: i64,
    },
    Public {
        name: String,
        phone: String,
        place: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_index: usize,
    /// `None` when the participant skipped the question.
    pub selected_answer: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub participant: Participant,
    pub answers: Vec<SubmittedAnswer>,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub passed: bool,
    pub time_taken_seconds: Option<u32>,
    pub submitted_at: DateTime<Utc>,
}

/// Attempt plus the per-question breakdown, returned to the participant on submit.
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub breakdown: Vec<crate::scoring::quiz::QuestionOutcome>,
}

/// DTO for a student's attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct StudentAttemptRequest {
    pub quiz_id: i64,
    pub student_id: i64,
    #[validate(length(max = 500))]
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken_seconds: Option<u32>,
}

/// DTO for an attempt by someone outside the school.
#[derive(Debug, Deserialize, Validate)]
pub struct PublicAttemptRequest {
    pub quiz_id: i64,
    #[validate(length(min = 1, max = 100), custom(function = validate_not_blank))]
    pub name: String,
    #[validate(custom(function = validate_phone))]
    pub phone: String,
    #[validate(length(max = 100))]
    pub place: Option<String>,
    #[validate(length(max = 500))]
    pub answers: Vec<SubmittedAnswer>,
    pub time_taken_seconds: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AttemptListParams {
    pub quiz_id: Option<i64>,
}

/// Aggregate view over a quiz's attempts.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuizStats {
    pub quiz_id: i64,
    pub attempts: usize,
    pub passed: usize,
    pub average_percentage: f64,
    pub highest_percentage: u32,
}
