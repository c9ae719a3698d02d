// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{
        AttemptListParams, AttemptResponse, CreateQuizRequest, Participant, Question, Quiz,
        QuizAttempt, QuizListParams, QuizPaper, QuizStats, QuizStatus, StudentAttemptRequest,
        SubmittedAnswer, UpdateQuizRequest,
    },
    scoring::quiz::score_quiz,
    store::{Db, Tables},
    utils::{
        html::{clean_html, clean_opt},
        validation::normalize_phone,
    },
};

/// Sanitizes the text a participant will see.
fn clean_questions(questions: Vec<Question>) -> Vec<Question> {
    questions
        .into_iter()
        .map(|q| Question {
            question: clean_html(&q.question),
            options: q.options.iter().map(|opt| clean_html(opt)).collect(),
            ..q
        })
        .collect()
}

fn find_quiz(tables: &Tables, id: i64) -> Result<&Quiz, AppError> {
    tables
        .quizzes
        .get(id)
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

fn has_attempts(tables: &Tables, quiz_id: i64) -> bool {
    tables.attempts.values().any(|a| a.quiz_id == quiz_id)
}

/// Students are identified by id, public participants by their phone digits.
fn same_participant(a: &Participant, b: &Participant) -> bool {
    match (a, b) {
        (Participant::Student { student_id: x }, Participant::Student { student_id: y }) => x == y,
        (Participant::Public { phone: x, .. }, Participant::Public { phone: y, .. }) => {
            normalize_phone(x) == normalize_phone(y)
        }
        _ => false,
    }
}

/// Scores and stores an attempt. Shared by the student and public submit routes.
///
/// * The quiz must be active.
/// * Each participant gets exactly one attempt per quiz.
pub(crate) fn record_attempt(
    tables: &mut Tables,
    quiz_id: i64,
    participant: Participant,
    answers: Vec<SubmittedAnswer>,
    time_taken_seconds: Option<u32>,
) -> Result<AttemptResponse, AppError> {
    let quiz = find_quiz(tables, quiz_id)?;

    if quiz.status != QuizStatus::Active {
        return Err(AppError::Conflict("Quiz is not accepting attempts".to_string()));
    }

    let duplicate = tables
        .attempts
        .values()
        .any(|a| a.quiz_id == quiz_id && same_participant(&a.participant, &participant));
    if duplicate {
        tracing::warn!(quiz_id, "Duplicate quiz attempt rejected");
        return Err(AppError::Conflict(
            "This participant has already attempted the quiz".to_string(),
        ));
    }

    let outcome = score_quiz(&quiz.questions, &answers, quiz.passing_score);

    let attempt = tables
        .attempts
        .insert_with(|id| QuizAttempt {
            id,
            quiz_id,
            participant,
            answers,
            score: outcome.score,
            total_points: outcome.total_points,
            percentage: outcome.percentage,
            passed: outcome.passed,
            time_taken_seconds,
            submitted_at: Utc::now(),
        })
        .clone();

    tracing::info!(
        quiz_id,
        attempt_id = attempt.id,
        score = attempt.score,
        percentage = attempt.percentage,
        passed = attempt.passed,
        "Quiz attempt recorded"
    );

    Ok(AttemptResponse {
        attempt,
        breakdown: outcome.breakdown,
    })
}

/// Lists quizzes with their answer keys. Staff view.
pub async fn list_quizzes(
    State(db): State<Db>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let quizzes: Vec<Quiz> = tables
        .quizzes
        .values()
        .filter(|q| params.status.is_none_or(|status| q.status == status))
        .filter(|q| params.is_public.is_none_or(|public| q.is_public == public))
        .cloned()
        .collect();

    Ok(Json(quizzes))
}

pub async fn get_quiz(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    Ok(Json(find_quiz(&tables, id)?.clone()))
}

/// Creates a quiz in `draft`.
pub async fn create_quiz(
    State(db): State<Db>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut tables = db.write().await;

    if let Some(class_id) = payload.class_id {
        if !tables.classes.contains(class_id) {
            return Err(AppError::BadRequest(format!("Class {} does not exist", class_id)));
        }
    }

    let quiz = tables
        .quizzes
        .insert_with(|id| Quiz {
            id,
            title: clean_html(payload.title.trim()),
            description: clean_opt(payload.description),
            duration_minutes: payload.duration_minutes,
            passing_score: payload.passing_score,
            questions: clean_questions(payload.questions),
            status: QuizStatus::Draft,
            is_public: payload.is_public,
            class_id: payload.class_id,
            created_at: Utc::now(),
        })
        .clone();

    tracing::info!(
        quiz_id = quiz.id,
        questions = quiz.questions.len(),
        "Quiz created"
    );

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates a quiz.
///
/// Once anyone has attempted it, its questions and passing score are frozen
/// and it cannot go back to draft.
pub async fn update_quiz(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut tables = db.write().await;

    let current = find_quiz(&tables, id)?.status;
    let attempted = has_attempts(&tables, id);

    if attempted && (payload.questions.is_some() || payload.passing_score.is_some()) {
        return Err(AppError::Conflict(
            "Questions and passing score cannot change after the quiz has been attempted"
                .to_string(),
        ));
    }

    if let Some(target) = payload.status {
        let back_to_draft = target == QuizStatus::Draft && current != QuizStatus::Draft;
        if !current.can_transition_to(target) || (back_to_draft && attempted) {
            tracing::warn!(quiz_id = id, from = ?current, to = ?target, "Rejected quiz status change");
            return Err(AppError::Conflict(format!(
                "Cannot move quiz from {:?} to {:?}",
                current, target
            )));
        }
    }

    if let Some(class_id) = payload.class_id {
        if !tables.classes.contains(class_id) {
            return Err(AppError::BadRequest(format!("Class {} does not exist", class_id)));
        }
    }

    let quiz = tables
        .quizzes
        .get_mut(id)
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if let Some(title) = payload.title {
        quiz.title = clean_html(title.trim());
    }
    if let Some(description) = payload.description {
        quiz.description = Some(clean_html(&description));
    }
    if let Some(duration) = payload.duration_minutes {
        quiz.duration_minutes = duration;
    }
    if let Some(passing_score) = payload.passing_score {
        quiz.passing_score = passing_score;
    }
    if let Some(questions) = payload.questions {
        quiz.questions = clean_questions(questions);
    }
    if let Some(status) = payload.status {
        quiz.status = status;
    }
    if let Some(is_public) = payload.is_public {
        quiz.is_public = is_public;
    }
    if payload.class_id.is_some() {
        quiz.class_id = payload.class_id;
    }

    Ok(Json(quiz.clone()))
}

/// Deletes a quiz and all of its attempts.
pub async fn delete_quiz(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;

    if tables.quizzes.remove(id).is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    tables.attempts.retain(|a| a.quiz_id != id);

    tracing::info!(quiz_id = id, "Quiz deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the paper of an active quiz, without the answer key.
pub async fn get_paper(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let quiz = find_quiz(&tables, id)?;

    if quiz.status != QuizStatus::Active {
        return Err(AppError::Conflict("Quiz is not active".to_string()));
    }

    Ok(Json(QuizPaper::from(quiz)))
}

/// Attempt count, pass count, average and best percentage of a quiz.
pub async fn quiz_stats(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    find_quiz(&tables, id)?;

    let percentages: Vec<u32> = tables
        .attempts
        .values()
        .filter(|a| a.quiz_id == id)
        .map(|a| a.percentage)
        .collect();
    let passed = tables
        .attempts
        .values()
        .filter(|a| a.quiz_id == id && a.passed)
        .count();

    let average_percentage = if percentages.is_empty() {
        0.0
    } else {
        let sum: u32 = percentages.iter().sum();
        crate::scoring::exam::round2(f64::from(sum) / percentages.len() as f64)
    };

    Ok(Json(QuizStats {
        quiz_id: id,
        attempts: percentages.len(),
        passed,
        average_percentage,
        highest_percentage: percentages.iter().copied().max().unwrap_or(0),
    }))
}

/// Lists attempts, optionally of one quiz.
pub async fn list_attempts(
    State(db): State<Db>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let attempts: Vec<QuizAttempt> = tables
        .attempts
        .values()
        .filter(|a| params.quiz_id.is_none_or(|quiz_id| a.quiz_id == quiz_id))
        .cloned()
        .collect();

    Ok(Json(attempts))
}

/// Submits a student's answers and scores them.
pub async fn submit_attempt(
    State(db): State<Db>,
    Json(payload): Json<StudentAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    if !tables.students.contains(payload.student_id) {
        return Err(AppError::BadRequest(format!(
            "Student {} does not exist",
            payload.student_id
        )));
    }

    let response = record_attempt(
        &mut tables,
        payload.quiz_id,
        Participant::Student {
            student_id: payload.student_id,
        },
        payload.answers,
        payload.time_taken_seconds,
    )?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Deletes an attempt, letting the participant try again.
pub async fn delete_attempt(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;

    if tables.attempts.remove(id).is_none() {
        return Err(AppError::NotFound("Attempt not found".to_string()));
    }

    tracing::info!(attempt_id = id, "Quiz attempt deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_participants_match_on_phone_digits() {
        let a = Participant::Public {
            name: "Rina".to_string(),
            phone: "+1 555-123-4567".to_string(),
            place: None,
        };
        let b = Participant::Public {
            name: "Rina K.".to_string(),
            phone: "15551234567".to_string(),
            place: Some("Springfield".to_string()),
        };
        assert!(same_participant(&a, &b));
    }

    #[test]
    fn students_and_public_never_match() {
        let student = Participant::Student { student_id: 1 };
        let public = Participant::Public {
            name: "1".to_string(),
            phone: "0000001".to_string(),
            place: None,
        };
        assert!(!same_participant(&student, &public));
        assert!(same_participant(&student, &Participant::Student { student_id: 1 }));
    }
}
