// src/handlers/public.rs

//! Routes reachable by students, guardians and visitors.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::quiz::record_attempt,
    models::{
        exam::{ExamStatus, PublicResultParams},
        quiz::{Participant, PublicAttemptRequest, QuizPaper, QuizStatus},
    },
    scoring::exam::RankedReport,
    store::Db,
    utils::html::{clean_html, clean_opt},
};

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Paper of a public, active quiz. Anything else looks like it does not exist.
pub async fn get_public_quiz(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let quiz = tables
        .quizzes
        .get(id)
        .filter(|q| q.is_public && q.status == QuizStatus::Active)
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(QuizPaper::from(quiz)))
}

/// Submits an attempt from someone outside the school.
pub async fn submit_public_attempt(
    State(db): State<Db>,
    Json(payload): Json<PublicAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    let is_public = tables
        .quizzes
        .get(payload.quiz_id)
        .is_some_and(|q| q.is_public);
    if !is_public {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let participant = Participant::Public {
        name: clean_html(payload.name.trim()),
        phone: payload.phone.trim().to_string(),
        place: clean_opt(payload.place),
    };

    let response = record_attempt(
        &mut tables,
        payload.quiz_id,
        participant,
        payload.answers,
        payload.time_taken_seconds,
    )?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Serialize)]
pub struct PublishedCategoryResult {
    pub category_id: i64,
    pub category_name: String,
    #[serde(flatten)]
    pub result: RankedReport,
}

#[derive(Debug, Serialize)]
pub struct PublicResults {
    pub student_name: String,
    pub registration_number: String,
    pub class_name: Option<String>,
    pub results: Vec<PublishedCategoryResult>,
}

/// Published results of one student, looked up by registration number and date of birth.
///
/// An unknown registration number and a wrong date of birth give the same 404.
pub async fn public_results(
    State(db): State<Db>,
    State(config): State<Config>,
    Query(params): Query<PublicResultParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let student = tables
        .student_by_registration(params.registration_number.trim())
        .filter(|s| s.date_of_birth == params.date_of_birth)
        .ok_or(AppError::NotFound(
            "No student matches this registration number and date of birth".to_string(),
        ))?;

    let mut results = Vec::new();
    for category in tables
        .categories
        .values()
        .filter(|c| c.status == ExamStatus::Published)
    {
        let Some(reports) = tables.category_reports(category.id, config.pass_mark_ratio) else {
            continue;
        };
        if let Some(report) = reports
            .into_iter()
            .find(|r| r.report.student_id == student.id)
        {
            results.push(PublishedCategoryResult {
                category_id: category.id,
                category_name: category.name.clone(),
                result: report,
            });
        }
    }

    tracing::info!(
        student_id = student.id,
        categories = results.len(),
        "Public results served"
    );

    Ok(Json(PublicResults {
        student_name: student.name.clone(),
        registration_number: student.registration_number.clone(),
        class_name: student
            .class_id
            .and_then(|id| tables.classes.get(id))
            .map(|c| c.name.clone()),
        results,
    }))
}
