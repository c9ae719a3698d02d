// src/handlers/result.rs

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
    models::exam::{
        BulkScoreRequest, ExamCategory, ExamResult, ExamStatus, ResultListParams,
        ScoreEntryRequest,
    },
    store::{Db, Tables},
};

/// Scores can only be entered while the category is in `scoring`.
fn scoring_category(tables: &Tables, category_id: i64) -> Result<&ExamCategory, AppError> {
    let category = tables
        .categories
        .get(category_id)
        .ok_or(AppError::NotFound("Exam category not found".to_string()))?;

    if category.status != ExamStatus::Scoring {
        tracing::warn!(
            category_id,
            status = category.status.as_str(),
            "Score entry rejected outside the scoring phase"
        );
        return Err(AppError::Conflict(format!(
            "Scores can only be entered while the exam category is in 'scoring' (currently '{}')",
            category.status.as_str()
        )));
    }

    Ok(category)
}

/// Checks one (student, subject, score) entry against the category.
fn check_entry(
    tables: &Tables,
    category: &ExamCategory,
    student_id: i64,
    subject_id: i64,
    score: f64,
) -> Result<(), AppError> {
    let subject = tables
        .subjects
        .get(subject_id)
        .filter(|s| s.category_id == category.id)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Subject {} does not belong to exam category {}",
                subject_id, category.id
            ))
        })?;

    if !tables.students.contains(student_id) {
        return Err(AppError::BadRequest(format!("Student {} does not exist", student_id)));
    }

    if !category.accepts_student(student_id) {
        return Err(AppError::BadRequest(format!(
            "Student {} is not selected for this exam",
            student_id
        )));
    }

    if !score.is_finite() || score < 0.0 {
        return Err(AppError::BadRequest("Score must be a non-negative number".to_string()));
    }

    if score > subject.max_score {
        return Err(AppError::BadRequest(format!(
            "Score {} exceeds the max score {} of '{}'",
            score, subject.max_score, subject.name
        )));
    }

    Ok(())
}

/// Inserts or overwrites the score of (student, subject). Returns the row and
/// whether it was newly created.
fn upsert_score(
    tables: &mut Tables,
    category_id: i64,
    student_id: i64,
    subject_id: i64,
    score: f64,
) -> (ExamResult, bool) {
    let existing = tables.find_result(student_id, subject_id).map(|r| r.id);

    match existing.and_then(|id| tables.results.get_mut(id)) {
        Some(result) => {
            result.score = score;
            result.updated_at = Utc::now();
            (result.clone(), false)
        }
        None => {
            let result = tables
                .results
                .insert_with(|id| ExamResult {
                    id,
                    category_id,
                    student_id,
                    subject_id,
                    score,
                    updated_at: Utc::now(),
                })
                .clone();
            (result, true)
        }
    }
}

/// Lists stored scores, optionally filtered by category and student.
pub async fn list_results(
    State(db): State<Db>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let results: Vec<ExamResult> = tables
        .results
        .values()
        .filter(|r| params.category_id.is_none_or(|id| r.category_id == id))
        .filter(|r| params.student_id.is_none_or(|id| r.student_id == id))
        .cloned()
        .collect();

    Ok(Json(results))
}

/// Enters one score. Re-submitting for the same (student, subject) overwrites it.
pub async fn enter_score(
    State(db): State<Db>,
    Json(payload): Json<ScoreEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    let category = scoring_category(&tables, payload.category_id)?;
    check_entry(
        &tables,
        category,
        payload.student_id,
        payload.subject_id,
        payload.score,
    )?;

    let (result, created) = upsert_score(
        &mut tables,
        payload.category_id,
        payload.student_id,
        payload.subject_id,
        payload.score,
    );

    tracing::info!(
        category_id = result.category_id,
        student_id = result.student_id,
        subject_id = result.subject_id,
        created,
        "Score recorded"
    );

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(result)))
}

/// Enters many scores of one category. Nothing is stored unless every entry is valid.
pub async fn enter_scores_bulk(
    State(db): State<Db>,
    Json(payload): Json<BulkScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    let category = scoring_category(&tables, payload.category_id)?;
    for (index, entry) in payload.entries.iter().enumerate() {
        check_entry(&tables, category, entry.student_id, entry.subject_id, entry.score).map_err(
            |e| match e {
                AppError::BadRequest(msg) => AppError::BadRequest(format!("Entry {}: {}", index, msg)),
                other => other,
            },
        )?;
    }

    let mut created = 0;
    let mut updated = 0;
    let mut results = Vec::with_capacity(payload.entries.len());
    for entry in &payload.entries {
        let (result, is_new) = upsert_score(
            &mut tables,
            payload.category_id,
            entry.student_id,
            entry.subject_id,
            entry.score,
        );
        if is_new {
            created += 1;
        } else {
            updated += 1;
        }
        results.push(result);
    }

    tracing::info!(
        category_id = payload.category_id,
        created,
        updated,
        "Bulk scores recorded"
    );

    Ok(Json(serde_json::json!({
        "created": created,
        "updated": updated,
        "results": results,
    })))
}

/// Deletes one stored score.
pub async fn delete_result(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;

    let removed = tables
        .results
        .remove(id)
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    tracing::info!(
        result_id = id,
        student_id = removed.student_id,
        subject_id = removed.subject_id,
        "Score deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
