// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::exam::{
        CategoryListParams, CategoryResponse, CreateCategoryRequest, CreateSubjectRequest,
        ExamCategory, ExamStatus, Subject, UpdateCategoryRequest, UpdateSubjectRequest,
    },
    scoring::exam::RankedReport,
    store::{Db, Tables},
    utils::{
        html::{clean_html, clean_opt},
        validation::dedup_ids,
    },
};

fn category_response(tables: &Tables, category: &ExamCategory) -> CategoryResponse {
    CategoryResponse {
        category: category.clone(),
        subjects: tables.subjects_of(category.id),
    }
}

fn find_category<'a>(tables: &'a Tables, id: i64) -> Result<&'a ExamCategory, AppError> {
    tables
        .categories
        .get(id)
        .ok_or(AppError::NotFound("Exam category not found".to_string()))
}

/// Subjects are frozen once results are published.
fn ensure_subjects_editable(category: &ExamCategory) -> Result<(), AppError> {
    if category.status == ExamStatus::Published {
        return Err(AppError::Conflict(
            "Subjects of a published exam category cannot be changed".to_string(),
        ));
    }
    Ok(())
}

fn ensure_students_exist(tables: &Tables, student_ids: &[i64]) -> Result<(), AppError> {
    match student_ids.iter().find(|id| !tables.students.contains(**id)) {
        Some(missing) => Err(AppError::BadRequest(format!("Student {} does not exist", missing))),
        None => Ok(()),
    }
}

pub async fn list_categories(
    State(db): State<Db>,
    Query(params): Query<CategoryListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let categories: Vec<CategoryResponse> = tables
        .categories
        .values()
        .filter(|c| params.status.is_none_or(|status| c.status == status))
        .map(|c| category_response(&tables, c))
        .collect();

    Ok(Json(categories))
}

pub async fn get_category(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let category = find_category(&tables, id)?;
    Ok(Json(category_response(&tables, category)))
}

/// Creates an exam category in `draft`.
pub async fn create_category(
    State(db): State<Db>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let selected_student_ids = dedup_ids(payload.selected_student_ids);

    let mut tables = db.write().await;
    ensure_students_exist(&tables, &selected_student_ids)?;

    let category = tables
        .categories
        .insert_with(|id| ExamCategory {
            id,
            name: clean_html(payload.name.trim()),
            description: clean_opt(payload.description),
            status: ExamStatus::Draft,
            selected_student_ids,
            created_at: Utc::now(),
        })
        .clone();

    tracing::info!(category_id = category.id, name = %category.name, "Exam category created");

    Ok((StatusCode::CREATED, Json(category_response(&tables, &category))))
}

/// Updates a category.
///
/// A `status` field moves the lifecycle one step forward
/// (draft -> open -> closed -> scoring -> published). Published is terminal
/// and its student selection is frozen.
pub async fn update_category(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;
    let current = find_category(&tables, id)?.status;

    if let Some(target) = payload.status {
        if !current.can_transition_to(target) {
            tracing::warn!(
                category_id = id,
                from = current.as_str(),
                to = target.as_str(),
                "Rejected exam status transition"
            );
            return Err(AppError::Conflict(format!(
                "Cannot move exam category from '{}' to '{}'",
                current.as_str(),
                target.as_str()
            )));
        }
    }

    let selected_student_ids = match payload.selected_student_ids {
        Some(ids) => {
            if current == ExamStatus::Published {
                return Err(AppError::Conflict(
                    "Student selection of a published exam category cannot be changed".to_string(),
                ));
            }
            let ids = dedup_ids(ids);
            ensure_students_exist(&tables, &ids)?;
            Some(ids)
        }
        None => None,
    };

    let category = tables
        .categories
        .get_mut(id)
        .ok_or(AppError::NotFound("Exam category not found".to_string()))?;

    if let Some(name) = payload.name {
        category.name = clean_html(name.trim());
    }
    if let Some(description) = payload.description {
        category.description = Some(clean_html(&description));
    }
    if let Some(ids) = selected_student_ids {
        category.selected_student_ids = ids;
    }
    if let Some(target) = payload.status {
        if target != current {
            category.status = target;
            tracing::info!(
                category_id = id,
                from = current.as_str(),
                to = target.as_str(),
                "Exam category status changed"
            );
        }
    }

    let category = category.clone();
    Ok(Json(category_response(&tables, &category)))
}

/// Deletes a category with its subjects and results.
pub async fn delete_category(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;

    if tables.categories.remove(id).is_none() {
        return Err(AppError::NotFound("Exam category not found".to_string()));
    }
    tables.subjects.retain(|s| s.category_id != id);
    tables.results.retain(|r| r.category_id != id);

    tracing::info!(category_id = id, "Exam category deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_subjects(
    State(db): State<Db>,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    find_category(&tables, category_id)?;
    Ok(Json(tables.subjects_of(category_id)))
}

pub async fn create_subject(
    State(db): State<Db>,
    Path(category_id): Path<i64>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;
    ensure_subjects_editable(find_category(&tables, category_id)?)?;

    let subject = tables
        .subjects
        .insert_with(|id| Subject {
            id,
            category_id,
            name: clean_html(payload.name.trim()),
            max_score: payload.max_score,
            pass_marks: payload.pass_marks,
            order: payload.order,
        })
        .clone();

    tracing::info!(category_id, subject_id = subject.id, "Subject created");

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Updates a subject. The max score cannot drop below a score already entered.
pub async fn update_subject(
    State(db): State<Db>,
    Path((category_id, subject_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;
    ensure_subjects_editable(find_category(&tables, category_id)?)?;

    let existing = tables
        .subjects
        .get(subject_id)
        .filter(|s| s.category_id == category_id)
        .cloned()
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    let max_score = payload.max_score.unwrap_or(existing.max_score);
    let pass_marks = payload.pass_marks.or(existing.pass_marks);

    if pass_marks.is_some_and(|pass| pass > max_score) {
        return Err(AppError::BadRequest(
            "Pass marks cannot exceed the max score".to_string(),
        ));
    }

    let highest_entered = tables
        .results
        .values()
        .filter(|r| r.subject_id == subject_id)
        .map(|r| r.score)
        .fold(0.0_f64, f64::max);
    if highest_entered > max_score {
        return Err(AppError::Conflict(format!(
            "A score of {} has already been entered; max score cannot be lower",
            highest_entered
        )));
    }

    let subject = tables
        .subjects
        .get_mut(subject_id)
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    if let Some(name) = payload.name {
        subject.name = clean_html(name.trim());
    }
    subject.max_score = max_score;
    subject.pass_marks = pass_marks;
    if let Some(order) = payload.order {
        subject.order = order;
    }

    Ok(Json(subject.clone()))
}

/// Deletes a subject and every score entered for it.
pub async fn delete_subject(
    State(db): State<Db>,
    Path((category_id, subject_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;
    ensure_subjects_editable(find_category(&tables, category_id)?)?;

    let belongs = tables
        .subjects
        .get(subject_id)
        .is_some_and(|s| s.category_id == category_id);
    if !belongs {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    tables.subjects.remove(subject_id);
    tables.results.retain(|r| r.subject_id != subject_id);

    tracing::info!(category_id, subject_id, "Subject deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Summary row: a ranked report with the student's identity attached.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub student_name: Option<String>,
    pub registration_number: Option<String>,
    #[serde(flatten)]
    pub report: RankedReport,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub category: CategoryResponse,
    pub students: usize,
    pub passed: usize,
    pub average_percentage: f64,
    pub results: Vec<SummaryRow>,
}

/// Aggregated, ranked results of every student in a category.
pub async fn category_summary(
    State(db): State<Db>,
    State(config): State<Config>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let category = find_category(&tables, id)?;

    let reports = tables
        .category_reports(id, config.pass_mark_ratio)
        .ok_or(AppError::NotFound("Exam category not found".to_string()))?;

    let students = reports.len();
    let passed = reports.iter().filter(|r| r.report.passed).count();
    let average_percentage = if students == 0 {
        0.0
    } else {
        let sum: f64 = reports.iter().map(|r| r.report.aggregate.percentage).sum();
        crate::scoring::exam::round2(sum / students as f64)
    };

    let results = reports
        .into_iter()
        .map(|report| {
            let student = tables.students.get(report.report.student_id);
            SummaryRow {
                student_name: student.map(|s| s.name.clone()),
                registration_number: student.map(|s| s.registration_number.clone()),
                report,
            }
        })
        .collect();

    Ok(Json(CategorySummary {
        category: category_response(&tables, category),
        students,
        passed,
        average_percentage,
        results,
    }))
}
