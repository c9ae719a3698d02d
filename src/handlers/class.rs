// src/handlers/class.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::class::{CreateClassRequest, SchoolClass, UpdateClassRequest},
    store::{Db, Tables},
    utils::{
        html::{clean_html, clean_opt},
        validation::dedup_ids,
    },
};

/// Fails on the first id that is not a known student.
fn ensure_students_exist(tables: &Tables, student_ids: &[i64]) -> Result<(), AppError> {
    match student_ids.iter().find(|id| !tables.students.contains(**id)) {
        Some(missing) => Err(AppError::BadRequest(format!("Student {} does not exist", missing))),
        None => Ok(()),
    }
}

pub async fn list_classes(State(db): State<Db>) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let classes: Vec<SchoolClass> = tables.classes.values().cloned().collect();
    Ok(Json(classes))
}

pub async fn get_class(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let class = tables
        .classes
        .get(id)
        .cloned()
        .ok_or(AppError::NotFound("Class not found".to_string()))?;

    Ok(Json(class))
}

pub async fn create_class(
    State(db): State<Db>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let student_ids = dedup_ids(payload.student_ids);

    let mut tables = db.write().await;
    ensure_students_exist(&tables, &student_ids)?;

    let class_id = tables
        .classes
        .insert_with(|id| SchoolClass {
            id,
            name: clean_html(payload.name.trim()),
            section: clean_opt(payload.section),
            student_ids: Vec::new(),
            teacher_ids: dedup_ids(payload.teacher_ids),
            book_ids: dedup_ids(payload.book_ids),
            created_at: Utc::now(),
        })
        .id;
    tables.assign_students(class_id, student_ids);

    let class = tables
        .classes
        .get(class_id)
        .cloned()
        .ok_or(AppError::InternalServerError("Class vanished after insert".to_string()))?;

    tracing::info!(class_id, name = %class.name, "Class created");

    Ok((StatusCode::CREATED, Json(class)))
}

/// Updates a class. Each supplied id array replaces the stored one wholesale.
pub async fn update_class(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    if !tables.classes.contains(id) {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    if let Some(student_ids) = payload.student_ids {
        let student_ids = dedup_ids(student_ids);
        ensure_students_exist(&tables, &student_ids)?;
        tables.assign_students(id, student_ids);
    }

    let class = tables
        .classes
        .get_mut(id)
        .ok_or(AppError::NotFound("Class not found".to_string()))?;

    if let Some(name) = payload.name {
        class.name = clean_html(name.trim());
    }

    if let Some(section) = payload.section {
        // empty string clears the section
        class.section = clean_opt(Some(section).filter(|s| !s.trim().is_empty()));
    }

    if let Some(teacher_ids) = payload.teacher_ids {
        class.teacher_ids = dedup_ids(teacher_ids);
    }

    if let Some(book_ids) = payload.book_ids {
        class.book_ids = dedup_ids(book_ids);
    }

    tracing::info!(
        class_id = id,
        students = class.student_ids.len(),
        teachers = class.teacher_ids.len(),
        books = class.book_ids.len(),
        "Class updated"
    );

    Ok(Json(class.clone()))
}

/// Deletes a class. Its students stay enrolled but lose their class.
pub async fn delete_class(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;

    if !tables.classes.contains(id) {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    tables.assign_students(id, Vec::new());
    tables.classes.remove(id);
    tables
        .admission_settings
        .open_class_ids
        .retain(|class_id| *class_id != id);

    tracing::info!(class_id = id, "Class deleted");

    Ok(StatusCode::NO_CONTENT)
}
