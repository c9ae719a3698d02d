// src/handlers/student.rs

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
    models::student::{CreateStudentRequest, Student, StudentListParams},
    store::Db,
    utils::html::clean_html,
};

/// Lists students, optionally only those of one class.
pub async fn list_students(
    State(db): State<Db>,
    Query(params): Query<StudentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let students: Vec<Student> = tables
        .students
        .values()
        .filter(|s| params.class_id.is_none_or(|class_id| s.class_id == Some(class_id)))
        .cloned()
        .collect();

    Ok(Json(students))
}

pub async fn get_student(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let student = tables
        .students
        .get(id)
        .cloned()
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}

/// Enrolls a student directly and issues a registration number.
pub async fn create_student(
    State(db): State<Db>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    if let Some(class_id) = payload.class_id {
        if !tables.classes.contains(class_id) {
            return Err(AppError::BadRequest(format!("Class {} does not exist", class_id)));
        }
    }

    let registration_number = tables.issue_registration_number();
    let student_id = tables
        .students
        .insert_with(|id| Student {
            id,
            registration_number,
            name: clean_html(payload.name.trim()),
            date_of_birth: payload.date_of_birth,
            phone: payload.phone.map(|p| p.trim().to_string()),
            class_id: None,
            created_at: Utc::now(),
        })
        .id;

    if let Some(class_id) = payload.class_id {
        let mut members = tables
            .classes
            .get(class_id)
            .map(|c| c.student_ids.clone())
            .unwrap_or_default();
        members.push(student_id);
        tables.assign_students(class_id, members);
    }

    let student = tables
        .students
        .get(student_id)
        .cloned()
        .ok_or(AppError::InternalServerError("Student vanished after insert".to_string()))?;

    tracing::info!(
        student_id,
        registration_number = %student.registration_number,
        "Student enrolled"
    );

    Ok((StatusCode::CREATED, Json(student)))
}
