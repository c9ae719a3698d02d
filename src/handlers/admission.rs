// src/handlers/admission.rs

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
    models::{
        admission::{
            AdmissionApplication, ApplicationListParams, ApplicationStatus,
            CreateApplicationRequest, ReviewApplicationRequest, UpdateAdmissionSettingsRequest,
        },
        student::Student,
    },
    store::Db,
    utils::{
        html::{clean_html, clean_opt},
        validation::dedup_ids,
    },
};

/// Returns the current admission settings.
pub async fn get_settings(State(db): State<Db>) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    Ok(Json(tables.admission_settings.clone()))
}

/// Replaces the admission settings.
/// Every open class must exist.
pub async fn update_settings(
    State(db): State<Db>,
    Json(payload): Json<UpdateAdmissionSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut tables = db.write().await;

    let open_class_ids = dedup_ids(payload.open_class_ids);
    if let Some(missing) = open_class_ids.iter().find(|id| !tables.classes.contains(**id)) {
        return Err(AppError::BadRequest(format!("Class {} does not exist", missing)));
    }

    let settings = &mut tables.admission_settings;
    settings.is_open = payload.is_open;
    settings.academic_year = payload.academic_year.trim().to_string();
    settings.open_class_ids = open_class_ids;
    settings.instructions = clean_opt(payload.instructions);
    settings.updated_at = Some(Utc::now());

    tracing::info!(
        is_open = settings.is_open,
        open_classes = settings.open_class_ids.len(),
        "Admission settings updated"
    );

    Ok(Json(settings.clone()))
}

/// Lists applications, newest first, optionally filtered by status and class.
pub async fn list_applications(
    State(db): State<Db>,
    Query(params): Query<ApplicationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;

    let mut applications: Vec<AdmissionApplication> = tables
        .applications
        .values()
        .filter(|a| params.status.is_none_or(|status| a.status == status))
        .filter(|a| params.class_id.is_none_or(|class_id| a.class_id == class_id))
        .cloned()
        .collect();
    applications.reverse();

    Ok(Json(applications))
}

pub async fn get_application(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let tables = db.read().await;
    let application = tables
        .applications
        .get(id)
        .cloned()
        .ok_or(AppError::NotFound("Application not found".to_string()))?;

    Ok(Json(application))
}

/// Submits an admission application.
///
/// * Admissions must be open.
/// * The requested class must be one of the open classes.
pub async fn submit_application(
    State(db): State<Db>,
    Json(payload): Json<CreateApplicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tables = db.write().await;

    let settings = &tables.admission_settings;
    if !settings.is_open {
        return Err(AppError::Conflict("Admissions are currently closed".to_string()));
    }
    if !settings.open_class_ids.contains(&payload.class_id) {
        return Err(AppError::BadRequest(
            "The selected class is not open for admission".to_string(),
        ));
    }

    let application = tables
        .applications
        .insert_with(|id| AdmissionApplication {
            id,
            applicant_name: clean_html(payload.applicant_name.trim()),
            date_of_birth: payload.date_of_birth,
            guardian_name: clean_html(payload.guardian_name.trim()),
            phone: payload.phone.trim().to_string(),
            address: clean_opt(payload.address),
            class_id: payload.class_id,
            status: ApplicationStatus::Pending,
            remarks: None,
            student_id: None,
            created_at: Utc::now(),
            reviewed_at: None,
        })
        .clone();

    tracing::info!(
        application_id = application.id,
        class_id = application.class_id,
        "Admission application submitted"
    );

    Ok((StatusCode::CREATED, Json(application)))
}

/// Approves or rejects a pending application.
///
/// Approval enrolls the applicant: a student is created with a new
/// registration number and added to the requested class.
pub async fn review_application(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewApplicationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.status == ApplicationStatus::Pending {
        return Err(AppError::BadRequest(
            "Status must be 'approved' or 'rejected'".to_string(),
        ));
    }

    let mut tables = db.write().await;

    let application = tables
        .applications
        .get(id)
        .cloned()
        .ok_or(AppError::NotFound("Application not found".to_string()))?;

    if application.status != ApplicationStatus::Pending {
        tracing::warn!(application_id = id, "Attempt to review an already reviewed application");
        return Err(AppError::Conflict(
            "Application has already been reviewed".to_string(),
        ));
    }

    let student_id = if payload.status == ApplicationStatus::Approved {
        let registration_number = tables.issue_registration_number();
        let class_exists = tables.classes.contains(application.class_id);

        let student_id = tables
            .students
            .insert_with(|student_id| Student {
                id: student_id,
                registration_number,
                name: application.applicant_name.clone(),
                date_of_birth: application.date_of_birth,
                phone: Some(application.phone.clone()),
                class_id: None,
                created_at: Utc::now(),
            })
            .id;

        if class_exists {
            let mut members = tables
                .classes
                .get(application.class_id)
                .map(|c| c.student_ids.clone())
                .unwrap_or_default();
            members.push(student_id);
            tables.assign_students(application.class_id, members);
        } else {
            tracing::warn!(
                application_id = id,
                class_id = application.class_id,
                "Approved application for a class that no longer exists; student left unassigned"
            );
        }

        Some(student_id)
    } else {
        None
    };

    let reviewed = tables
        .applications
        .get_mut(id)
        .ok_or(AppError::NotFound("Application not found".to_string()))?;
    reviewed.status = payload.status;
    reviewed.remarks = clean_opt(payload.remarks);
    reviewed.student_id = student_id;
    reviewed.reviewed_at = Some(Utc::now());

    tracing::info!(
        application_id = id,
        status = ?reviewed.status,
        student_id = ?student_id,
        "Admission application reviewed"
    );

    Ok(Json(reviewed.clone()))
}

/// Deletes an application. A student created from it is kept.
pub async fn delete_application(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tables = db.write().await;

    if tables.applications.remove(id).is_none() {
        return Err(AppError::NotFound("Application not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
