// src/models/admission.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::{validate_not_blank, validate_phone};

/// Admission window configuration. One row per school.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionSettings {
    pub is_open: bool,

    /// e.g. "2026" or "2026-2027". Its leading digits prefix registration numbers.
    pub academic_year: String,

    /// Classes currently accepting applications.
    pub open_class_ids: Vec<i64>,

    pub instructions: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            is_open: false,
            academic_year: Utc::now().format("%Y").to_string(),
            open_class_ids: Vec::new(),
            instructions: None,
            updated_at: None,
        }
    }
}

/// DTO for replacing the admission settings.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAdmissionSettingsRequest {
    pub is_open: bool,
    #[validate(length(min = 1, max = 20))]
    pub academic_year: String,
    #[serde(default)]
    pub open_class_ids: Vec<i64>,
    #[validate(length(max = 5000))]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionApplication {
    pub id: i64,
    pub applicant_name: String,
    pub date_of_birth: NaiveDate,
    pub guardian_name: String,
    pub phone: String,
    pub address: Option<String>,

    /// Class the applicant asked to join.
    pub class_id: i64,

    pub status: ApplicationStatus,

    /// Reviewer's note, usually the reason for a rejection.
    pub remarks: Option<String>,

    /// Student created when the application was approved.
    pub student_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// DTO for submitting an application.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 100), custom(function = validate_not_blank))]
    pub applicant_name: String,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 1, max = 100), custom(function = validate_not_blank))]
    pub guardian_name: String,
    #[validate(custom(function = validate_phone))]
    pub phone: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub class_id: i64,
}

/// DTO for reviewing an application. Only `approved` and `rejected` are accepted.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewApplicationRequest {
    pub status: ApplicationStatus,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationListParams {
    pub status: Option<ApplicationStatus>,
    pub class_id: Option<i64>,
}
