// src/models/student.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::{validate_not_blank, validate_phone};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,

    /// Unique, issued by the school. Used with the date of birth for public result lookup.
    pub registration_number: String,

    pub name: String,
    pub date_of_birth: NaiveDate,
    pub phone: Option<String>,

    /// Class that currently lists this student, if any.
    pub class_id: Option<i64>,

    pub created_at: DateTime<Utc>,
}

/// DTO for enrolling a student directly, without an admission application.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 100), custom(function = validate_not_blank))]
    pub name: String,
    pub date_of_birth: NaiveDate,
    #[validate(custom(function = validate_phone))]
    pub phone: Option<String>,
    pub class_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StudentListParams {
    pub class_id: Option<i64>,
}
