// src/models/class.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A class (grade + section) and the people and books linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: i64,
    pub name: String,
    pub section: Option<String>,
    pub student_ids: Vec<i64>,

    /// Opaque references; teachers are managed outside this service.
    pub teacher_ids: Vec<i64>,

    /// Opaque references to the library catalogue.
    pub book_ids: Vec<i64>,

    pub created_at: DateTime<Utc>,
}

/// DTO for creating a class.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<i64>,
    #[serde(default)]
    pub teacher_ids: Vec<i64>,
    #[serde(default)]
    pub book_ids: Vec<i64>,
}

/// DTO for updating a class. Supplied arrays replace the stored ones.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 20))]
    pub section: Option<String>,
    pub student_ids: Option<Vec<i64>>,
    pub teacher_ids: Option<Vec<i64>>,
    pub book_ids: Option<Vec<i64>>,
}
