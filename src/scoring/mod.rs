// src/scoring/mod.rs

//! Pure scoring logic shared by the exam and quiz handlers.
//! Nothing in here touches the store or the request.

pub mod exam;
pub mod quiz;
