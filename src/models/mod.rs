// src/models/mod.rs

pub mod admission;
pub mod class;
pub mod exam;
pub mod quiz;
pub mod student;
