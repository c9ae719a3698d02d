// src/handlers/mod.rs

pub mod admission;
pub mod class;
pub mod exam;
pub mod public;
pub mod quiz;
pub mod result;
pub mod student;
