//! Command handlers

pub mod config;
pub mod course;
pub mod dashboard;
pub mod status;
