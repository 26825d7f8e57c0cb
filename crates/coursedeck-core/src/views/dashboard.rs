//! Dashboard view model: enrollment stats and progress editing

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{Course, Enrollment};
use crate::state::{AppState, MAX_PROGRESS};

/// One-click progress values offered by the progress menu
pub const PROGRESS_PRESETS: [u8; 4] = [25, 50, 75, 100];

/// Title shown for an enrollment whose course is not in the catalog
pub const UNKNOWN_COURSE: &str = "Unknown course";

/// Aggregate numbers at the top of the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub enrolled: usize,
    pub completed: usize,
    /// Mean progress over all enrollments, rounded to the nearest integer
    pub overall_progress: u8,
}

impl DashboardStats {
    pub fn from_enrollments(enrollments: &[Enrollment]) -> Self {
        Self {
            enrolled: enrollments.len(),
            completed: enrollments.iter().filter(|e| e.is_completed()).count(),
            overall_progress: overall_progress(enrollments),
        }
    }
}

/// Average progress, 0 with no enrollments
///
/// The divisor is the number of enrollments, not the catalog size.
pub fn overall_progress(enrollments: &[Enrollment]) -> u8 {
    if enrollments.is_empty() {
        return 0;
    }
    let total: u32 = enrollments.iter().map(|e| u32::from(e.progress)).sum();
    let mean = (f64::from(total) / enrollments.len() as f64).round();
    mean.min(f64::from(MAX_PROGRESS)) as u8
}

/// An enrollment joined with its course, if the catalog has it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry<'a> {
    pub enrollment: &'a Enrollment,
    pub course: Option<&'a Course>,
}

impl DashboardEntry<'_> {
    pub fn title(&self) -> &str {
        self.course.map(|c| c.name.as_str()).unwrap_or(UNKNOWN_COURSE)
    }

    pub fn instructor(&self) -> &str {
        self.course.map(|c| c.instructor.as_str()).unwrap_or_default()
    }
}

/// Everything the dashboard renders
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard<'a> {
    pub user_name: &'a str,
    pub stats: DashboardStats,
    pub completed: Vec<DashboardEntry<'a>>,
    pub in_progress: Vec<DashboardEntry<'a>>,
}

impl<'a> Dashboard<'a> {
    pub fn new(state: &'a AppState) -> Self {
        let enrollments = &state.user.enrolled_courses;
        let (completed, in_progress) = enrollments
            .iter()
            .map(|enrollment| DashboardEntry {
                enrollment,
                course: state.course(&enrollment.course_id),
            })
            .partition(|entry| entry.enrollment.is_completed());

        Self {
            user_name: &state.user.session.name,
            stats: DashboardStats::from_enrollments(enrollments),
            completed,
            in_progress,
        }
    }
}

/// Parse a typed progress value
pub fn parse_custom_progress(input: &str) -> Result<u8, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }
    let value: i64 = input
        .parse()
        .map_err(|_| ValidationError::InvalidNumber(input.to_string()))?;
    if !(0..=i64::from(MAX_PROGRESS)).contains(&value) {
        return Err(ValidationError::ProgressOutOfRange(value));
    }
    Ok(value as u8)
}

/// Text field for a custom progress value
///
/// Only digits are accepted, at most three of them. Confirming is possible
/// only while the text parses to a value in 0..=100.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomProgressInput {
    text: String,
}

impl CustomProgressInput {
    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() && self.text.len() < 3 {
            self.text.push(c);
        }
    }

    pub fn pop(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> Result<u8, ValidationError> {
        parse_custom_progress(&self.text)
    }

    pub fn can_confirm(&self) -> bool {
        self.value().is_ok()
    }
}
