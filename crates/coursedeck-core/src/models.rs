//! Data models for coursedeck
//!
//! Defines the course documents mirrored from the remote store and the
//! locally owned enrollment records. Field names follow the remote wire
//! format (camelCase); missing collections and counters default to empty.

use serde::{Deserialize, Serialize};

/// Identifier of a course document, assigned by the remote store
pub type CourseId = String;

/// A course as stored in the remote `courses` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Document identifier (stable, unique)
    pub id: CourseId,
    /// Course title
    #[serde(default)]
    pub name: String,
    /// Instructor display name
    #[serde(default)]
    pub instructor: String,
    /// Long-form description
    #[serde(default)]
    pub description: String,
    /// Human readable duration ("8 weeks")
    #[serde(default)]
    pub duration: String,
    /// Human readable schedule ("Tuesdays and Thursdays, 6:00 PM")
    #[serde(default)]
    pub schedule: String,
    /// Where the course takes place
    #[serde(default)]
    pub location: String,
    /// Whether new students are accepted
    #[serde(default)]
    pub enrollment_status: EnrollmentStatus,
    /// Ordered prerequisites
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Ordered weekly syllabus
    #[serde(default)]
    pub syllabus: Vec<SyllabusWeek>,
    /// Enrolled students (server is the source of truth)
    #[serde(default)]
    pub students: Vec<Student>,
    /// Like counter, maintained together with `liked_by`
    #[serde(default)]
    pub likes: i64,
    /// User ids that liked this course
    #[serde(default)]
    pub liked_by: Vec<String>,
}

impl Course {
    /// Create an empty open course with the given id and name
    pub fn new(id: impl Into<CourseId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            instructor: String::new(),
            description: String::new(),
            duration: String::new(),
            schedule: String::new(),
            location: String::new(),
            enrollment_status: EnrollmentStatus::Open,
            prerequisites: Vec::new(),
            syllabus: Vec::new(),
            students: Vec::new(),
            likes: 0,
            liked_by: Vec::new(),
        }
    }

    /// Set the instructor (builder style)
    pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
        self.instructor = instructor.into();
        self
    }

    /// Set the enrollment status (builder style)
    pub fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.enrollment_status = status;
        self
    }

    /// Whether the given user id is in `liked_by`
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }

    /// Whether a student with the given id is enrolled on the server side
    pub fn has_student(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s.id == student_id)
    }

    /// Look up a syllabus week by its number
    pub fn week(&self, week: u32) -> Option<&SyllabusWeek> {
        self.syllabus.iter().find(|w| w.week == week)
    }
}

/// Enrollment status of a course
///
/// Anything other than `Open` and `Closed` is shown as waitlist/other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnrollmentStatus {
    #[default]
    Open,
    Closed,
    Waitlist,
    /// Unrecognized status string, preserved as received
    Other(String),
}

impl EnrollmentStatus {
    /// Wire/display form of the status
    pub fn as_str(&self) -> &str {
        match self {
            EnrollmentStatus::Open => "Open",
            EnrollmentStatus::Closed => "Closed",
            EnrollmentStatus::Waitlist => "Waitlist",
            EnrollmentStatus::Other(s) => s,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, EnrollmentStatus::Closed)
    }
}

impl From<&str> for EnrollmentStatus {
    fn from(s: &str) -> Self {
        match s {
            "Open" => EnrollmentStatus::Open,
            "Closed" => EnrollmentStatus::Closed,
            "Waitlist" => EnrollmentStatus::Waitlist,
            other => EnrollmentStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for EnrollmentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnrollmentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EnrollmentStatus::from(s.as_str()))
    }
}

/// One week of a course syllabus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyllabusWeek {
    /// Week number, used as the accordion key
    pub week: u32,
    pub topic: String,
    #[serde(default)]
    pub content: String,
}

/// A student record inside a course document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// ISO-8601 timestamp of the enrollment
    #[serde(default)]
    pub enrollment_date: String,
}

/// A local enrollment record for the session user
///
/// `course_id` is a weak reference: the course may not be in the local
/// catalog cache yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub course_id: CourseId,
    /// Completion percentage, 0..=100 (100 = completed)
    pub progress: u8,
    /// `YYYY-MM-DD`
    pub enrollment_date: String,
}

impl Enrollment {
    pub fn is_completed(&self) -> bool {
        self.progress >= 100
    }
}
