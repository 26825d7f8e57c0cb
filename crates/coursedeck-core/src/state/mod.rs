//! Local store
//!
//! Two independent slices: `courses`, mirrored from the remote store, and
//! `user`, which is owned by this process. Every change goes through
//! `LocalStore::dispatch`, which runs the pure reducers against the current
//! snapshot and publishes the result.
//!
//! ## Usage
//!
//! ```ignore
//! let store = LocalStore::new(AppState::new(user));
//! store.dispatch(Action::SetCourses(courses));
//! let snapshot = store.snapshot();
//! ```

pub mod courses;
pub mod user;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::models::{Course, CourseId};

pub use user::{clamp_progress, UserState, MAX_PROGRESS};

/// Everything the views render from
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub courses: Vec<Course>,
    pub user: UserState,
}

impl AppState {
    /// Start with an empty catalog
    pub fn new(user: UserState) -> Self {
        Self {
            courses: Vec::new(),
            user,
        }
    }

    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    /// Produce the next snapshot
    pub fn reduce(self, action: &Action) -> Self {
        Self {
            courses: courses::reduce(self.courses, action),
            user: user::reduce(self.user, action),
        }
    }
}

/// State transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the catalog with a full snapshot
    SetCourses(Vec<Course>),
    /// Replace one course in place (ignored if not present)
    UpdateCourse(Course),
    /// Set progress to 100
    MarkCourseCompleted(CourseId),
    /// Set progress, clamped into 0..=100
    UpdateCourseProgress { course_id: CourseId, progress: i64 },
    /// Record a new enrollment with progress 0
    EnrollInCourse {
        course_id: CourseId,
        enrollment_date: String,
    },
}

impl Action {
    /// Enroll with today's UTC date
    pub fn enroll_today(course_id: impl Into<CourseId>) -> Self {
        Self::enroll_at(course_id, Utc::now())
    }

    /// Enroll dated by the UTC day of `at`, the same day the remote student
    /// record carries
    pub fn enroll_at(course_id: impl Into<CourseId>, at: DateTime<Utc>) -> Self {
        Action::EnrollInCourse {
            course_id: course_id.into(),
            enrollment_date: at.date_naive().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::SetCourses(_) => "setCourses",
            Action::UpdateCourse(_) => "updateCourse",
            Action::MarkCourseCompleted(_) => "markCourseCompleted",
            Action::UpdateCourseProgress { .. } => "updateCourseProgress",
            Action::EnrollInCourse { .. } => "enrollInCourse",
        }
    }
}

/// Shared handle to the application state
///
/// Cloning the handle shares the same state.
#[derive(Clone)]
pub struct LocalStore {
    tx: Arc<watch::Sender<Arc<AppState>>>,
}

impl LocalStore {
    pub fn new(initial: AppState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Run one transition and publish the new snapshot
    ///
    /// Transitions are serialized; each runs to completion before the next.
    pub fn dispatch(&self, action: Action) {
        debug!("dispatch {}", action.name());
        self.tx.send_modify(|state| {
            let next = state.as_ref().clone().reduce(&action);
            *state = Arc::new(next);
        });
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver notified after every dispatch
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.tx.subscribe()
    }
}
