//! User-initiated actions
//!
//! Enrollment is confirmed before it is committed: the student is written to
//! the remote course first, and only then recorded locally. Likes are
//! fire-and-forget: the next push is the only thing that changes what the
//! views show. Progress lives only in the local `user` slice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{StoreError, ValidationError};
use crate::models::CourseId;
use crate::session::Session;
use crate::state::{Action, LocalStore, MAX_PROGRESS};
use crate::sync::SyncAdapter;

/// How an enroll request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Remote write accepted and enrollment recorded
    Enrolled,
    /// Already enrolled locally, nothing written
    AlreadyEnrolled,
    /// Another enroll for this course is still running
    InFlight,
    /// The course does not accept students
    Closed,
    /// The remote write failed; local state is unchanged
    Failed(StoreError),
}

/// Actions bound to one session
#[derive(Clone)]
pub struct CourseActions {
    adapter: SyncAdapter,
    store: LocalStore,
    session: Session,
    in_flight: Arc<Mutex<HashSet<CourseId>>>,
}

/// Clears the in-flight mark when dropped
struct InFlightGuard {
    set: Arc<Mutex<HashSet<CourseId>>>,
    course_id: CourseId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.course_id);
    }
}

impl CourseActions {
    pub fn new(adapter: SyncAdapter, store: LocalStore, session: Session) -> Self {
        Self {
            adapter,
            store,
            session,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether an enroll for `course_id` is running
    pub fn is_enrolling(&self, course_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(course_id)
    }

    fn begin_enroll(&self, course_id: &str) -> Option<InFlightGuard> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(course_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            course_id: course_id.to_string(),
        })
    }

    /// Enroll the session user in a course
    ///
    /// Errors are logged and reported in the outcome; they never change
    /// local state.
    pub async fn enroll(&self, course_id: &str) -> EnrollOutcome {
        let state = self.store.snapshot();
        if state.user.is_enrolled(course_id) {
            return EnrollOutcome::AlreadyEnrolled;
        }
        if state
            .course(course_id)
            .is_some_and(|c| c.enrollment_status.is_closed())
        {
            return EnrollOutcome::Closed;
        }

        let Some(_guard) = self.begin_enroll(course_id) else {
            return EnrollOutcome::InFlight;
        };

        let now = Utc::now();
        let student = self.session.to_student(now);
        match self.adapter.enroll_student(course_id, &student).await {
            Ok(()) => {
                self.store.dispatch(Action::enroll_at(course_id, now));
                info!("Enrolled {} in {}", self.session.user_id, course_id);
                EnrollOutcome::Enrolled
            }
            Err(e) => {
                warn!("Error enrolling in course {}: {}", course_id, e);
                EnrollOutcome::Failed(e)
            }
        }
    }

    /// Toggle the session user's like
    ///
    /// Nothing is dispatched; the change arrives with the next push.
    pub async fn toggle_like(&self, course_id: &str) -> Result<Option<bool>, StoreError> {
        self.adapter
            .toggle_like(course_id, &self.session.user_id)
            .await
            .map_err(|e| {
                warn!("Error toggling like on course {}: {}", course_id, e);
                e
            })
    }

    /// Set progress to 100
    pub fn mark_completed(&self, course_id: &str) {
        self.store
            .dispatch(Action::MarkCourseCompleted(course_id.to_string()));
    }

    /// Set progress after checking it is a percentage
    pub fn set_progress(&self, course_id: &str, progress: i64) -> Result<(), ValidationError> {
        if !(0..=i64::from(MAX_PROGRESS)).contains(&progress) {
            return Err(ValidationError::ProgressOutOfRange(progress));
        }
        self.store.dispatch(Action::UpdateCourseProgress {
            course_id: course_id.to_string(),
            progress,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, EnrollmentStatus};
    use crate::remote::{CourseStore, MemoryStore};
    use crate::state::{AppState, UserState};

    fn setup(courses: Vec<Course>) -> (CourseActions, LocalStore, MemoryStore) {
        let remote = MemoryStore::with_courses(courses.clone());
        let adapter = SyncAdapter::new(Arc::new(remote.clone()));
        let session = Session::new("u1", "Yati Gautam", "yati@example.com");
        let store = LocalStore::new(AppState::new(UserState::new(session.clone(), vec![])));
        store.dispatch(Action::SetCourses(courses));
        (CourseActions::new(adapter, store.clone(), session), store, remote)
    }

    #[tokio::test]
    async fn test_enroll_commits_after_remote_write() {
        let (actions, store, remote) = setup(vec![Course::new("c1", "Algorithms")]);

        assert_eq!(actions.enroll("c1").await, EnrollOutcome::Enrolled);

        assert!(store.snapshot().user.is_enrolled("c1"));
        assert_eq!(store.snapshot().user.progress("c1"), 0);
        assert!(remote.get_one("c1").await.unwrap().unwrap().has_student("u1"));
        assert!(!actions.is_enrolling("c1"));
    }

    #[tokio::test]
    async fn test_enroll_dates_agree_with_remote_record() {
        let (actions, store, remote) = setup(vec![Course::new("c1", "Algorithms")]);

        actions.enroll("c1").await;

        let local = store.snapshot().user.enrollment("c1").unwrap().enrollment_date.clone();
        let course = remote.get_one("c1").await.unwrap().unwrap();
        assert_eq!(&course.students[0].enrollment_date[..10], local);
    }

    #[tokio::test]
    async fn test_enroll_twice_is_idempotent() {
        let (actions, store, remote) = setup(vec![Course::new("c1", "Algorithms")]);

        actions.enroll("c1").await;
        assert_eq!(actions.enroll("c1").await, EnrollOutcome::AlreadyEnrolled);

        assert_eq!(store.snapshot().user.enrolled_courses.len(), 1);
        assert_eq!(remote.get_one("c1").await.unwrap().unwrap().students.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_enroll_leaves_state_unchanged() {
        let (actions, store, remote) = setup(vec![Course::new("c1", "Algorithms")]);
        remote
            .fail_writes(Some(StoreError::PermissionDenied("c1".to_string())))
            .await;
        let before = store.snapshot();

        let outcome = actions.enroll("c1").await;

        assert!(matches!(
            outcome,
            EnrollOutcome::Failed(StoreError::PermissionDenied(_))
        ));
        assert_eq!(*store.snapshot(), *before);
        assert!(!actions.is_enrolling("c1"));

        // Retry once the store accepts writes again
        remote.fail_writes(None).await;
        assert_eq!(actions.enroll("c1").await, EnrollOutcome::Enrolled);
    }

    #[tokio::test]
    async fn test_enroll_closed_course_is_refused() {
        let closed = Course::new("c1", "Algorithms").with_status(EnrollmentStatus::Closed);
        let (actions, store, remote) = setup(vec![closed]);

        assert_eq!(actions.enroll("c1").await, EnrollOutcome::Closed);
        assert!(!store.snapshot().user.is_enrolled("c1"));
        assert!(remote.get_one("c1").await.unwrap().unwrap().students.is_empty());
    }

    #[tokio::test]
    async fn test_enroll_in_flight_is_ignored() {
        let (actions, _store, _remote) = setup(vec![Course::new("c1", "Algorithms")]);
        let _guard = actions.begin_enroll("c1").unwrap();

        assert!(actions.is_enrolling("c1"));
        assert_eq!(actions.enroll("c1").await, EnrollOutcome::InFlight);
    }

    #[tokio::test]
    async fn test_toggle_like_does_not_dispatch() {
        let (actions, store, remote) = setup(vec![Course::new("c1", "Algorithms")]);
        let before = store.snapshot();

        assert_eq!(actions.toggle_like("c1").await, Ok(Some(true)));

        assert_eq!(*store.snapshot(), *before);
        assert_eq!(remote.get_one("c1").await.unwrap().unwrap().likes, 1);
    }

    #[tokio::test]
    async fn test_progress_actions() {
        let (actions, store, _remote) = setup(vec![Course::new("c1", "Algorithms")]);
        actions.enroll("c1").await;

        actions.set_progress("c1", 40).unwrap();
        assert_eq!(store.snapshot().user.progress("c1"), 40);

        assert_eq!(
            actions.set_progress("c1", 120),
            Err(ValidationError::ProgressOutOfRange(120))
        );
        assert_eq!(store.snapshot().user.progress("c1"), 40);

        actions.mark_completed("c1");
        assert_eq!(store.snapshot().user.progress("c1"), 100);
    }
}
