//! Course detail view model

use crate::error::StoreError;
use crate::models::{Course, CourseId, EnrollmentStatus};
use crate::state::{Action, LocalStore, UserState};
use crate::sync::{Subscription, SyncAdapter};

/// State of the enroll button for one course
///
/// `NotEnrolled -> Enrolling -> Enrolled`, and `Enrolling -> NotEnrolled`
/// when the write fails. `EnrollmentClosed` applies whenever the course is
/// closed and the user is not enrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollButtonState {
    NotEnrolled,
    Enrolling,
    Enrolled,
    EnrollmentClosed,
}

impl EnrollButtonState {
    pub fn for_course(course: &Course, user: &UserState, enrolling: bool) -> Self {
        if user.is_enrolled(&course.id) {
            EnrollButtonState::Enrolled
        } else if course.enrollment_status.is_closed() {
            EnrollButtonState::EnrollmentClosed
        } else if enrolling {
            EnrollButtonState::Enrolling
        } else {
            EnrollButtonState::NotEnrolled
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnrollButtonState::NotEnrolled => "Enroll Now",
            EnrollButtonState::Enrolling => "Enrolling...",
            EnrollButtonState::Enrolled => "Enrolled",
            EnrollButtonState::EnrollmentClosed => "Enrollment Closed",
        }
    }

    /// Whether pressing the button starts an enrollment
    pub fn is_actionable(&self) -> bool {
        matches!(self, EnrollButtonState::NotEnrolled)
    }
}

/// Colour family for an enrollment status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Open,
    Closed,
    Other,
}

impl From<&EnrollmentStatus> for StatusTone {
    fn from(status: &EnrollmentStatus) -> Self {
        match status {
            EnrollmentStatus::Open => StatusTone::Open,
            EnrollmentStatus::Closed => StatusTone::Closed,
            _ => StatusTone::Other,
        }
    }
}

/// Syllabus accordion: at most one week expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyllabusAccordion {
    expanded: Option<u32>,
}

impl SyllabusAccordion {
    /// Expand `week`, or collapse it if it is the expanded one
    pub fn toggle(&mut self, week: u32) {
        self.expanded = if self.expanded == Some(week) {
            None
        } else {
            Some(week)
        };
    }

    pub fn is_expanded(&self, week: u32) -> bool {
        self.expanded == Some(week)
    }

    pub fn expanded(&self) -> Option<u32> {
        self.expanded
    }

    pub fn collapse(&mut self) {
        self.expanded = None;
    }
}

/// Live course document while the detail view is shown
///
/// Pushes for a course missing from the catalog are dropped by the
/// `courses` reducer; a deleted course is simply not dispatched.
pub struct CourseDetailView {
    course_id: CourseId,
    subscription: Option<Subscription>,
    pub syllabus: SyllabusAccordion,
}

impl CourseDetailView {
    pub async fn mount(
        adapter: &SyncAdapter,
        store: &LocalStore,
        course_id: &str,
    ) -> Result<Self, StoreError> {
        let store = store.clone();
        let subscription = adapter
            .subscribe_to_one(course_id, move |course| {
                if let Some(course) = course {
                    store.dispatch(Action::UpdateCourse(course));
                }
            })
            .await?;

        Ok(Self {
            course_id: course_id.to_string(),
            subscription: Some(subscription),
            syllabus: SyllabusAccordion::default(),
        })
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Enrollment;
    use crate::remote::MemoryStore;
    use crate::session::Session;
    use crate::state::AppState;
    use std::sync::Arc;
    use std::time::Duration;

    fn user(enrolled: &[&str]) -> UserState {
        UserState::new(
            Session::new("u1", "Ada", ""),
            enrolled.iter().map(|id| Enrollment {
                course_id: id.to_string(),
                progress: 0,
                enrollment_date: "2024-01-01".to_string(),
            }),
        )
    }

    #[test]
    fn test_enroll_button_states() {
        let open = Course::new("a", "Algorithms");
        let closed = Course::new("b", "Biology").with_status(EnrollmentStatus::Closed);

        assert_eq!(
            EnrollButtonState::for_course(&open, &user(&[]), false),
            EnrollButtonState::NotEnrolled
        );
        assert_eq!(
            EnrollButtonState::for_course(&open, &user(&[]), true),
            EnrollButtonState::Enrolling
        );
        assert_eq!(
            EnrollButtonState::for_course(&open, &user(&["a"]), false),
            EnrollButtonState::Enrolled
        );
        assert_eq!(
            EnrollButtonState::for_course(&closed, &user(&[]), false),
            EnrollButtonState::EnrollmentClosed
        );
        assert_eq!(
            EnrollButtonState::for_course(&closed, &user(&["b"]), false),
            EnrollButtonState::Enrolled
        );
    }

    #[test]
    fn test_only_not_enrolled_is_actionable() {
        assert!(EnrollButtonState::NotEnrolled.is_actionable());
        assert!(!EnrollButtonState::Enrolling.is_actionable());
        assert!(!EnrollButtonState::Enrolled.is_actionable());
        assert!(!EnrollButtonState::EnrollmentClosed.is_actionable());
        assert_eq!(EnrollButtonState::Enrolling.label(), "Enrolling...");
    }

    #[test]
    fn test_status_tone() {
        assert_eq!(StatusTone::from(&EnrollmentStatus::Open), StatusTone::Open);
        assert_eq!(StatusTone::from(&EnrollmentStatus::Closed), StatusTone::Closed);
        assert_eq!(StatusTone::from(&EnrollmentStatus::Waitlist), StatusTone::Other);
        assert_eq!(
            StatusTone::from(&EnrollmentStatus::from("Paused")),
            StatusTone::Other
        );
    }

    #[test]
    fn test_accordion_expands_one_week() {
        let mut accordion = SyllabusAccordion::default();
        accordion.toggle(1);
        assert!(accordion.is_expanded(1));

        accordion.toggle(2);
        assert!(!accordion.is_expanded(1));
        assert!(accordion.is_expanded(2));

        accordion.toggle(2);
        assert_eq!(accordion.expanded(), None);
    }

    #[tokio::test]
    async fn test_mount_patches_course_in_place() {
        let remote = MemoryStore::with_courses(vec![
            Course::new("a", "Algorithms"),
            Course::new("b", "Biology"),
        ]);
        let adapter = SyncAdapter::new(Arc::new(remote.clone()));
        let store = LocalStore::new(AppState::new(user(&[])));
        store.dispatch(Action::SetCourses(vec![
            Course::new("a", "Algorithms"),
            Course::new("b", "Biology"),
        ]));
        let mut rx = store.subscribe();

        let mut view = CourseDetailView::mount(&adapter, &store, "b").await.unwrap();
        // Initial snapshot
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();

        adapter.toggle_like("b", "u1").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.courses[0].id, "a");
        assert_eq!(snapshot.courses[1].likes, 1);
        assert_eq!(view.course_id(), "b");

        view.unmount();
        assert!(!view.is_live());
    }

    #[tokio::test]
    async fn test_mount_ignores_missing_course() {
        let remote = MemoryStore::new();
        let adapter = SyncAdapter::new(Arc::new(remote));
        let store = LocalStore::new(AppState::new(user(&[])));

        let view = CourseDetailView::mount(&adapter, &store, "ghost").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.snapshot().courses.is_empty());
        assert!(view.is_live());
    }
}
