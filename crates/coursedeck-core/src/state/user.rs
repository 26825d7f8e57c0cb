//! `user` slice: session identity and local enrollment records
//!
//! Enrollments live only in this process. They are seeded from
//! configuration at start-up and never written to the remote store.

use serde::Serialize;

use super::Action;
use crate::models::Enrollment;
use crate::session::Session;

/// Highest progress value; reaching it means completed
pub const MAX_PROGRESS: u8 = 100;

/// The local user and their enrollments
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(flatten)]
    pub session: Session,
    /// At most one entry per course, in enrollment order
    pub enrolled_courses: Vec<Enrollment>,
}

impl UserState {
    /// Seed the slice, dropping duplicate course ids and clamping progress
    pub fn new(session: Session, seed: impl IntoIterator<Item = Enrollment>) -> Self {
        let mut enrolled_courses: Vec<Enrollment> = Vec::new();
        for mut enrollment in seed {
            if enrolled_courses
                .iter()
                .any(|e| e.course_id == enrollment.course_id)
            {
                continue;
            }
            enrollment.progress = enrollment.progress.min(MAX_PROGRESS);
            enrolled_courses.push(enrollment);
        }

        Self {
            session,
            enrolled_courses,
        }
    }

    pub fn enrollment(&self, course_id: &str) -> Option<&Enrollment> {
        self.enrolled_courses.iter().find(|e| e.course_id == course_id)
    }

    pub fn is_enrolled(&self, course_id: &str) -> bool {
        self.enrollment(course_id).is_some()
    }

    /// Progress for a course, 0 when not enrolled
    pub fn progress(&self, course_id: &str) -> u8 {
        self.enrollment(course_id).map(|e| e.progress).unwrap_or(0)
    }

    fn enrollment_mut(&mut self, course_id: &str) -> Option<&mut Enrollment> {
        self.enrolled_courses
            .iter_mut()
            .find(|e| e.course_id == course_id)
    }
}

/// Clamp any integer into a progress percentage
pub fn clamp_progress(progress: i64) -> u8 {
    // Fits in u8 after clamping
    progress.clamp(0, MAX_PROGRESS as i64) as u8
}

/// Apply `action` to the user slice
pub fn reduce(mut user: UserState, action: &Action) -> UserState {
    match action {
        Action::MarkCourseCompleted(course_id) => {
            if let Some(enrollment) = user.enrollment_mut(course_id) {
                enrollment.progress = MAX_PROGRESS;
            }
        }
        Action::UpdateCourseProgress {
            course_id,
            progress,
        } => {
            if let Some(enrollment) = user.enrollment_mut(course_id) {
                enrollment.progress = clamp_progress(*progress);
            }
        }
        Action::EnrollInCourse {
            course_id,
            enrollment_date,
        } => {
            if !user.is_enrolled(course_id) {
                user.enrolled_courses.push(Enrollment {
                    course_id: course_id.clone(),
                    progress: 0,
                    enrollment_date: enrollment_date.clone(),
                });
            }
        }
        Action::SetCourses(_) | Action::UpdateCourse(_) => {}
    }
    user
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(course_id: &str, progress: u8) -> Enrollment {
        Enrollment {
            course_id: course_id.to_string(),
            progress,
            enrollment_date: "2024-01-15".to_string(),
        }
    }

    fn user() -> UserState {
        UserState::new(
            Session::new("u1", "Yati Gautam", "yati@example.com"),
            vec![enrollment("a", 60), enrollment("b", 30)],
        )
    }

    fn enroll(course_id: &str) -> Action {
        Action::EnrollInCourse {
            course_id: course_id.to_string(),
            enrollment_date: "2024-03-01".to_string(),
        }
    }

    #[test]
    fn test_seed_dedupes_and_clamps() {
        let user = UserState::new(
            Session::new("u1", "Ada", ""),
            vec![enrollment("a", 250), enrollment("a", 10)],
        );
        assert_eq!(user.enrolled_courses, vec![enrollment("a", 100)]);
    }

    #[test]
    fn test_enroll_twice_keeps_one_entry() {
        let once = reduce(user(), &enroll("c"));
        let twice = reduce(once.clone(), &enroll("c"));

        assert_eq!(once, twice);
        let entries: Vec<_> = twice
            .enrolled_courses
            .iter()
            .filter(|e| e.course_id == "c")
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].progress, 0);
        assert_eq!(entries[0].enrollment_date, "2024-03-01");
    }

    #[test]
    fn test_enroll_existing_keeps_progress() {
        let user = reduce(user(), &enroll("a"));
        assert_eq!(user.progress("a"), 60);
    }

    #[test]
    fn test_mark_completed() {
        let user = reduce(user(), &Action::MarkCourseCompleted("b".to_string()));
        assert_eq!(user.progress("b"), 100);
        assert_eq!(user.progress("a"), 60);
    }

    #[test]
    fn test_mark_completed_not_enrolled_is_noop() {
        let before = user();
        let after = reduce(before.clone(), &Action::MarkCourseCompleted("zz".to_string()));
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_progress_in_range() {
        for p in [0, 1, 50, 99, 100] {
            let user = reduce(
                user(),
                &Action::UpdateCourseProgress {
                    course_id: "a".to_string(),
                    progress: p,
                },
            );
            assert_eq!(user.progress("a") as i64, p);
        }
    }

    #[test]
    fn test_update_progress_out_of_range_is_clamped() {
        let high = reduce(
            user(),
            &Action::UpdateCourseProgress {
                course_id: "a".to_string(),
                progress: 140,
            },
        );
        assert_eq!(high.progress("a"), 100);

        let low = reduce(
            user(),
            &Action::UpdateCourseProgress {
                course_id: "a".to_string(),
                progress: -5,
            },
        );
        assert_eq!(low.progress("a"), 0);
    }

    #[test]
    fn test_update_progress_not_enrolled_is_noop() {
        let before = user();
        let after = reduce(
            before.clone(),
            &Action::UpdateCourseProgress {
                course_id: "zz".to_string(),
                progress: 40,
            },
        );
        assert_eq!(before, after);
    }
}
