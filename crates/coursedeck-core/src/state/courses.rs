//! `courses` slice reducer

use super::Action;
use crate::models::Course;

/// Apply `action` to the course list
///
/// Only `SetCourses` and `UpdateCourse` touch this slice.
pub fn reduce(mut courses: Vec<Course>, action: &Action) -> Vec<Course> {
    match action {
        Action::SetCourses(list) => list.clone(),
        Action::UpdateCourse(course) => {
            // Single-document pushes never insert
            if let Some(slot) = courses.iter_mut().find(|c| c.id == course.id) {
                *slot = course.clone();
            }
            courses
        }
        _ => courses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Course> {
        vec![
            Course::new("a", "Algorithms"),
            Course::new("b", "Biology"),
            Course::new("c", "Chemistry"),
        ]
    }

    #[test]
    fn test_set_courses_replaces_everything() {
        let pushed = vec![Course::new("z", "Zoology"), Course::new("a", "Algorithms")];
        let courses = reduce(catalog(), &Action::SetCourses(pushed.clone()));
        assert_eq!(courses, pushed);
    }

    #[test]
    fn test_update_course_preserves_positions() {
        let mut changed = Course::new("b", "Biology II");
        changed.likes = 4;

        let courses = reduce(catalog(), &Action::UpdateCourse(changed.clone()));

        assert_eq!(courses.len(), 3);
        assert_eq!(courses[0].id, "a");
        assert_eq!(courses[1], changed);
        assert_eq!(courses[2].id, "c");
    }

    #[test]
    fn test_update_absent_course_is_noop() {
        let courses = reduce(
            catalog(),
            &Action::UpdateCourse(Course::new("new", "Newcomer")),
        );
        assert_eq!(courses, catalog());
    }

    #[test]
    fn test_user_actions_leave_courses_alone() {
        let courses = reduce(catalog(), &Action::MarkCourseCompleted("a".to_string()));
        assert_eq!(courses, catalog());
    }
}
