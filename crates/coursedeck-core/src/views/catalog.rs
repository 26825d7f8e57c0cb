//! Catalog view model: course list and search

use tracing::debug;

use crate::error::StoreError;
use crate::models::Course;
use crate::state::{Action, LocalStore};
use crate::sync::{Subscription, SyncAdapter};

/// Whether a course matches a search query
///
/// Case-insensitive substring match over name and instructor. An empty
/// query matches everything.
pub fn matches(course: &Course, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || course.name.to_lowercase().contains(&query)
        || course.instructor.to_lowercase().contains(&query)
}

/// Courses matching `query`, in catalog order
pub fn search<'a>(courses: &'a [Course], query: &str) -> Vec<&'a Course> {
    courses.iter().filter(|c| matches(c, query)).collect()
}

/// Result line shown under the search box
///
/// `None` when no query was entered.
pub fn result_label(query: &str, count: usize) -> Option<String> {
    if query.trim().is_empty() {
        return None;
    }
    Some(match count {
        0 => "No courses found".to_string(),
        1 => "Found 1 course".to_string(),
        n => format!("Found {} courses", n),
    })
}

/// Live catalog while the view is shown
///
/// Every collection snapshot replaces the `courses` slice.
pub struct CatalogView {
    subscription: Option<Subscription>,
}

impl CatalogView {
    pub async fn mount(adapter: &SyncAdapter, store: &LocalStore) -> Result<Self, StoreError> {
        let store = store.clone();
        let subscription = adapter
            .subscribe_to_all(move |courses| {
                debug!("Catalog push with {} courses", courses.len());
                store.dispatch(Action::SetCourses(courses));
            })
            .await?;

        Ok(Self {
            subscription: Some(subscription),
        })
    }

    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Whether pushes are still arriving
    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::session::Session;
    use crate::state::{AppState, UserState};
    use std::sync::Arc;
    use std::time::Duration;

    fn courses() -> Vec<Course> {
        vec![
            Course::new("a", "Algorithms").with_instructor("Gautam Rao"),
            Course::new("b", "Biology").with_instructor("Singh"),
        ]
    }

    #[test]
    fn test_search_matches_instructor_case_insensitively() {
        let courses = courses();
        let found = search(&courses, "gau");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Algorithms");
    }

    #[test]
    fn test_search_matches_name() {
        let courses = courses();
        let found = search(&courses, "BIO");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
    }

    #[test]
    fn test_empty_query_matches_all() {
        let courses = courses();
        assert_eq!(search(&courses, "").len(), 2);
        assert_eq!(search(&courses, "   ").len(), 2);
    }

    #[test]
    fn test_result_label() {
        assert_eq!(result_label("", 2), None);
        assert_eq!(result_label("x", 0).as_deref(), Some("No courses found"));
        assert_eq!(result_label("x", 1).as_deref(), Some("Found 1 course"));
        assert_eq!(result_label("x", 3).as_deref(), Some("Found 3 courses"));
    }

    #[tokio::test]
    async fn test_mount_mirrors_catalog() {
        let remote = MemoryStore::with_courses(courses());
        let adapter = SyncAdapter::new(Arc::new(remote.clone()));
        let store = LocalStore::new(AppState::new(UserState::new(
            Session::new("u1", "Ada", ""),
            vec![],
        )));
        let mut rx = store.subscribe();

        let mut view = CatalogView::mount(&adapter, &store).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.snapshot().courses, courses());
        assert!(view.is_live());

        view.unmount();
        assert!(!view.is_live());

        remote.remove("a").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.snapshot().courses.len(), 2);
    }
}
