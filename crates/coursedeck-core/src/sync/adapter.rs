//! Sync adapter over the remote course store
//!
//! Wraps the store's watch and update primitives behind the operations the
//! rest of the crate uses. Callers never see store-specific semantics.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::Subscription;
use crate::error::StoreError;
use crate::models::{Course, Student};
use crate::remote::{CourseStore, DocumentUpdate};

/// Entry point for reading and writing remote courses
#[derive(Clone)]
pub struct SyncAdapter {
    store: Arc<dyn CourseStore>,
}

impl SyncAdapter {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    /// Call `on_change` with the full catalog now and after every change
    pub async fn subscribe_to_all<F>(&self, on_change: F) -> Result<Subscription, StoreError>
    where
        F: FnMut(Vec<Course>) + Send + 'static,
    {
        let feed = self.store.watch_all().await?;
        Ok(Subscription::spawn("courses", feed, on_change))
    }

    /// Call `on_change` with one course now and after every change
    ///
    /// `None` means the course was deleted or never existed.
    pub async fn subscribe_to_one<F>(
        &self,
        course_id: &str,
        on_change: F,
    ) -> Result<Subscription, StoreError>
    where
        F: FnMut(Option<Course>) + Send + 'static,
    {
        let feed = self.store.watch_one(course_id).await?;
        Ok(Subscription::spawn(
            format!("courses/{}", course_id),
            feed,
            on_change,
        ))
    }

    /// Write a partial update
    ///
    /// Resolves once the store accepted the write. The change itself only
    /// becomes visible through an open subscription.
    pub async fn update_fields(
        &self,
        course_id: &str,
        update: DocumentUpdate,
    ) -> Result<(), StoreError> {
        self.store.update(course_id, update).await
    }

    /// Flip whether `user_id` likes the course
    ///
    /// Reads `likedBy` to pick the direction, then writes the membership
    /// change and the counter change as one update. Two toggles racing for
    /// the same user can both apply.
    ///
    /// Returns the new liked state, or `None` if the course does not exist.
    pub async fn toggle_like(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<bool>, StoreError> {
        let Some(course) = self.store.get_one(course_id).await? else {
            return Ok(None);
        };

        let liked = course.is_liked_by(user_id);
        let member = vec![Value::from(user_id)];
        let update = if liked {
            DocumentUpdate::new()
                .increment("likes", -1)
                .array_remove("likedBy", member)
        } else {
            DocumentUpdate::new()
                .increment("likes", 1)
                .array_union("likedBy", member)
        };

        self.store.update(course_id, update).await?;
        debug!("{} {} course {}", user_id, if liked { "unliked" } else { "liked" }, course_id);
        Ok(Some(!liked))
    }

    /// Add `student` to the course's students unless one with the same id
    /// is already there
    pub async fn enroll_student(&self, course_id: &str, student: &Student) -> Result<(), StoreError> {
        let value = serde_json::to_value(student)?;
        self.store
            .update(
                course_id,
                DocumentUpdate::new().array_union_by_key("students", "id", value),
            )
            .await
    }

    /// One-shot read of the catalog
    pub async fn get_courses(&self) -> Result<Vec<Course>, StoreError> {
        self.store.get_all().await
    }

    /// One-shot read of a course
    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>, StoreError> {
        self.store.get_one(course_id).await
    }

    /// Students enrolled in a course (empty if the course does not exist)
    pub async fn enrolled_students(&self, course_id: &str) -> Result<Vec<Student>, StoreError> {
        Ok(self
            .store
            .get_one(course_id)
            .await?
            .map(|course| course.students)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn adapter_with(courses: Vec<Course>) -> (SyncAdapter, MemoryStore) {
        let store = MemoryStore::with_courses(courses);
        (SyncAdapter::new(Arc::new(store.clone())), store)
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for push")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_like_toggle_scenario() {
        let (adapter, store) = adapter_with(vec![Course::new("C1", "Algorithms")]);

        assert_eq!(adapter.toggle_like("C1", "u1").await.unwrap(), Some(true));
        let course = store.get_one("C1").await.unwrap().unwrap();
        assert_eq!(course.liked_by, vec!["u1".to_string()]);
        assert_eq!(course.likes, 1);

        assert_eq!(adapter.toggle_like("C1", "u1").await.unwrap(), Some(false));
        let course = store.get_one("C1").await.unwrap().unwrap();
        assert!(course.liked_by.is_empty());
        assert_eq!(course.likes, 0);
    }

    #[tokio::test]
    async fn test_toggle_like_missing_course() {
        let (adapter, _store) = adapter_with(vec![]);
        assert_eq!(adapter.toggle_like("nope", "u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_subscribe_to_all_receives_changes() {
        let (adapter, _store) = adapter_with(vec![Course::new("c1", "Algorithms")]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _sub = adapter
            .subscribe_to_all(move |courses| {
                let _ = tx.send(courses);
            })
            .await
            .unwrap();

        assert_eq!(next(&mut rx).await.len(), 1);

        adapter.toggle_like("c1", "u1").await.unwrap();
        assert_eq!(next(&mut rx).await[0].likes, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_stops_callbacks() {
        let (adapter, store) = adapter_with(vec![Course::new("c1", "Algorithms")]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = adapter
            .subscribe_to_one("c1", move |course| {
                let _ = tx.send(course);
            })
            .await
            .unwrap();
        assert!(next(&mut rx).await.is_some());

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());

        store.put(Course::new("c1", "Renamed")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_to_one_absent_course() {
        let (adapter, _store) = adapter_with(vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = adapter
            .subscribe_to_one("ghost", move |course| {
                let _ = tx.send(course);
            })
            .await
            .unwrap();

        assert!(next(&mut rx).await.is_none());
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn test_revoked_subscription_becomes_inactive() {
        let (adapter, store) = adapter_with(vec![Course::new("c1", "Algorithms")]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = adapter
            .subscribe_to_one("c1", move |course| {
                let _ = tx.send(course);
            })
            .await
            .unwrap();
        next(&mut rx).await;

        store.revoke("c1").await;
        for _ in 0..50 {
            if !sub.is_active() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn test_enroll_student_is_conditional() {
        let (adapter, store) = adapter_with(vec![Course::new("c1", "Algorithms")]);
        let student = Student {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            enrollment_date: "2024-01-15T00:00:00+00:00".to_string(),
        };

        adapter.enroll_student("c1", &student).await.unwrap();
        adapter.enroll_student("c1", &student).await.unwrap();

        let students = adapter.enrolled_students("c1").await.unwrap();
        assert_eq!(students, vec![student]);
        assert!(store.get_one("c1").await.unwrap().unwrap().has_student("u1"));
    }

    #[tokio::test]
    async fn test_enroll_student_missing_course() {
        let (adapter, _store) = adapter_with(vec![]);
        let student = Student {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: String::new(),
            enrollment_date: String::new(),
        };

        let result = adapter.enroll_student("nope", &student).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(adapter.enrolled_students("nope").await.unwrap().is_empty());
    }
}
