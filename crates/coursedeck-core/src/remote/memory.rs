//! In-process course store
//!
//! Holds the collection as JSON documents and pushes snapshots to every open
//! feed after each change. Used by the tests and to serve a catalog file when
//! no remote store is configured.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use super::{ChangeFeed, CourseStore, DocumentUpdate};
use crate::error::StoreError;
use crate::models::Course;

type AllSender = mpsc::UnboundedSender<Result<Vec<Course>, StoreError>>;
type OneSender = mpsc::UnboundedSender<Result<Option<Course>, StoreError>>;

/// Course collection kept in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    /// Documents keyed by id (snapshots are ordered by id)
    docs: BTreeMap<String, Map<String, Value>>,
    /// Feeds watching the whole collection
    all_watchers: Vec<AllSender>,
    /// Feeds watching a single document
    doc_watchers: HashMap<String, Vec<OneSender>>,
    /// When set, every write fails with this error
    write_failure: Option<StoreError>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given courses
    pub fn with_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        let mut inner = Inner::default();
        for course in courses {
            if let Ok(doc) = to_document(&course) {
                inner.docs.insert(course.id.clone(), doc);
            }
        }
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Load a catalog from a JSON file containing an array of courses
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
        let courses: Vec<Course> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {:?}", path))?;
        debug!("Loaded {} courses from {:?}", courses.len(), path);
        Ok(Self::with_courses(courses))
    }

    /// Insert or replace a course, notifying watchers
    pub async fn put(&self, course: Course) -> Result<(), StoreError> {
        let doc = to_document(&course)?;
        let mut inner = self.inner.lock().await;
        inner.docs.insert(course.id.clone(), doc);
        inner.notify(&course.id);
        Ok(())
    }

    /// Delete a course, notifying watchers
    pub async fn remove(&self, course_id: &str) {
        let mut inner = self.inner.lock().await;
        if inner.docs.remove(course_id).is_some() {
            inner.notify(course_id);
        }
    }

    /// Make every subsequent write fail (or succeed again with `None`)
    pub async fn fail_writes(&self, error: Option<StoreError>) {
        self.inner.lock().await.write_failure = error;
    }

    /// Revoke access to one document: its feeds receive a terminal error
    pub async fn revoke(&self, course_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(senders) = inner.doc_watchers.remove(course_id) {
            for tx in senders {
                let _ = tx.send(Err(StoreError::PermissionDenied(course_id.to_string())));
            }
        }
    }
}

impl Inner {
    fn snapshot(&self) -> Vec<Course> {
        self.docs
            .values()
            .filter_map(|doc| match from_document(doc) {
                Ok(course) => Some(course),
                Err(e) => {
                    warn!("Skipping undecodable course document: {}", e);
                    None
                }
            })
            .collect()
    }

    fn document(&self, course_id: &str) -> Result<Option<Course>, StoreError> {
        self.docs.get(course_id).map(from_document).transpose()
    }

    /// Forget feeds whose receiver is gone
    fn prune_closed(&mut self) {
        self.all_watchers.retain(|tx| !tx.is_closed());
        self.doc_watchers.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
    }

    /// Push fresh snapshots to the collection feeds and to the feeds of
    /// `changed_id`, dropping feeds whose receiver is gone
    fn notify(&mut self, changed_id: &str) {
        if !self.all_watchers.is_empty() {
            let snapshot = self.snapshot();
            self.all_watchers
                .retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
        }

        let doc = self.document(changed_id);
        if let Some(senders) = self.doc_watchers.get_mut(changed_id) {
            senders.retain(|tx| tx.send(doc.clone()).is_ok());
            if senders.is_empty() {
                self.doc_watchers.remove(changed_id);
            }
        }
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.inner.lock().await.snapshot())
    }

    async fn get_one(&self, course_id: &str) -> Result<Option<Course>, StoreError> {
        self.inner.lock().await.document(course_id)
    }

    async fn watch_all(&self) -> Result<ChangeFeed<Vec<Course>>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;
        inner.prune_closed();
        let _ = tx.send(Ok(inner.snapshot()));
        inner.all_watchers.push(tx);
        Ok(rx)
    }

    async fn watch_one(&self, course_id: &str) -> Result<ChangeFeed<Option<Course>>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().await;
        inner.prune_closed();
        let _ = tx.send(inner.document(course_id));
        inner
            .doc_watchers
            .entry(course_id.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn update(&self, course_id: &str, update: DocumentUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(error) = inner.write_failure.clone() {
            return Err(error);
        }

        let doc = inner
            .docs
            .get_mut(course_id)
            .ok_or_else(|| StoreError::NotFound(course_id.to_string()))?;
        update.apply(doc)?;

        debug!("Applied {} field update(s) to {}", update.fields.len(), course_id);
        inner.notify(course_id);
        Ok(())
    }
}

fn to_document(course: &Course) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(course)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Decode("course is not an object".to_string())),
    }
}

fn from_document(doc: &Map<String, Value>) -> Result<Course, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc.clone()))?)
}
