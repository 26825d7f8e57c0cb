//! Remote course store boundary
//!
//! The `courses` collection lives in a remote document store owned by a third
//! party. This module defines the operations we consume from it and two
//! implementations:
//!
//! - `MemoryStore`: in-process collection (tests, offline catalog file)
//! - `WsCourseStore`: persistent WebSocket connection to a document server
//!
//! ## Change feeds
//!
//! `watch_all`/`watch_one` return a channel that yields the current snapshot
//! immediately and then one item per remote change, in the order the store
//! emits them. An `Err` item is terminal for that feed. The feed closes when
//! the receiver is dropped.

mod memory;
mod message;
mod update;
mod ws;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::Course;

pub use memory::MemoryStore;
pub use update::{DocumentUpdate, FieldOp, FieldUpdate};
pub use ws::{ConnectionStatus, WsCourseStore, WsStoreConfig};

/// Name of the remote collection
pub const COURSES_COLLECTION: &str = "courses";

/// Stream of snapshots pushed by the store
pub type ChangeFeed<T> = mpsc::UnboundedReceiver<Result<T, StoreError>>;

/// Operations consumed from the remote course store
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// One-shot read of the whole collection
    async fn get_all(&self) -> Result<Vec<Course>, StoreError>;

    /// One-shot read of a single course (`None` if it does not exist)
    async fn get_one(&self, course_id: &str) -> Result<Option<Course>, StoreError>;

    /// Snapshot of the collection now and after every change
    async fn watch_all(&self) -> Result<ChangeFeed<Vec<Course>>, StoreError>;

    /// Snapshot of one document now and after every change
    async fn watch_one(&self, course_id: &str) -> Result<ChangeFeed<Option<Course>>, StoreError>;

    /// Apply a partial update atomically
    ///
    /// Fails with `StoreError::NotFound` if the document does not exist.
    async fn update(&self, course_id: &str, update: DocumentUpdate) -> Result<(), StoreError>;
}
