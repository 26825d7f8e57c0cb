//! coursedeck Core Library
//!
//! This crate provides the core functionality for coursedeck, a course
//! catalog and enrollment client backed by a remote real-time document store.
//!
//! # Architecture
//!
//! - **Remote store**: owns the `courses` collection; we only speak to it
//!   through the `CourseStore` trait
//! - **Sync adapter**: push subscriptions and field updates on top of it
//! - **Local store**: `courses` (mirrored) and `user` (local) slices,
//!   changed only by pure reducers
//! - **Views**: read snapshots and mount subscriptions while shown
//!
//! # Quick Start
//!
//! ```text
//! let adapter = SyncAdapter::new(Arc::new(MemoryStore::from_json_file(path)?));
//! let store = LocalStore::new(AppState::new(UserState::new(session.clone(), seed)));
//!
//! // Mirror the catalog while the view is shown
//! let catalog = CatalogView::mount(&adapter, &store).await?;
//!
//! // Enroll, confirmed by the store before it is recorded locally
//! let actions = CourseActions::new(adapter, store.clone(), session);
//! actions.enroll("QbsJU9EojHiJfeuZ0cYR").await;
//! ```
//!
//! # Modules
//!
//! - `models`: Courses, students and enrollments
//! - `remote`: Store boundary, in-memory and WebSocket implementations
//! - `sync`: Sync adapter and subscriptions
//! - `state`: Local store and reducers
//! - `views`: Catalog, detail and dashboard view models
//! - `actions`: Enroll, like and progress actions
//! - `config`: Application configuration
//! - `session`: Acting user identity

pub mod actions;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod session;
pub mod state;
pub mod sync;
pub mod views;

pub use actions::{CourseActions, EnrollOutcome};
pub use config::Config;
pub use error::{StoreError, ValidationError};
pub use models::{Course, CourseId, Enrollment, EnrollmentStatus, Student, SyllabusWeek};
pub use remote::{CourseStore, MemoryStore, WsCourseStore};
pub use session::Session;
pub use state::{Action, AppState, LocalStore, UserState};
pub use sync::{Subscription, SyncAdapter};
