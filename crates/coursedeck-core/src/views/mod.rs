//! View models
//!
//! Plain data derived from `AppState` snapshots plus the mount/unmount glue
//! that ties a view's lifetime to its store subscriptions. Rendering lives in
//! the front end.

pub mod catalog;
pub mod dashboard;
pub mod detail;

pub use catalog::CatalogView;
pub use dashboard::{CustomProgressInput, Dashboard, DashboardStats, PROGRESS_PRESETS};
pub use detail::{CourseDetailView, EnrollButtonState, StatusTone, SyllabusAccordion};
