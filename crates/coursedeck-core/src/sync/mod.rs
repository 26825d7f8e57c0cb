//! Keeping local state in step with the remote store
//!
//! `SyncAdapter` exposes subscriptions and writes; `Subscription` is the
//! disposer returned by every subscribe call.

mod adapter;
mod subscription;

pub use adapter::SyncAdapter;
pub use subscription::Subscription;
