//! Push subscription handle

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::remote::ChangeFeed;

/// A live push subscription
///
/// One task drains the change feed and runs the callback for each snapshot,
/// so callbacks for a subscription never overlap and run in the order the
/// store emitted them. Dropping the handle unsubscribes.
///
/// The active flag stays locked while a callback runs, so `unsubscribe`
/// waits for a running callback and none starts afterwards. A callback must
/// not unsubscribe its own subscription.
pub struct Subscription {
    label: String,
    active: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Subscription {
    /// Spawn the task draining `feed` into `on_change`
    pub(crate) fn spawn<T, F>(label: impl Into<String>, mut feed: ChangeFeed<T>, mut on_change: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let label = label.into();
        let active = Arc::new(Mutex::new(true));

        let task_active = Arc::clone(&active);
        let task_label = label.clone();
        let task = tokio::spawn(async move {
            while let Some(item) = feed.recv().await {
                let mut active = lock(&task_active);
                if !*active {
                    return;
                }
                match item {
                    Ok(value) => on_change(value),
                    Err(e) => {
                        warn!("Subscription {} ended: {}", task_label, e);
                        *active = false;
                        return;
                    }
                }
            }
            *lock(&task_active) = false;
        });

        debug!("Subscribed to {}", label);
        Self {
            label,
            active,
            task,
        }
    }

    /// Stop receiving snapshots
    ///
    /// No callback starts after this returns. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        let mut active = lock(&self.active);
        if *active {
            *active = false;
            self.task.abort();
            debug!("Unsubscribed from {}", self.label);
        }
    }

    /// Whether snapshots are still being delivered
    ///
    /// Becomes false after `unsubscribe`, after a terminal store error, or
    /// when the store closes the feed.
    pub fn is_active(&self) -> bool {
        *lock(&self.active)
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}
