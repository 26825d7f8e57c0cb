//! Wiring shared by commands and the TUI
//!
//! Picks the course store from configuration, builds the session and the
//! local store, and hands out the adapter and actions bound to them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tokio::sync::watch;
use tracing::info;

use coursedeck_core::remote::{ConnectionStatus, WsStoreConfig};
use coursedeck_core::{
    Action, AppState, Config, CourseActions, CourseStore, LocalStore, MemoryStore, Session,
    SyncAdapter, UserState, WsCourseStore,
};

/// Where courses come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Remote store over WebSocket
    Remote(String),
    /// JSON catalog served from memory
    Catalog(PathBuf),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Remote(url) => write!(f, "remote ({})", url),
            Source::Catalog(path) => write!(f, "local catalog ({})", path.display()),
        }
    }
}

/// The course store plus what we know about its connection
pub struct Backend {
    pub store: Arc<dyn CourseStore>,
    pub source: Source,
    /// Connection status, only for remote stores
    pub status: Option<watch::Receiver<ConnectionStatus>>,
}

impl Backend {
    /// Open the store named by the configuration
    ///
    /// `store_url` wins over `catalog_file`. Must run inside the runtime.
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(url) = &config.store_url {
            info!("Connecting to course store at {}", url);
            let store = WsCourseStore::connect(WsStoreConfig::from_config(url, config));
            let status = store.subscribe_status();
            return Ok(Self {
                store: Arc::new(store),
                source: Source::Remote(url.clone()),
                status: Some(status),
            });
        }

        if let Some(path) = &config.catalog_file {
            let store = MemoryStore::from_json_file(path)?;
            return Ok(Self {
                store: Arc::new(store),
                source: Source::Catalog(path.clone()),
                status: None,
            });
        }

        bail!(
            "No course store configured.\n\
             Set one with: coursedeck config set store_url ws://host:port\n\
             or serve a JSON catalog: coursedeck config set catalog_file path/to/catalog.json"
        )
    }

    /// Current connection status (local catalogs are always reachable)
    pub fn connection(&self) -> Option<ConnectionStatus> {
        self.status.as_ref().map(|rx| *rx.borrow())
    }
}

/// Everything a command needs
pub struct Context {
    pub config: Config,
    pub backend: Backend,
    pub adapter: SyncAdapter,
    pub store: LocalStore,
    pub actions: CourseActions,
}

impl Context {
    pub fn open(config: Config) -> Result<Self> {
        let session = Session::from_config(&config).context(
            "No session configured. Set [session] id and name in the config file, \
             or COURSEDECK_USER_ID and COURSEDECK_USER_NAME",
        )?;
        let backend = Backend::open(&config)?;

        let adapter = SyncAdapter::new(Arc::clone(&backend.store));
        let user = UserState::new(session.clone(), config.enrollments.iter().cloned());
        let store = LocalStore::new(AppState::new(user));
        let actions = CourseActions::new(adapter.clone(), store.clone(), session);

        Ok(Self {
            config,
            backend,
            adapter,
            store,
            actions,
        })
    }

    /// One-shot read of the catalog into the `courses` slice
    pub async fn load_catalog(&self) -> Result<()> {
        let courses = self
            .adapter
            .get_courses()
            .await
            .context("Failed to load courses")?;
        self.store.dispatch(Action::SetCourses(courses));
        Ok(())
    }

    pub fn session(&self) -> &Session {
        self.actions.session()
    }
}
