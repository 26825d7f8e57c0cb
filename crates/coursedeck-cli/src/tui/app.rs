//! Application state and logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use coursedeck_core::remote::ConnectionStatus;
use coursedeck_core::views::catalog::{result_label, search};
use coursedeck_core::views::{
    CatalogView, CourseDetailView, CustomProgressInput, Dashboard, EnrollButtonState,
    PROGRESS_PRESETS,
};
use coursedeck_core::{
    AppState, Course, CourseActions, CourseId, EnrollOutcome, LocalStore, StoreError, SyncAdapter,
};

/// How long a status message stays up
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Which view is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Catalog,
    Detail,
    Dashboard,
}

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Typing a catalog search (after pressing /)
    Search,
    /// Choosing a progress preset
    ProgressMenu,
    /// Typing a custom progress value
    CustomProgress,
}

/// Connection indicator in the top-right corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnIndicator {
    /// Connected to the remote store
    Connected,
    /// Connecting or reconnecting
    Connecting,
    /// Disconnected, will retry
    Offline,
    /// Serving a local catalog
    Local,
    /// A view lost its subscription
    Error,
}

impl ConnIndicator {
    pub fn from_status(status: Option<ConnectionStatus>) -> Self {
        match status {
            None => ConnIndicator::Local,
            Some(ConnectionStatus::Connected) => ConnIndicator::Connected,
            Some(ConnectionStatus::Connecting) => ConnIndicator::Connecting,
            Some(ConnectionStatus::Disconnected) => ConnIndicator::Offline,
        }
    }
}

/// Result of a background action
#[derive(Debug)]
pub enum TaskResult {
    Enroll {
        course_id: CourseId,
        outcome: EnrollOutcome,
    },
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    /// Latest local store snapshot
    pub state: Arc<AppState>,
    /// Catalog search text
    pub query: String,
    /// Selected row in the filtered catalog
    pub course_index: usize,
    /// Selected syllabus row in the detail view
    pub week_index: usize,
    /// Selected enrollment on the dashboard (in-progress first)
    pub entry_index: usize,
    /// Selected row of the progress menu; the row after the presets is "Custom"
    pub preset_index: usize,
    pub custom_progress: CustomProgressInput,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Store connection as last reported
    pub connection: ConnIndicator,
    catalog: Option<CatalogView>,
    detail: Option<CourseDetailView>,
    adapter: SyncAdapter,
    store: LocalStore,
    actions: CourseActions,
}

impl App {
    pub fn new(
        adapter: SyncAdapter,
        store: LocalStore,
        actions: CourseActions,
        connection: ConnIndicator,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Catalog,
            input_mode: InputMode::Normal,
            state: store.snapshot(),
            query: String::new(),
            course_index: 0,
            week_index: 0,
            entry_index: 0,
            preset_index: 0,
            custom_progress: CustomProgressInput::default(),
            status_message: None,
            status_message_time: None,
            show_help: false,
            connection,
            catalog: None,
            detail: None,
            adapter,
            store,
            actions,
        }
    }

    /// Take the latest snapshot and keep selections in range
    pub fn refresh(&mut self) {
        self.state = self.store.snapshot();
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let courses = self.visible_courses().len();
        self.course_index = self.course_index.min(courses.saturating_sub(1));
        let weeks = self.detail_course().map_or(0, |c| c.syllabus.len());
        self.week_index = self.week_index.min(weeks.saturating_sub(1));
        let entries = self.state.user.enrolled_courses.len();
        self.entry_index = self.entry_index.min(entries.saturating_sub(1));
    }

    /// Indicator to draw, accounting for dead subscriptions
    pub fn indicator(&self) -> ConnIndicator {
        let catalog_dead = self.catalog.as_ref().is_some_and(|v| !v.is_live());
        let detail_dead = self.detail.as_ref().is_some_and(|v| !v.is_live());
        if catalog_dead || detail_dead {
            ConnIndicator::Error
        } else {
            self.connection
        }
    }

    pub fn session_name(&self) -> &str {
        &self.actions.session().name
    }

    pub fn session_initials(&self) -> String {
        self.actions.session().initials()
    }

    // ---- Catalog ----

    pub fn visible_courses(&self) -> Vec<&Course> {
        search(&self.state.courses, &self.query)
    }

    pub fn selected_course(&self) -> Option<&Course> {
        self.visible_courses().get(self.course_index).copied()
    }

    /// "Found N courses" while searching
    pub fn search_label(&self) -> Option<String> {
        result_label(&self.query, self.visible_courses().len())
    }

    pub fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.course_index = 0;
    }

    pub fn pop_query(&mut self) {
        self.query.pop();
        self.course_index = 0;
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.course_index = 0;
    }

    // ---- Detail ----

    pub fn detail(&self) -> Option<&CourseDetailView> {
        self.detail.as_ref()
    }

    /// The course shown by the detail view, once it is in the local store
    pub fn detail_course(&self) -> Option<&Course> {
        self.detail
            .as_ref()
            .and_then(|view| self.state.course(view.course_id()))
    }

    pub fn enroll_button(&self) -> Option<EnrollButtonState> {
        self.detail_course().map(|course| {
            EnrollButtonState::for_course(
                course,
                &self.state.user,
                self.actions.is_enrolling(&course.id),
            )
        })
    }

    pub fn is_liked(&self, course: &Course) -> bool {
        course.is_liked_by(&self.actions.session().user_id)
    }

    /// Expand or collapse the selected syllabus week
    pub fn toggle_week(&mut self) {
        let Some(week) = self
            .detail_course()
            .and_then(|c| c.syllabus.get(self.week_index))
            .map(|w| w.week)
        else {
            return;
        };
        if let Some(view) = self.detail.as_mut() {
            view.syllabus.toggle(week);
        }
    }

    /// Start enrolling in the shown course
    ///
    /// Runs in the background; the outcome comes back on `tx`.
    pub fn start_enroll(&self, tx: &UnboundedSender<TaskResult>) {
        let Some(course_id) = self.detail_course().map(|c| c.id.clone()) else {
            return;
        };
        if !self.enroll_button().is_some_and(|b| b.is_actionable()) {
            return;
        }

        let actions = self.actions.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = actions.enroll(&course_id).await;
            let _ = tx.send(TaskResult::Enroll { course_id, outcome });
        });
    }

    /// Toggle the like on the shown course
    ///
    /// Fire and forget: the detail subscription delivers the new count.
    pub fn start_like(&self) {
        let Some(course_id) = self.detail_course().map(|c| c.id.clone()) else {
            return;
        };
        let actions = self.actions.clone();
        tokio::spawn(async move {
            // Failures are logged by the action
            let _ = actions.toggle_like(&course_id).await;
        });
    }

    pub fn handle_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Enroll { course_id, outcome } => {
                let name = self
                    .state
                    .course(&course_id)
                    .map_or(course_id.clone(), |c| c.name.clone());
                match outcome {
                    EnrollOutcome::Enrolled => self.set_status(format!("Enrolled in {}", name)),
                    EnrollOutcome::Closed => {
                        self.set_status(format!("Enrollment is closed for {}", name))
                    }
                    // Failures are logged and the button simply returns to
                    // "Enroll Now"
                    EnrollOutcome::AlreadyEnrolled
                    | EnrollOutcome::InFlight
                    | EnrollOutcome::Failed(_) => {}
                }
                self.refresh();
            }
        }
    }

    // ---- Dashboard ----

    pub fn dashboard(&self) -> Dashboard<'_> {
        Dashboard::new(&self.state)
    }

    /// Course id of the selected dashboard entry
    pub fn selected_enrollment(&self) -> Option<CourseId> {
        let dashboard = self.dashboard();
        dashboard
            .in_progress
            .iter()
            .chain(dashboard.completed.iter())
            .nth(self.entry_index)
            .map(|entry| entry.enrollment.course_id.clone())
    }

    pub fn mark_selected_completed(&mut self) {
        if let Some(course_id) = self.selected_enrollment() {
            self.actions.mark_completed(&course_id);
            self.refresh();
            self.set_status("Marked as completed".to_string());
        }
    }

    pub fn open_progress_menu(&mut self) {
        if self.selected_enrollment().is_some() {
            self.preset_index = 0;
            self.custom_progress.clear();
            self.input_mode = InputMode::ProgressMenu;
        }
    }

    /// Number of rows in the progress menu
    pub fn progress_menu_len() -> usize {
        PROGRESS_PRESETS.len() + 1
    }

    /// Apply the highlighted preset, or switch to custom input
    pub fn confirm_preset(&mut self) {
        match PROGRESS_PRESETS.get(self.preset_index) {
            Some(&preset) => self.apply_progress(preset),
            None => self.input_mode = InputMode::CustomProgress,
        }
    }

    /// Apply the custom value; does nothing until it is valid
    pub fn confirm_custom_progress(&mut self) {
        if let Ok(progress) = self.custom_progress.value() {
            self.apply_progress(progress);
        }
    }

    fn apply_progress(&mut self, progress: u8) {
        let Some(course_id) = self.selected_enrollment() else {
            self.close_progress_menu();
            return;
        };
        match self.actions.set_progress(&course_id, i64::from(progress)) {
            Ok(()) => self.set_status(format!("Progress set to {}%", progress)),
            Err(e) => self.set_status(e.to_string()),
        }
        self.close_progress_menu();
        self.refresh();
    }

    pub fn close_progress_menu(&mut self) {
        self.custom_progress.clear();
        self.input_mode = InputMode::Normal;
    }

    // ---- Navigation ----

    pub fn move_down(&mut self) {
        match (self.input_mode, self.screen) {
            (InputMode::ProgressMenu, _) => {
                if self.preset_index + 1 < Self::progress_menu_len() {
                    self.preset_index += 1;
                }
            }
            (_, Screen::Catalog) => {
                if self.course_index + 1 < self.visible_courses().len() {
                    self.course_index += 1;
                }
            }
            (_, Screen::Detail) => {
                let weeks = self.detail_course().map_or(0, |c| c.syllabus.len());
                if self.week_index + 1 < weeks {
                    self.week_index += 1;
                }
            }
            (_, Screen::Dashboard) => {
                if self.entry_index + 1 < self.state.user.enrolled_courses.len() {
                    self.entry_index += 1;
                }
            }
        }
    }

    pub fn move_up(&mut self) {
        let index = match (self.input_mode, self.screen) {
            (InputMode::ProgressMenu, _) => &mut self.preset_index,
            (_, Screen::Catalog) => &mut self.course_index,
            (_, Screen::Detail) => &mut self.week_index,
            (_, Screen::Dashboard) => &mut self.entry_index,
        };
        *index = index.saturating_sub(1);
    }

    /// Show the catalog, mounting its subscription
    pub async fn show_catalog(&mut self) -> Result<(), StoreError> {
        self.unmount_detail();
        self.ensure_catalog().await?;
        self.screen = Screen::Catalog;
        Ok(())
    }

    /// Show the dashboard; course titles come from the catalog subscription
    pub async fn show_dashboard(&mut self) -> Result<(), StoreError> {
        self.unmount_detail();
        self.ensure_catalog().await?;
        self.screen = Screen::Dashboard;
        self.entry_index = 0;
        Ok(())
    }

    /// Open the detail view for the selected catalog course
    pub async fn open_selected(&mut self) -> Result<(), StoreError> {
        let Some(course_id) = self.selected_course().map(|c| c.id.clone()) else {
            return Ok(());
        };
        self.open_detail(&course_id).await
    }

    pub async fn open_detail(&mut self, course_id: &str) -> Result<(), StoreError> {
        let view = CourseDetailView::mount(&self.adapter, &self.store, course_id).await?;
        self.unmount_detail();
        if let Some(mut catalog) = self.catalog.take() {
            catalog.unmount();
        }
        self.detail = Some(view);
        self.week_index = 0;
        self.screen = Screen::Detail;
        Ok(())
    }

    async fn ensure_catalog(&mut self) -> Result<(), StoreError> {
        if !self.catalog.as_ref().is_some_and(CatalogView::is_live) {
            self.catalog = Some(CatalogView::mount(&self.adapter, &self.store).await?);
        }
        Ok(())
    }

    fn unmount_detail(&mut self) {
        if let Some(mut detail) = self.detail.take() {
            detail.unmount();
        }
    }

    /// Unmount every view
    pub fn unmount_all(&mut self) {
        self.unmount_detail();
        if let Some(mut catalog) = self.catalog.take() {
            catalog.unmount();
        }
    }

    /// Set a status message with auto-dismiss timer
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_message_time = Some(Instant::now());
    }

    /// Clear status message if it has been displayed long enough
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() >= STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }
}
