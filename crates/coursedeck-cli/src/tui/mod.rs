//! coursedeck TUI
//!
//! Terminal user interface for browsing courses, enrolling and tracking
//! progress.
//!
//! ## Screens
//!
//! - Courses: catalog list with live search
//! - Course: detail with syllabus accordion, like and enroll
//! - Dashboard: stats, in-progress and completed courses
//!
//! Each screen mounts the store subscriptions it needs while it is shown
//! and drops them when left.
//!
//! ## Navigation
//!
//! - j/k or ↑/↓: Move selection up/down
//! - Tab: Switch between Courses and Dashboard
//! - Enter: Open course / confirm
//! - Esc: Back
//! - q: Quit

mod app;
mod ui;

use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::{mpsc, watch};
use tracing::info;

use coursedeck_core::remote::ConnectionStatus;
use coursedeck_core::{Config, StoreError};

use crate::context::Context;
use crate::logging::init_tui_logging;
use app::{App, ConnIndicator, InputMode, Screen, TaskResult};

/// Run the TUI application
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if COURSEDECK_LOG is set)
    init_tui_logging(&config);

    // Fail before touching the terminal
    let ctx = Context::open(config)?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(
        ctx.adapter.clone(),
        ctx.store.clone(),
        ctx.actions.clone(),
        ConnIndicator::from_status(ctx.backend.connection()),
    );
    if let Err(e) = app.show_catalog().await {
        app.set_status(format!("Could not load courses: {}", e));
    }

    let result = run_app(&mut terminal, &mut app, &ctx).await;

    app.unmount_all();

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

/// Wait for the next connection status, or forever for local catalogs
async fn next_status(rx: &mut Option<watch::Receiver<ConnectionStatus>>) -> Option<ConnectionStatus> {
    match rx {
        Some(rx) => {
            rx.changed().await.ok()?;
            let status = *rx.borrow();
            Some(status)
        }
        None => std::future::pending().await,
    }
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, ctx: &Context) -> Result<()> {
    let (task_tx, mut task_rx) = mpsc::unbounded_channel();
    let mut state_rx = ctx.store.subscribe();
    let mut status_rx = ctx.backend.status.clone();

    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            biased;

            Some(result) = task_rx.recv() => {
                app.handle_task_result(result);
            }

            // Local store changed (push from a subscription or a reducer)
            Ok(()) = state_rx.changed() => {
                app.refresh();
            }

            Some(status) = next_status(&mut status_rx) => {
                info!("Connection status: {:?}", status);
                app.connection = ConnIndicator::from_status(Some(status));
            }

            // Poll for terminal events
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        // If help is showing, any key dismisses it
                        if app.show_help {
                            app.show_help = false;
                            continue;
                        }

                        let outcome = match app.input_mode {
                            InputMode::Normal => {
                                handle_normal_mode(app, key.code, key.modifiers, &task_tx).await
                            }
                            InputMode::Search => {
                                handle_search_mode(app, key.code);
                                Ok(())
                            }
                            InputMode::ProgressMenu => {
                                handle_progress_menu(app, key.code);
                                Ok(())
                            }
                            InputMode::CustomProgress => {
                                handle_custom_progress(app, key.code);
                                Ok(())
                            }
                        };
                        if let Err(e) = outcome {
                            app.set_status(format!("Store error: {}", e));
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
async fn handle_normal_mode(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    task_tx: &mpsc::UnboundedSender<TaskResult>,
) -> Result<(), StoreError> {
    match code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Help
        KeyCode::Char('?') => app.show_help = true,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Tab => match app.screen {
            Screen::Dashboard => app.show_catalog().await?,
            Screen::Catalog | Screen::Detail => app.show_dashboard().await?,
        },
        KeyCode::Esc if app.screen == Screen::Detail => app.show_catalog().await?,

        // Courses
        KeyCode::Char('/') if app.screen == Screen::Catalog => {
            app.input_mode = InputMode::Search;
        }
        KeyCode::Enter if app.screen == Screen::Catalog => app.open_selected().await?,

        // Course detail
        KeyCode::Enter | KeyCode::Char(' ') if app.screen == Screen::Detail => app.toggle_week(),
        KeyCode::Char('e') if app.screen == Screen::Detail => app.start_enroll(task_tx),
        KeyCode::Char('l') if app.screen == Screen::Detail => app.start_like(),

        // Dashboard
        KeyCode::Char('c') if app.screen == Screen::Dashboard => app.mark_selected_completed(),
        KeyCode::Char('p') if app.screen == Screen::Dashboard => app.open_progress_menu(),

        _ => {}
    }
    Ok(())
}

/// Handle key events while typing a search
fn handle_search_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.clear_query();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Backspace => app.pop_query(),
        KeyCode::Down => app.move_down(),
        KeyCode::Up => app.move_up(),
        KeyCode::Char(c) => app.push_query(c),
        _ => {}
    }
}

fn handle_progress_menu(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_progress_menu(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Enter => app.confirm_preset(),
        _ => {}
    }
}

fn handle_custom_progress(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.close_progress_menu(),
        KeyCode::Enter => app.confirm_custom_progress(),
        KeyCode::Backspace => app.custom_progress.pop(),
        KeyCode::Char(c) => app.custom_progress.push(c),
        _ => {}
    }
}
