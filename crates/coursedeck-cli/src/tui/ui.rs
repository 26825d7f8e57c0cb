//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use coursedeck_core::views::dashboard::DashboardEntry;
use coursedeck_core::views::{StatusTone, PROGRESS_PRESETS};
use coursedeck_core::Course;

use super::app::{App, ConnIndicator, InputMode, Screen};
use crate::output::{progress_bar, truncate};

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn highlight() -> Style {
    Style::default()
        .add_modifier(Modifier::BOLD)
        .add_modifier(Modifier::REVERSED)
}

fn tone_style(tone: StatusTone) -> Style {
    match tone {
        StatusTone::Open => Style::default().fg(Color::Green),
        StatusTone::Closed => Style::default().fg(Color::Red),
        StatusTone::Other => Style::default().fg(Color::Yellow),
    }
}

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    // Header, body, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);

    match app.screen {
        Screen::Catalog => draw_catalog(frame, app, chunks[1]),
        Screen::Detail => draw_detail(frame, app, chunks[1]),
        Screen::Dashboard => draw_dashboard(frame, app, chunks[1]),
    }

    draw_connection_indicator(frame, app);

    match app.input_mode {
        InputMode::Search => draw_search_input(frame, app, chunks[2]),
        _ => draw_status_bar(frame, app, chunks[2]),
    }

    if matches!(
        app.input_mode,
        InputMode::ProgressMenu | InputMode::CustomProgress
    ) {
        draw_progress_menu(frame, app);
    }

    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Tabs on the left, user badge on the right
fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(format!(" {} ", label), highlight())
        } else {
            Span::styled(format!(" {} ", label), dim())
        }
    };

    let mut spans = vec![
        Span::styled("coursedeck ", bold()),
        tab("Courses", app.screen != Screen::Dashboard),
        Span::raw(" "),
        tab("Dashboard", app.screen == Screen::Dashboard),
    ];

    let badge = format!("[{}] {}", app.session_initials(), app.session_name());
    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    // Leave room for the connection indicator
    let pad = (area.width as usize).saturating_sub(used + badge.chars().count() + 4);
    spans.push(Span::raw(" ".repeat(pad)));
    spans.push(Span::styled(badge, Style::default().fg(Color::Cyan)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Catalog list with search results
fn draw_catalog(frame: &mut Frame, app: &App, area: Rect) {
    let courses = app.visible_courses();
    let max_len = area.width.saturating_sub(6) as usize;

    let items: Vec<ListItem> = courses
        .iter()
        .map(|course| {
            let enrolled = if app.state.user.is_enrolled(&course.id) {
                Span::styled("● ", Style::default().fg(Color::Green))
            } else {
                Span::raw("  ")
            };
            let title = Line::from(vec![
                enrolled,
                Span::raw(truncate(&course.name, max_len)),
            ]);
            let meta = Line::from(vec![
                Span::raw("  "),
                Span::styled(truncate(&course.instructor, 30), dim()),
                Span::styled("  ", dim()),
                Span::styled(
                    course.enrollment_status.to_string(),
                    tone_style(StatusTone::from(&course.enrollment_status)),
                ),
                Span::styled(format!("  ♥ {}", course.likes), dim()),
            ]);
            ListItem::new(vec![title, meta])
        })
        .collect();

    let title = match app.search_label() {
        Some(label) => format!(" Courses - {} ", label),
        None => format!(" Courses ({}) ", courses.len()),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(bold());

    if items.is_empty() {
        let text = if app.query.is_empty() {
            "No courses yet"
        } else {
            "No courses found"
        };
        let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(text, dim()))])
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = ListState::default();
    state.select(Some(app.course_index));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Course detail: summary, syllabus accordion and enroll button
fn draw_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(course) = app.detail_course() else {
        let block = Block::default().title(" Course ").borders(Borders::ALL);
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("Loading course...", dim())),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    draw_course_summary(frame, app, course, chunks[0]);
    draw_syllabus(frame, app, course, chunks[1]);
}

fn draw_course_summary(frame: &mut Frame, app: &App, course: &Course, area: Rect) {
    let field = |label: &'static str, value: &str| {
        Line::from(vec![
            Span::styled(format!("{}: ", label), bold()),
            Span::raw(if value.is_empty() { "-".to_string() } else { value.to_string() }),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled(course.name.clone(), bold())),
        Line::from(Span::styled(course.instructor.clone(), dim())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status: ", bold()),
            Span::styled(
                course.enrollment_status.to_string(),
                tone_style(StatusTone::from(&course.enrollment_status)),
            ),
        ]),
        field("Duration", &course.duration),
        field("Schedule", &course.schedule),
        field("Location", &course.location),
        Line::from(vec![
            Span::styled("Likes: ", bold()),
            if app.is_liked(course) {
                Span::styled(format!("♥ {}", course.likes), Style::default().fg(Color::Red))
            } else {
                Span::raw(format!("♡ {}", course.likes))
            },
        ]),
        Line::from(""),
    ];

    if let Some(button) = app.enroll_button() {
        let style = if button.is_actionable() {
            Style::default().fg(Color::Black).bg(Color::Green)
        } else {
            dim().add_modifier(Modifier::REVERSED)
        };
        lines.push(Line::from(Span::styled(format!(" {} ", button.label()), style)));
        lines.push(Line::from(""));
    }

    if !course.description.is_empty() {
        lines.push(Line::from(course.description.clone()));
        lines.push(Line::from(""));
    }

    if !course.prerequisites.is_empty() {
        lines.push(Line::from(Span::styled("Prerequisites", bold())));
        for prerequisite in &course.prerequisites {
            lines.push(Line::from(format!("  - {}", prerequisite)));
        }
    }

    let block = Block::default()
        .title(" Course ")
        .borders(Borders::ALL)
        .border_style(bold());
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_syllabus(frame: &mut Frame, app: &App, course: &Course, area: Rect) {
    let syllabus = app.detail().map(|view| &view.syllabus);

    let items: Vec<ListItem> = course
        .syllabus
        .iter()
        .map(|week| {
            let expanded = syllabus.is_some_and(|s| s.is_expanded(week.week));
            let marker = if expanded { "▼" } else { "▶" };
            let mut lines = vec![Line::from(format!(
                "{} Week {}: {}",
                marker, week.week, week.topic
            ))];
            if expanded {
                for content_line in week.content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", content_line),
                        dim(),
                    )));
                }
            }
            ListItem::new(lines)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Syllabus ({} weeks) ", course.syllabus.len()))
        .borders(Borders::ALL);

    if items.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled("No syllabus yet", dim())))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = ListState::default();
    state.select(Some(app.week_index));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Dashboard: stats on top, in-progress and completed below
fn draw_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let dashboard = app.dashboard();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let stats = vec![
        Line::from(Span::styled(
            format!("Welcome back, {}", dashboard.user_name),
            bold(),
        )),
        Line::from(vec![
            Span::styled("Enrolled: ", bold()),
            Span::raw(format!("{}   ", dashboard.stats.enrolled)),
            Span::styled("Completed: ", bold()),
            Span::raw(format!("{}   ", dashboard.stats.completed)),
            Span::styled("Overall: ", bold()),
            Span::raw(format!(
                "{} {}%",
                progress_bar(dashboard.stats.overall_progress, 20),
                dashboard.stats.overall_progress
            )),
        ]),
    ];
    let stats_block = Block::default()
        .title(" Dashboard ")
        .borders(Borders::ALL)
        .border_style(bold());
    frame.render_widget(Paragraph::new(stats).block(stats_block), chunks[0]);

    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let in_progress_len = dashboard.in_progress.len();
    let selected = app.entry_index;
    draw_entries(
        frame,
        " In Progress ",
        &dashboard.in_progress,
        (selected < in_progress_len).then_some(selected),
        "Nothing in progress",
        lists[0],
    );
    draw_entries(
        frame,
        " Completed ",
        &dashboard.completed,
        selected.checked_sub(in_progress_len),
        "No completed courses yet",
        lists[1],
    );
}

fn draw_entries(
    frame: &mut Frame,
    title: &str,
    entries: &[DashboardEntry<'_>],
    selected: Option<usize>,
    empty: &str,
    area: Rect,
) {
    let block = Block::default()
        .title(format!("{}({}) ", title, entries.len()))
        .borders(Borders::ALL)
        .border_style(if selected.is_some() { bold() } else { Style::default() });

    if entries.is_empty() {
        let paragraph = Paragraph::new(Line::from(Span::styled(empty.to_string(), dim())))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let max_len = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let progress = entry.enrollment.progress;
            ListItem::new(vec![
                Line::from(truncate(entry.title(), max_len)),
                Line::from(Span::styled(
                    format!(
                        "{} {:>3}%  since {}",
                        progress_bar(progress, 12),
                        progress,
                        entry.enrollment.enrollment_date
                    ),
                    dim(),
                )),
            ])
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = ListState::default();
    state.select(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        let keys = match app.screen {
            Screen::Catalog => "/:search  Enter:open  Tab:dashboard  ?:help  q:quit",
            Screen::Detail => "e:enroll  l:like  Space:week  Esc:back  Tab:dashboard  ?:help  q:quit",
            Screen::Dashboard => "p:progress  c:complete  Tab:courses  ?:help  q:quit",
        };
        keys.to_string()
    };

    frame.render_widget(Paragraph::new(content).style(dim()), area);
}

/// Draw search input at the bottom
fn draw_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let prefix = "/";
    let matches = app.visible_courses().len();

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Cyan)),
        Span::raw(app.query.as_str()),
        Span::styled(format!("  ({} matches)", matches), dim()),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prefix.len() as u16 + app.query.chars().count() as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw connection indicator in top-right corner
fn draw_connection_indicator(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if area.width < 5 {
        return;
    }

    let (icon, style) = match app.indicator() {
        ConnIndicator::Connected => ("✓", Style::default().fg(Color::Green)),
        ConnIndicator::Connecting => ("↻", Style::default().fg(Color::Yellow)),
        ConnIndicator::Offline => ("⚡", Style::default().fg(Color::DarkGray)),
        ConnIndicator::Local => ("○", dim()),
        ConnIndicator::Error => ("✗", Style::default().fg(Color::Red)),
    };

    let indicator = Paragraph::new(Span::styled(icon, style));
    let indicator_area = Rect::new(area.width - 2, 0, 1, 1);
    frame.render_widget(indicator, indicator_area);
}

fn centered(frame: &Frame, width: u16, height: u16) -> Rect {
    let area = frame.area();
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        area.width.saturating_sub(width) / 2,
        area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

/// Progress presets plus the custom value field
fn draw_progress_menu(frame: &mut Frame, app: &App) {
    let popup_area = centered(frame, 36, 11);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Update progress ")
        .borders(Borders::ALL)
        .border_style(bold());

    if app.input_mode == InputMode::CustomProgress {
        let input = &app.custom_progress;
        let hint = match input.value() {
            Ok(_) => Span::styled("Enter to confirm", Style::default().fg(Color::Green)),
            Err(coursedeck_core::ValidationError::Empty) => {
                Span::styled("Type a value from 0 to 100", dim())
            }
            Err(e) => Span::styled(e.to_string(), Style::default().fg(Color::Red)),
        };
        let lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("Progress: ", bold()),
                Span::raw(format!("{}%", input.text())),
            ]),
            Line::from(""),
            Line::from(hint),
            Line::from(Span::styled("Esc to cancel", dim())),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), popup_area);

        let inner = block_inner(popup_area);
        let cursor_x = inner.x + "Progress: ".len() as u16 + input.text().len() as u16;
        frame.set_cursor_position((cursor_x, inner.y + 1));
        return;
    }

    let items: Vec<ListItem> = PROGRESS_PRESETS
        .iter()
        .map(|preset| ListItem::new(format!("{:>3}%", preset)))
        .chain(std::iter::once(ListItem::new("Custom...")))
        .collect();

    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = ListState::default();
    state.select(Some(app.preset_index));
    frame.render_stateful_widget(list, popup_area, &mut state);
}

/// Area inside a one-cell border
fn block_inner(area: Rect) -> Rect {
    Rect::new(
        area.x + 1,
        area.y + 1,
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    )
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let popup_area = centered(frame, 50, 22);

    // Clear the popup area
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled("Keyboard Shortcuts", bold())),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  Tab         Courses / Dashboard"),
        Line::from("  Enter       Open course"),
        Line::from("  Esc         Back to courses"),
        Line::from(""),
        Line::from("Courses:"),
        Line::from("  /           Search by name or instructor"),
        Line::from(""),
        Line::from("Course detail:"),
        Line::from("  Space       Expand/collapse week"),
        Line::from("  e           Enroll"),
        Line::from("  l           Like / unlike"),
        Line::from(""),
        Line::from("Dashboard:"),
        Line::from("  p           Update progress"),
        Line::from("  c           Mark completed"),
        Line::from(""),
        Line::from("  q           Quit"),
        Line::from(Span::styled("Press any key to close", dim())),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(bold());

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}
