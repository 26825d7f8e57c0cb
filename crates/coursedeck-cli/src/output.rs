//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use coursedeck_core::views::catalog::result_label;
use coursedeck_core::views::dashboard::DashboardEntry;
use coursedeck_core::views::{Dashboard, EnrollButtonState};
use coursedeck_core::{Course, Student, UserState};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{}", json);
        Ok(())
    }

    /// Print a list of courses, optionally as search results
    pub fn print_courses(
        &self,
        courses: &[&Course],
        query: Option<&str>,
        user: &UserState,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if let Some(label) = query.and_then(|q| result_label(q, courses.len())) {
                    println!("{}", label);
                    if courses.is_empty() {
                        return Ok(());
                    }
                    println!();
                } else if courses.is_empty() {
                    println!("No courses found.");
                    return Ok(());
                }

                for course in courses {
                    let marker = if user.is_enrolled(&course.id) { "*" } else { " " };
                    println!(
                        "{} {} | {} | {} | {:<8} | ♥ {}",
                        marker,
                        course.id,
                        truncate(&course.name, 35),
                        truncate(&course.instructor, 20),
                        course.enrollment_status,
                        course.likes
                    );
                }
                if query.is_none() {
                    println!("\n{} course(s)", courses.len());
                }
            }
            OutputFormat::Json => self.print_json(courses)?,
            OutputFormat::Quiet => {
                for course in courses {
                    println!("{}", course.id);
                }
            }
        }
        Ok(())
    }

    /// Print a single course with its syllabus and enroll state
    pub fn print_course(
        &self,
        course: &Course,
        button: EnrollButtonState,
        user_id: &str,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:            {}", course.id);
                println!("Name:          {}", course.name);
                println!("Instructor:    {}", course.instructor);
                println!("Status:        {}", course.enrollment_status);
                if !course.duration.is_empty() {
                    println!("Duration:      {}", course.duration);
                }
                if !course.schedule.is_empty() {
                    println!("Schedule:      {}", course.schedule);
                }
                if !course.location.is_empty() {
                    println!("Location:      {}", course.location);
                }
                let liked = if course.is_liked_by(user_id) { " (liked)" } else { "" };
                println!("Likes:         {}{}", course.likes, liked);
                println!("Students:      {}", course.students.len());
                println!("Enrollment:    {}", button.label());

                if !course.description.is_empty() {
                    println!();
                    println!("{}", course.description);
                }

                if !course.prerequisites.is_empty() {
                    println!();
                    println!("── Prerequisites ──");
                    for prerequisite in &course.prerequisites {
                        println!("- {}", prerequisite);
                    }
                }

                if !course.syllabus.is_empty() {
                    println!();
                    println!("── Syllabus ({} weeks) ──", course.syllabus.len());
                    for week in &course.syllabus {
                        println!("Week {}: {}", week.week, week.topic);
                        if !week.content.is_empty() {
                            println!("  {}", truncate_line(&week.content, 70));
                        }
                    }
                }
            }
            OutputFormat::Json => {
                self.print_json(&serde_json::json!({
                    "course": course,
                    "enrollButton": button.label(),
                    "liked": course.is_liked_by(user_id),
                }))?;
            }
            OutputFormat::Quiet => {
                println!("{}", course.id);
            }
        }
        Ok(())
    }

    /// Print the students enrolled in a course
    pub fn print_students(&self, students: &[Student]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if students.is_empty() {
                    println!("No students enrolled.");
                    return Ok(());
                }
                for student in students {
                    let since = student
                        .enrollment_date
                        .get(..10)
                        .unwrap_or(student.enrollment_date.as_str());
                    println!(
                        "{} | {} | {} | since {}",
                        student.id,
                        truncate(&student.name, 25),
                        truncate(&student.email, 30),
                        since
                    );
                }
                println!("\n{} student(s)", students.len());
            }
            OutputFormat::Json => self.print_json(students)?,
            OutputFormat::Quiet => {
                for student in students {
                    println!("{}", student.id);
                }
            }
        }
        Ok(())
    }

    /// Print stats and the completed / in-progress lists
    pub fn print_dashboard(&self, dashboard: &Dashboard<'_>) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Welcome back, {}", dashboard.user_name);
                println!();
                println!("Enrolled:          {}", dashboard.stats.enrolled);
                println!("Completed:         {}", dashboard.stats.completed);
                println!("Overall progress:  {}%", dashboard.stats.overall_progress);

                println!();
                println!("── In progress ({}) ──", dashboard.in_progress.len());
                if dashboard.in_progress.is_empty() {
                    println!("Nothing in progress.");
                }
                for entry in &dashboard.in_progress {
                    print_entry(entry);
                }

                println!();
                println!("── Completed ({}) ──", dashboard.completed.len());
                if dashboard.completed.is_empty() {
                    println!("No completed courses yet.");
                }
                for entry in &dashboard.completed {
                    print_entry(entry);
                }
            }
            OutputFormat::Json => self.print_json(dashboard)?,
            OutputFormat::Quiet => {
                println!(
                    "{} {} {}",
                    dashboard.stats.enrolled,
                    dashboard.stats.completed,
                    dashboard.stats.overall_progress
                );
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_entry(entry: &DashboardEntry<'_>) {
    println!(
        "{} | {} | {} | {:>3}% | since {}",
        entry.enrollment.course_id,
        truncate(entry.title(), 35),
        truncate(entry.instructor(), 20),
        entry.enrollment.progress,
        entry.enrollment.enrollment_date
    );
}

/// Text progress bar, `width` cells wide
pub fn progress_bar(progress: u8, width: usize) -> String {
    let filled = (usize::from(progress.min(100)) * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Truncate a string to max length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("this is too long", 10), "this is...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("Café Économie", 8), "Café ...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("first\nsecond", 20), "first");
        assert_eq!(truncate_line("", 20), "");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 10), "░░░░░░░░░░");
        assert_eq!(progress_bar(100, 10), "██████████");
        assert_eq!(progress_bar(45, 10), "█████░░░░░");
        assert_eq!(progress_bar(60, 4), "██░░");
    }
}
