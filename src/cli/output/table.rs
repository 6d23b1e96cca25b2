//! Table output formatting for CLI commands
//!
//! Formatted table output for stories, sprints, TDD cycles and background
//! tasks using comfy-table. Supports color-coded cells, automatic column
//! sizing, and accessibility features.

use crate::domain::models::{BackgroundTask, BackgroundTaskStatus, Sprint, SprintStatus, Story, StoryStatus, TDDCycle, TddState};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self { use_colors, max_width }
    }

    /// Format a list of stories as a table
    pub fn format_stories(&self, stories: &[Story]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("TDD").add_attribute(Attribute::Bold),
        ]);

        for story in stories {
            let id_short = &story.id.to_string()[..8];
            let title = truncate_text(&story.title, 40);

            let status_cell = if self.use_colors {
                Cell::new(format!("{:?}", story.status)).fg(story_status_color(story.status))
            } else {
                Cell::new(format!("{} {:?}", story_status_icon(story.status), story.status))
            };

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(&title),
                status_cell,
                Cell::new(story.priority.to_string()),
                Cell::new(story.test_status.as_deref().unwrap_or("-")),
            ]);
        }

        table.to_string()
    }

    /// Format a list of sprints as a table
    pub fn format_sprints(&self, sprints: &[Sprint]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Goal").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Stories").add_attribute(Attribute::Bold),
        ]);

        for sprint in sprints {
            let id_short = &sprint.id.to_string()[..8];

            let status_cell = if self.use_colors {
                Cell::new(format!("{:?}", sprint.status)).fg(sprint_status_color(sprint.status))
            } else {
                Cell::new(format!("{:?}", sprint.status))
            };

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(truncate_text(&sprint.goal, 40)),
                status_cell,
                Cell::new(sprint.story_ids.len().to_string()),
            ]);
        }

        table.to_string()
    }

    /// Format a TDD cycle's phase history as a table
    pub fn format_tdd_cycle(&self, cycle: &TDDCycle) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Started").add_attribute(Attribute::Bold),
            Cell::new("Completed").add_attribute(Attribute::Bold),
            Cell::new("Passed").add_attribute(Attribute::Bold),
        ]);

        for task in &cycle.history {
            let phase_cell = if self.use_colors {
                Cell::new(task.phase.to_string()).fg(tdd_phase_color(task.phase))
            } else {
                Cell::new(task.phase.to_string())
            };

            table.add_row(vec![
                phase_cell,
                Cell::new(task.started_at.format("%H:%M:%S").to_string()),
                Cell::new(task.completed_at.map_or_else(|| "-".to_string(), |t| t.format("%H:%M:%S").to_string())),
                Cell::new(task.passed.map_or_else(|| "-".to_string(), |p| p.to_string())),
            ]);
        }

        table.to_string()
    }

    /// Format a list of background tasks as a table
    pub fn format_background_tasks(&self, tasks: &[BackgroundTask]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Type").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Progress").add_attribute(Attribute::Bold),
        ]);

        for task in tasks {
            let id_short = &task.id.to_string()[..8];

            let status_cell = if self.use_colors {
                Cell::new(task.status.as_str()).fg(background_status_color(task.status))
            } else {
                Cell::new(format!("{} {}", background_status_icon(task.status), task.status.as_str()))
            };

            table.add_row(vec![
                Cell::new(id_short),
                Cell::new(&task.task_type),
                Cell::new(task.priority.as_str()),
                status_cell,
                Cell::new(format!("{:.0}%", task.progress * 100.0)),
            ]);
        }

        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table.load_preset(presets::UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width as u16);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    true
}

fn story_status_color(status: StoryStatus) -> Color {
    match status {
        StoryStatus::Done => Color::Green,
        StoryStatus::InProgress => Color::Cyan,
        StoryStatus::InSprint => Color::Yellow,
        StoryStatus::Backlog => Color::White,
    }
}

fn story_status_icon(status: StoryStatus) -> &'static str {
    match status {
        StoryStatus::Done => "✓",
        StoryStatus::InProgress => "⟳",
        StoryStatus::InSprint => "●",
        StoryStatus::Backlog => "○",
    }
}

fn sprint_status_color(status: SprintStatus) -> Color {
    match status {
        SprintStatus::Complete => Color::Green,
        SprintStatus::Active => Color::Cyan,
        SprintStatus::Review => Color::Yellow,
        SprintStatus::Planned => Color::White,
    }
}

fn tdd_phase_color(phase: TddState) -> Color {
    match phase {
        TddState::Commit => Color::Green,
        TddState::CodeGreen => Color::Cyan,
        TddState::TestRed => Color::Red,
        TddState::Refactor => Color::Yellow,
        TddState::Design => Color::White,
    }
}

fn background_status_color(status: BackgroundTaskStatus) -> Color {
    match status {
        BackgroundTaskStatus::Completed => Color::Green,
        BackgroundTaskStatus::Running => Color::Cyan,
        BackgroundTaskStatus::Failed => Color::Red,
        BackgroundTaskStatus::Cancelled => Color::DarkGrey,
        BackgroundTaskStatus::Pending => Color::White,
    }
}

fn background_status_icon(status: BackgroundTaskStatus) -> &'static str {
    match status {
        BackgroundTaskStatus::Completed => "✓",
        BackgroundTaskStatus::Running => "⟳",
        BackgroundTaskStatus::Failed => "✗",
        BackgroundTaskStatus::Cancelled => "⊘",
        BackgroundTaskStatus::Pending => "○",
    }
}

/// Truncate text to max length with ellipsis
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        format!("{}...", &text[..max_len.saturating_sub(3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Priority;

    #[test]
    fn test_table_formatter_with_config() {
        let formatter = TableFormatter::with_config(false, Some(120));
        assert!(!formatter.use_colors);
        assert_eq!(formatter.max_width, Some(120));
    }

    #[test]
    fn test_format_stories() {
        let story = Story::new("Login flow", "as a user I want to log in", 2);
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_stories(&[story]);
        assert!(output.contains("Login flow"));
        assert!(output.contains("Backlog"));
    }

    #[test]
    fn test_format_sprints() {
        let sprint = Sprint::new("ship auth", vec![]);
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_sprints(&[sprint]);
        assert!(output.contains("ship auth"));
        assert!(output.contains("Planned"));
    }

    #[test]
    fn test_format_tdd_cycle() {
        use crate::domain::models::TDDTask;
        use uuid::Uuid;

        let mut cycle = TDDCycle::new(Uuid::new_v4());
        cycle.record(TDDTask::new(TddState::Design, Uuid::new_v4()));
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_tdd_cycle(&cycle);
        assert!(output.contains("DESIGN"));
    }

    #[test]
    fn test_format_background_tasks() {
        let task = BackgroundTask::new("index_update", Priority::High);
        let formatter = TableFormatter::with_config(false, None);
        let output = formatter.format_background_tasks(&[task]);
        assert!(output.contains("index_update"));
        assert!(output.contains("high"));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("this is a very long text", 10), "this is...");
    }
}
