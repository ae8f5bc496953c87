//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::env;

use crate::domain::models::{RiskLevel, TaskStatus};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to a maximum number of characters, appending "..."
/// if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// First eight characters of an id.
pub fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Table with UTF-8 borders and a bold header row.
pub fn table_with_header(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

pub fn status_cell(status: TaskStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    if supports_color() {
        cell.fg(match status {
            TaskStatus::Completed => Color::Green,
            TaskStatus::Running => Color::Cyan,
            TaskStatus::Failed => Color::Red,
            TaskStatus::Cancelled => Color::DarkGrey,
            TaskStatus::Pending => Color::White,
        })
    } else {
        cell
    }
}

pub fn risk_cell(risk: RiskLevel) -> Cell {
    let cell = Cell::new(risk.as_str());
    if supports_color() {
        cell.fg(match risk {
            RiskLevel::Low => Color::Green,
            RiskLevel::Medium => Color::Yellow,
            RiskLevel::High => Color::Red,
        })
    } else {
        cell
    }
}

/// Check if the terminal supports colors
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_table_renders_header() {
        let mut table = table_with_header(&["Task", "Status"]);
        table.add_row(vec![Cell::new("Analyze"), Cell::new("pending")]);
        let rendered = table.to_string();
        assert!(rendered.contains("Task"));
        assert!(rendered.contains("Analyze"));
    }
}
