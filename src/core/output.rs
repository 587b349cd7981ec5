//! Output formatting for the `git-changes` CLI.
//!
//! # Design Principles
//! - Red for errors, white for messages, bright_black for muted detail
//! - A newline before and after each block

use crate::core::colors::{get_aligned_status, get_colored_path};
use crate::core::error::ChangeViewError;
use crate::core::hierarchy::{ChangeHierarchy, GroupNode, TimeGroup};
use crate::core::state::ChangeRecord;
use chrono::{Local, TimeZone};
use colored::*;

/// Formats and prints an error message
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Text shown for a failed command; internal failures point at `--debug`
pub fn describe_error(error: &ChangeViewError) -> String {
    if error.is_user_visible() {
        error.to_string()
    } else {
        format!("{error} (run with --debug for details)")
    }
}

/// Formats and prints a success message
///
/// # Format
/// ```text
///
/// ✓ <message>
/// ```
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// Local wall-clock rendering of a Unix-ms timestamp
pub fn format_timestamp(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// One file line: `<status>  <path>  <time>`
pub fn format_record(record: &ChangeRecord) -> String {
    let kind = record.kind();
    let mut path = record.path.clone();
    if let Some(orig) = &record.orig_path {
        path = format!("{orig} -> {path}");
    }
    let time = record
        .timestamp
        .map(format_timestamp)
        .unwrap_or_else(|| "-".to_string());
    let order = match record.sequence_order {
        Some(n) => format!(" #{n}"),
        None => String::new(),
    };
    format!(
        "  {}  {}  {}{}",
        get_aligned_status(kind),
        get_colored_path(kind, &path),
        time.as_str().bright_black(),
        order.as_str().bright_black()
    )
}

/// Render a hierarchy as indented text, one section per group
pub fn render_hierarchy(hierarchy: &ChangeHierarchy) -> String {
    let mut lines = Vec::new();
    for root in hierarchy.roots() {
        match root {
            GroupNode::Status(group) => {
                lines.push(format!(
                    "{} {}",
                    group.kind.label().white().bold(),
                    format!("({})", group.total_count).as_str().bright_black()
                ));
                for time in &group.children {
                    render_time_group(time, "  ", &mut lines);
                }
            }
            GroupNode::Time(time) => render_time_group(time, "", &mut lines),
        }
    }
    lines.join("\n")
}

fn render_time_group(group: &TimeGroup, indent: &str, lines: &mut Vec<String>) {
    lines.push(format!("{indent}{}", group.period.label().blue()));
    for record in &group.children {
        lines.push(format!("{indent}{}", format_record(record)));
    }
}
