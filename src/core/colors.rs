//! Color mapping for change kinds.
//!
//! # Color Scheme
//! - **Modified**: Yellow
//! - **Added**: Green
//! - **Deleted**: Red
//! - **Renamed/Copied**: Blue
//! - **Untracked**: Cyan
//! - **Unmerged**: Red bold

use crate::core::git_status::ChangeKind;
use colored::*;

/// Color function for a change kind, applicable to any text
pub fn get_status_color_style(kind: ChangeKind) -> Box<dyn Fn(&str) -> ColoredString> {
    match kind {
        ChangeKind::Modified => Box::new(|text: &str| text.yellow()),
        ChangeKind::Untracked => Box::new(|text: &str| text.cyan()),
        ChangeKind::Deleted => Box::new(|text: &str| text.red()),
        ChangeKind::Added => Box::new(|text: &str| text.green()),
        ChangeKind::Renamed => Box::new(|text: &str| text.blue()),
        ChangeKind::Copied => Box::new(|text: &str| text.blue()),
        ChangeKind::TypeChanged => Box::new(|text: &str| text.magenta()),
        ChangeKind::Unmerged => Box::new(|text: &str| text.red().bold()),
    }
}

/// Colored status symbol padded to two columns
pub fn get_aligned_status(kind: ChangeKind) -> ColoredString {
    let color_fn = get_status_color_style(kind);
    let symbol = kind.as_str();
    match symbol.len() {
        2 => color_fn(symbol),
        _ => color_fn(&format!("{symbol} ")),
    }
}

pub fn get_colored_path(kind: ChangeKind, path: &str) -> ColoredString {
    get_status_color_style(kind)(path)
}
