//! Common assertion helpers for test output validation

#![allow(dead_code)]

use predicates::prelude::*;

/// Creates a predicate that checks for git repository error messages
pub fn not_in_git_repo() -> impl Predicate<str> {
    predicates::str::contains("Not in a git repository")
}

/// A recency bucket header such as "Today"
pub fn has_period(label: &str) -> impl Predicate<str> {
    predicates::str::contains(label.to_string())
}

pub fn has_staged_group() -> impl Predicate<str> {
    predicates::str::contains("Staged Changes")
}

/// The unstaged group header, which must not be confused with the staged one
pub fn has_unstaged_group() -> impl Predicate<str> {
    predicates::str::is_match(r"(?m)^Changes \(\d+\)").expect("valid regex")
}

pub fn has_no_changes() -> impl Predicate<str> {
    predicates::str::contains("No changes")
}

/// A deletion line carrying its sequence order
pub fn has_deletion(path: &str, order: u32) -> impl Predicate<str> {
    predicates::str::contains(format!("#{order}")).and(predicates::str::contains(path.to_string()))
}
