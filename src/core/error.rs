//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`ChangeViewError`] which covers every failure mode of the
//! change aggregation engine. It uses `thiserror` for ergonomic error definitions
//! and includes constructor helpers for the variants that carry context.
//!
//! # Public API
//! - [`ChangeViewError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, ChangeViewError>`
//!
//! # Error Categories
//! - **Git operations**: repository discovery, subprocess failures and timeouts
//! - **Status parsing**: unknown status codes, malformed porcelain lines
//! - **Store operations**: SQLite errors, closed store, data directory creation
//! - **Resolution**: a non-empty batch that resolved zero timestamps

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for git-changes
#[derive(Error, Debug)]
pub enum ChangeViewError {
    // Git repository errors
    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("Git repository error: {0}")]
    GitRepo(#[from] git2::Error),

    #[error("Repository has no working directory")]
    BareRepository,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Subprocess errors
    #[error("git {command} failed (exit code {code:?}): {stderr}")]
    GitCommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("git {command} timed out after {timeout_ms} ms")]
    GitCommandTimeout { command: String, timeout_ms: u64 },

    #[error("Could not classify changes in '{path}': {reason}")]
    ClassificationFailed { path: PathBuf, reason: String },

    #[error("Unexpected output from git history query: '{output}'")]
    InvalidHistoryOutput { output: String },

    // Status parsing errors
    #[error("Unrecognized status code: '{code}'")]
    UnknownStatusCode { code: String },

    #[error("Malformed status line: {reason}")]
    MalformedStatusLine { reason: String },

    // Store errors
    #[error("Deleted-file store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Deleted-file store has been closed")]
    StoreClosed,

    #[error("Failed to create store directory '{path}': {source}")]
    StoreDirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Store worker failed: {0}")]
    StoreWorker(#[from] tokio::task::JoinError),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    // Configuration errors
    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Resolution errors
    #[error("Could not resolve a timestamp for any of the {count} changed files. Is git installed and on PATH?")]
    TimestampResolutionFailed { count: usize },
}

/// Convenience type alias for Results using ChangeViewError
pub type Result<T> = std::result::Result<T, ChangeViewError>;

impl ChangeViewError {
    /// Create a git command failure from a finished process
    pub fn git_command_failed(
        command: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::GitCommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create a git command timeout error
    pub fn git_command_timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::GitCommandTimeout {
            command: command.into(),
            timeout_ms,
        }
    }

    /// Create a status classification failure for one repository
    pub fn classification_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ClassificationFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown status code error
    pub fn unknown_status_code(code: impl Into<String>) -> Self {
        Self::UnknownStatusCode { code: code.into() }
    }

    /// Create a malformed status line error
    pub fn malformed_status_line(reason: impl Into<String>) -> Self {
        Self::MalformedStatusLine {
            reason: reason.into(),
        }
    }

    /// Create a store directory creation failed error
    pub fn store_directory_creation_failed(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::StoreDirectoryCreationFailed {
            path: path.into(),
            source,
        }
    }

    /// Create a config parse failed error
    pub fn config_parse_failed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ConfigParseFailed {
            path: path.into(),
            source,
        }
    }

    /// True for failures that are environment problems the user must see,
    /// as opposed to per-file noise that is degraded silently.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::TimestampResolutionFailed { .. }
                | Self::ClassificationFailed { .. }
                | Self::NotInGitRepo
                | Self::BareRepository
        )
    }
}
