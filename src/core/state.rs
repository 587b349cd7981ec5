//! Data model shared by the classifier, cache, store and aggregator.
//!
//! # Public API
//! - [`ChangeRecord`]: One changed path from a single refresh cycle
//! - [`StatusMap`]: Path-keyed records produced by one status query
//! - [`CacheEntry`]: A captured status map with its capture time
//! - [`DeletedFileRecord`]: Persisted, write-once ordering row for a deleted file
//! - [`Repository`]: A root path registered in the order store
//! - [`DeletionRow`] and [`StoreStats`]: Read-only analytical views of the store

use crate::core::git_status::{ChangeKind, Classification, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A changed path as reported by one status query.
///
/// Records are built once per refresh and never mutated afterwards; the
/// enrichment steps produce new values through the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub path: String,
    pub status: StatusCode,
    pub orig_path: Option<String>,
    pub similarity: Option<u8>,
    pub timestamp: Option<i64>,
    pub sequence_order: Option<u32>,
    pub classification: Classification,
}

impl ChangeRecord {
    pub fn new(path: impl Into<String>, status: StatusCode) -> Self {
        Self {
            path: path.into(),
            status,
            orig_path: None,
            similarity: None,
            timestamp: None,
            sequence_order: None,
            classification: Classification::from_code(status),
        }
    }

    pub fn with_rename(mut self, orig_path: impl Into<String>, similarity: Option<u8>) -> Self {
        self.orig_path = Some(orig_path.into());
        self.similarity = similarity;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<i64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_sequence_order(mut self, order: Option<u32>) -> Self {
        self.sequence_order = order;
        self
    }

    /// The kind of change shown to the user
    pub fn kind(&self) -> ChangeKind {
        ChangeKind::from_record(self)
    }

    /// True when the file no longer exists in the working tree
    pub fn is_deleted(&self) -> bool {
        self.kind() == ChangeKind::Deleted
    }

    /// Lower-cased extension of the path without the leading dot
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

/// Records keyed by repository-relative path
pub type StatusMap = HashMap<String, ChangeRecord>;

/// One cached status query. Replaced wholesale on the next miss.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status_map: Arc<StatusMap>,
    pub captured_at: i64,
}

/// Persisted ordering row for a deleted file.
///
/// `sequence_order` and `first_seen_timestamp` are write-once; `visible` is
/// a runtime flag layered on top by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedFileRecord {
    pub repository_id: i64,
    pub file_path: String,
    pub sequence_order: u32,
    pub first_seen_timestamp: i64,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub root_path: String,
    pub label: String,
}

/// A deleted file joined with the repository it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRow {
    pub root_path: String,
    pub label: String,
    pub file_path: String,
    pub sequence_order: u32,
    pub first_seen_timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_repositories: u64,
    pub total_deletions: u64,
    pub oldest_deletion: Option<i64>,
    pub newest_deletion: Option<i64>,
    pub database_size_bytes: u64,
}
