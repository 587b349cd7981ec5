//! Last-change timestamps for a batch of changed paths.
//!
//! Existing files use their modification time. Deleted files have nothing to
//! stat, so their time comes from the last commit that touched them.
//!
//! When the primary lookup misses, the fallbacks run in order and stop at the
//! first hit:
//! 1. retry with `/`-normalized separators
//! 2. stat an absolute path as given (skipped for deleted files)
//! 3. retry after resolving symbolic links
//!
//! Per-file failures are logged once and never abort the batch. Only a
//! non-empty batch with zero resolved timestamps is reported as an error.

use crate::core::error::{ChangeViewError, Result};
use crate::core::git::GitRunner;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRequest {
    pub path: String,
    pub deleted: bool,
}

impl TimestampRequest {
    pub fn new(path: impl Into<String>, deleted: bool) -> Self {
        Self {
            path: path.into(),
            deleted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTimestamps {
    pub resolved: HashMap<String, i64>,
    pub unresolved: Vec<String>,
}

pub struct TimestampResolver {
    runner: Arc<dyn GitRunner>,
}

impl TimestampResolver {
    pub fn new(runner: Arc<dyn GitRunner>) -> Self {
        Self { runner }
    }

    pub async fn resolve(
        &self,
        root: &Path,
        requests: &[TimestampRequest],
    ) -> Result<ResolvedTimestamps> {
        let mut batch = ResolvedTimestamps::default();
        for request in requests {
            match self.resolve_one(root, request).await {
                Some(ts) => {
                    batch.resolved.insert(request.path.clone(), ts);
                }
                None => batch.unresolved.push(request.path.clone()),
            }
        }

        if !requests.is_empty() && batch.resolved.is_empty() {
            log::error!(
                "No timestamps resolved for {} changed files in {}",
                requests.len(),
                root.display()
            );
            return Err(ChangeViewError::TimestampResolutionFailed {
                count: requests.len(),
            });
        }
        Ok(batch)
    }

    async fn resolve_one(&self, root: &Path, request: &TimestampRequest) -> Option<i64> {
        let mut misses: Vec<String> = Vec::new();

        match self.primary(root, &request.path, request.deleted).await {
            Ok(Some(ts)) => return Some(ts),
            Ok(None) => misses.push("no history".to_string()),
            Err(e) => misses.push(e.to_string()),
        }

        let normalized = normalize_separators(&request.path);
        if normalized != request.path {
            match self.primary(root, &normalized, request.deleted).await {
                Ok(Some(ts)) => return Some(ts),
                Ok(None) => misses.push("no history for normalized path".to_string()),
                Err(e) => misses.push(format!("normalized: {e}")),
            }
        }

        // Relative paths only ever resolve against the repository root
        let direct = Path::new(&request.path);
        if !request.deleted && direct.is_absolute() {
            match stat_mtime(direct).await {
                Ok(ts) => return Some(ts),
                Err(e) => misses.push(format!("direct stat: {e}")),
            }
        }

        match self.resolve_through_links(root, &normalized, request.deleted).await {
            Ok(Some(ts)) => return Some(ts),
            Ok(None) => {}
            Err(e) => misses.push(format!("symlink: {e}")),
        }

        log::warn!(
            "Unresolved timestamp for {}: {}",
            request.path,
            misses.join("; ")
        );
        None
    }

    async fn primary(&self, root: &Path, path: &str, deleted: bool) -> Result<Option<i64>> {
        if deleted {
            self.runner.last_commit_time(root, path).await
        } else {
            stat_mtime(&root.join(path)).await.map(Some)
        }
    }

    async fn resolve_through_links(
        &self,
        root: &Path,
        path: &str,
        deleted: bool,
    ) -> Result<Option<i64>> {
        if deleted {
            // The file is gone, but the repository root itself may be a link
            let real_root = tokio::fs::canonicalize(root).await?;
            if real_root == root {
                return Ok(None);
            }
            self.runner.last_commit_time(&real_root, path).await
        } else {
            let real_path: PathBuf = tokio::fs::canonicalize(root.join(path)).await?;
            stat_mtime(&real_path).await.map(Some)
        }
    }
}

async fn stat_mtime(path: &Path) -> Result<i64> {
    let modified = tokio::fs::metadata(path).await?.modified()?;
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis())
}

/// Forward slashes only, no `./` prefix, no doubled separators
fn normalize_separators(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    match normalized.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}
