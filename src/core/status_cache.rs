//! Short-lived cache in front of the batched status query.
//!
//! A refresh burst asks for the same repository's status several times within
//! a few milliseconds. [`StatusCache`] answers all of them from one `git status`
//! run as long as the entry is younger than the TTL.
//!
//! Hits hand out the stored `Arc<StatusMap>` itself; callers must treat it as
//! read-only. Concurrent misses for the same key are not coalesced, so two
//! simultaneous misses may both run the query; the later one wins the slot.

use crate::core::clock::Clock;
use crate::core::error::{ChangeViewError, Result};
use crate::core::git::GitRunner;
use crate::core::git_status::parse_porcelain_v2;
use crate::core::state::{CacheEntry, ChangeRecord, StatusMap};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
}

impl CacheMetrics {
    /// Fraction of lookups served from cache, 0.0 when nothing was asked yet
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

pub struct StatusCache {
    runner: Arc<dyn GitRunner>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatusCache {
    pub fn new(runner: Arc<dyn GitRunner>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            runner,
            clock,
            ttl_ms: ttl.as_millis() as i64,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// All changed paths of the repository rooted at `repo_root`.
    ///
    /// A failed status query is logged and yields an empty map. An empty map
    /// therefore means "unknown", not "clean"; callers that must tell the two
    /// apart use [`StatusCache::try_get_batch_status`].
    pub async fn get_batch_status(&self, repo_root: &Path) -> Arc<StatusMap> {
        match self.try_get_batch_status(repo_root).await {
            Ok(map) => map,
            Err(e) => {
                log::warn!("{e}");
                Arc::new(StatusMap::new())
            }
        }
    }

    /// Like [`StatusCache::get_batch_status`], but a failed query is an error.
    ///
    /// Failures are never cached, so the next call runs the query again.
    pub async fn try_get_batch_status(&self, repo_root: &Path) -> Result<Arc<StatusMap>> {
        let started = self.clock.now_ms();
        if let Some(map) = self.fresh_entry(repo_root, started) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(map);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let raw = self
            .runner
            .status_porcelain(repo_root)
            .await
            .map_err(|e| ChangeViewError::classification_failed(repo_root, e.to_string()))?;
        let map = Arc::new(parse_porcelain_v2(&raw));
        log::debug!(
            "Status cache miss for {}: {} changed paths",
            repo_root.display(),
            map.len()
        );
        self.lock_entries().insert(
            repo_root.to_path_buf(),
            CacheEntry {
                status_map: Arc::clone(&map),
                captured_at: started,
            },
        );
        Ok(map)
    }

    /// Single-path lookup on top of [`StatusCache::get_batch_status`]
    pub async fn get_file_status(&self, repo_root: &Path, path: &str) -> Option<ChangeRecord> {
        self.get_batch_status(repo_root).await.get(path).cloned()
    }

    /// Drop the entry for `repo_root` so the next lookup runs the query
    pub fn invalidate(&self, repo_root: &Path) {
        if self.lock_entries().remove(repo_root).is_some() {
            log::debug!("Invalidated status cache for {}", repo_root.display());
        }
    }

    pub fn get_metrics(&self) -> CacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheMetrics {
            hits,
            misses,
            total: hits + misses,
        }
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        self.lock_entries().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn fresh_entry(&self, repo_root: &Path, now: i64) -> Option<Arc<StatusMap>> {
        let entries = self.lock_entries();
        let entry = entries.get(repo_root)?;
        (now - entry.captured_at < self.ttl_ms).then(|| Arc::clone(&entry.status_map))
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::git_status::Classification;
    use crate::core::testing::{change_line, untracked_line, FakeGit};

    fn setup(lines: &[String]) -> (Arc<FakeGit>, Arc<ManualClock>, StatusCache) {
        let git = Arc::new(FakeGit::with_lines(lines));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = StatusCache::new(git.clone(), clock.clone(), DEFAULT_CACHE_TTL);
        (git, clock, cache)
    }

    #[tokio::test]
    async fn test_hit_within_ttl_returns_same_map() {
        let (git, clock, cache) = setup(&[change_line(".M", "a.rs")]);
        let root = Path::new("/repo");

        let first = cache.get_batch_status(root).await;
        clock.advance(99);
        let second = cache.get_batch_status(root).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(git.status_calls(), 1);
        assert_eq!(
            cache.get_metrics(),
            CacheMetrics {
                hits: 1,
                misses: 1,
                total: 2
            }
        );
    }

    #[tokio::test]
    async fn test_entry_at_ttl_is_a_miss() {
        let (git, clock, cache) = setup(&[change_line(".M", "a.rs")]);
        let root = Path::new("/repo");

        let first = cache.get_batch_status(root).await;
        clock.advance(100);
        let second = cache.get_batch_status(root).await;

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(git.status_calls(), 2);
        assert_eq!(cache.get_metrics().misses, 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_miss() {
        let (git, _clock, cache) = setup(&[untracked_line("new.txt")]);
        let root = Path::new("/repo");

        cache.get_batch_status(root).await;
        cache.invalidate(root);
        cache.get_batch_status(root).await;

        assert_eq!(git.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (git, _clock, cache) = setup(&[untracked_line("new.txt")]);

        cache.get_batch_status(Path::new("/one")).await;
        cache.get_batch_status(Path::new("/two")).await;
        cache.invalidate(Path::new("/one"));
        cache.get_batch_status(Path::new("/two")).await;

        assert_eq!(git.status_calls(), 2);
        assert_eq!(cache.get_metrics().hits, 1);
    }

    #[tokio::test]
    async fn test_hit_rate_for_repeated_calls() {
        let (git, clock, cache) = setup(&[change_line("M.", "a.rs")]);
        let root = Path::new("/repo");

        for _ in 0..10 {
            cache.get_batch_status(root).await;
            clock.advance(5);
        }

        assert_eq!(git.status_calls(), 1);
        assert!(cache.get_metrics().hit_rate() >= 0.9);
    }

    #[tokio::test]
    async fn test_failure_returns_empty_map_and_is_not_cached() {
        let (git, _clock, cache) = setup(&[change_line("M.", "a.rs")]);
        let root = Path::new("/repo");

        git.fail_status(true);
        let failed = cache.get_batch_status(root).await;
        assert!(failed.is_empty());

        git.fail_status(false);
        let recovered = cache.get_batch_status(root).await;
        assert_eq!(recovered.len(), 1);
        assert_eq!(git.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_try_variant_reports_failure() {
        let (git, _clock, cache) = setup(&[change_line("M.", "a.rs")]);
        let root = Path::new("/repo");

        git.fail_status(true);
        let err = cache.try_get_batch_status(root).await.unwrap_err();
        assert!(matches!(err, ChangeViewError::ClassificationFailed { .. }));
        assert!(err.to_string().contains("/repo"));

        git.fail_status(false);
        let map = cache.try_get_batch_status(root).await.unwrap();
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_entries_and_metrics() {
        let (git, _clock, cache) = setup(&[change_line("M.", "a.rs")]);
        let root = Path::new("/repo");

        cache.get_batch_status(root).await;
        cache.get_batch_status(root).await;
        cache.clear();

        assert_eq!(cache.get_metrics(), CacheMetrics::default());
        cache.get_batch_status(root).await;
        assert_eq!(git.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_get_file_status() {
        let (_git, _clock, cache) = setup(&[change_line("M.", "a.rs"), untracked_line("b.rs")]);
        let root = Path::new("/repo");

        let a = cache.get_file_status(root, "a.rs").await.expect("a.rs changed");
        assert_eq!(a.classification, Classification::Staged);
        assert!(cache.get_file_status(root, "c.rs").await.is_none());
    }
}
