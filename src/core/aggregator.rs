//! The refresh pipeline for one repository.
//!
//! ```text
//! refresh() -> debounce -> status cache -> restored-file diff -> filter
//!           -> timestamps (+ deleted-file tracker) -> sort -> hierarchy
//! ```
//!
//! Each refresh publishes a new [`ChangeHierarchy`] as a single
//! `Arc` swap. Leaves that did not change since the previous refresh keep
//! their allocation, so handles held by consumers stay valid for
//! [`ChangeAggregator::get_parent`] and compare equal under `Arc::ptr_eq`.

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::ViewConfig;
use crate::core::debounce::{DebouncedAction, Debouncer};
use crate::core::deleted_tracker::DeletedFileTracker;
use crate::core::error::Result;
use crate::core::git::{GitCli, GitRepo, GitRunner};
use crate::core::git_status::{self, Classification};
use crate::core::hierarchy::{
    ChangeHierarchy, HierarchyMode, HierarchyNode, PeriodBoundaries, SortDirection,
};
use crate::core::order_store::{default_store_path, OrderStore};
use crate::core::state::{ChangeRecord, DeletedFileRecord, StatusMap};
use crate::core::status_cache::{CacheMetrics, StatusCache};
use crate::core::timestamps::{TimestampRequest, TimestampResolver};
use chrono::{Local, TimeZone};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewSettings {
    direction: SortDirection,
    mode: HierarchyMode,
    extensions: Vec<String>,
}

impl ViewSettings {
    fn from_config(config: &ViewConfig) -> Self {
        Self {
            direction: config.sort_direction,
            mode: config.hierarchy_mode,
            extensions: normalize_extensions(&config.extension_filter),
        }
    }

    fn accepts(&self, record: &ChangeRecord) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        record
            .extension()
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

/// Lower-case, dot-free, de-duplicated extension list
fn normalize_extensions<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for ext in raw {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

pub struct ChangeAggregator {
    repo_root: PathBuf,
    cache: StatusCache,
    resolver: TimestampResolver,
    tracker: tokio::sync::Mutex<DeletedFileTracker>,
    clock: Arc<dyn Clock>,
    settings: Mutex<ViewSettings>,
    hierarchy: watch::Sender<Arc<ChangeHierarchy>>,
    refresh_lock: tokio::sync::Mutex<()>,
    last_error: Mutex<Option<String>>,
    debouncer: Debouncer,
    disposed: AtomicBool,
}

impl ChangeAggregator {
    /// Build an aggregator for `repo_root`.
    ///
    /// Spawns the debounce loop, so this must run inside a tokio runtime.
    pub fn new(
        repo_root: impl Into<PathBuf>,
        runner: Arc<dyn GitRunner>,
        clock: Arc<dyn Clock>,
        tracker: DeletedFileTracker,
        config: &ViewConfig,
    ) -> Arc<Self> {
        let settings = ViewSettings::from_config(config);
        let (hierarchy, _) = watch::channel(Arc::new(ChangeHierarchy::empty(settings.mode)));

        Arc::new_cyclic(|this: &Weak<Self>| Self {
            repo_root: repo_root.into(),
            cache: StatusCache::new(Arc::clone(&runner), Arc::clone(&clock), config.cache_ttl()),
            resolver: TimestampResolver::new(runner),
            tracker: tokio::sync::Mutex::new(tracker),
            clock,
            settings: Mutex::new(settings),
            hierarchy,
            refresh_lock: tokio::sync::Mutex::new(()),
            last_error: Mutex::new(None),
            debouncer: Debouncer::spawn(config.debounce(), debounced_refresh(this.clone())),
            disposed: AtomicBool::new(false),
        })
    }

    /// Aggregator for the repository containing `path`, backed by the real
    /// `git` binary and the persistent deleted-file store.
    ///
    /// A store that cannot be opened is logged and replaced by in-memory
    /// tracking.
    pub fn open(path: &Path, config: &ViewConfig) -> Result<Arc<Self>> {
        let repo = GitRepo::open(path)?;
        let root = repo.workdir()?;
        let label = repo.label();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store_path = match &config.store_path {
            Some(p) => Ok(p.clone()),
            None => default_store_path(),
        };
        let tracker = match store_path.and_then(OrderStore::open) {
            Ok(store) => DeletedFileTracker::with_store(
                Arc::new(store),
                root.to_string_lossy(),
                label,
                Arc::clone(&clock),
            ),
            Err(e) => {
                log::warn!("Deleted-file store unavailable, ordering will not persist: {e}");
                DeletedFileTracker::in_memory(Arc::clone(&clock))
            }
        };

        let runner = GitCli::new().with_history_timeout(config.history_timeout());
        Ok(Self::new(root, Arc::new(runner), clock, tracker, config))
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    // === Status queries ===

    pub async fn get_batch_status(&self) -> Arc<StatusMap> {
        self.cache.get_batch_status(&self.repo_root).await
    }

    pub fn categorize_status(&self, record: &ChangeRecord) -> Classification {
        git_status::classify(record)
    }

    pub fn is_modified_after_staging(&self, record: &ChangeRecord) -> bool {
        git_status::is_modified_after_staging(record)
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate(&self.repo_root);
    }

    pub fn get_cache_metrics(&self) -> CacheMetrics {
        self.cache.get_metrics()
    }

    // === Deleted files ===

    pub async fn mark_as_deleted(&self, file_path: &str, timestamp: Option<i64>) -> u32 {
        let mut tracker = self.tracker.lock().await;
        tracker.initialize().await;
        tracker.mark_as_deleted(file_path, timestamp)
    }

    pub async fn hide_from_view(&self, file_path: &str) -> bool {
        let mut tracker = self.tracker.lock().await;
        tracker.initialize().await;
        tracker.hide_from_view(file_path)
    }

    pub async fn get_visible_deleted_files(&self) -> Vec<DeletedFileRecord> {
        let mut tracker = self.tracker.lock().await;
        tracker.initialize().await;
        tracker.get_visible_deleted_files()
    }

    // === View settings ===

    pub fn set_sort_order(&self, direction: SortDirection) {
        self.update_settings(|s| s.direction = direction);
    }

    /// Only show files with one of `extensions`; an empty list shows all
    pub fn set_extension_filter<S: AsRef<str>>(&self, extensions: &[S]) {
        let extensions = normalize_extensions(extensions);
        self.update_settings(|s| s.extensions = extensions);
    }

    pub fn set_hierarchy_mode(&self, mode: HierarchyMode) {
        self.update_settings(|s| s.mode = mode);
    }

    fn update_settings(&self, update: impl FnOnce(&mut ViewSettings)) {
        let changed = {
            let mut settings = lock(&self.settings);
            let before = settings.clone();
            update(&mut settings);
            *settings != before
        };
        if changed {
            self.refresh();
        }
    }

    // === Refresh ===

    /// Schedule a debounced refresh
    pub fn refresh(&self) {
        if !self.disposed.load(Ordering::SeqCst) {
            self.debouncer.trigger();
        }
    }

    pub fn cancel_pending_refresh(&self) {
        self.debouncer.cancel();
    }

    /// Run the pipeline now and publish the result.
    ///
    /// A failed status query or a total timestamp failure is returned as an
    /// error and kept in [`ChangeAggregator::last_error`]; the previous
    /// hierarchy stays published in both cases.
    pub async fn refresh_now(&self) -> Result<Arc<ChangeHierarchy>> {
        let _pipeline = self.refresh_lock.lock().await;
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(self.hierarchy());
        }

        let status = match self.cache.try_get_batch_status(&self.repo_root).await {
            Ok(status) => status,
            Err(e) => {
                // Unknown status says nothing about restored files
                log::error!("Refresh of {} failed: {e}", self.repo_root.display());
                *lock(&self.last_error) = Some(e.to_string());
                return Err(e);
            }
        };
        let settings = lock(&self.settings).clone();

        let mut tracker = self.tracker.lock().await;
        tracker.initialize().await;
        hide_restored(&mut tracker, &status);

        let visible: Vec<&ChangeRecord> = status.values().filter(|r| settings.accepts(r)).collect();
        let requests: Vec<TimestampRequest> = visible
            .iter()
            .map(|r| TimestampRequest::new(r.path.clone(), r.is_deleted()))
            .collect();
        let batch = match self.resolver.resolve(&self.repo_root, &requests).await {
            Ok(batch) => batch,
            Err(e) => {
                // Deletions are still recorded so their order is not lost
                track_deletions(&mut tracker, &status, &HashMap::new());
                tracker.flush().await;
                log::error!("Refresh of {} failed: {e}", self.repo_root.display());
                *lock(&self.last_error) = Some(e.to_string());
                return Err(e);
            }
        };
        track_deletions(&mut tracker, &status, &batch.resolved);
        tracker.flush().await;

        let previous = self.hierarchy();
        let mut leaves: Vec<Arc<ChangeRecord>> = Vec::with_capacity(visible.len());
        for record in visible {
            let deleted = record.is_deleted();
            let timestamp = if deleted {
                tracker.get_timestamp(&record.path)
            } else {
                match batch.resolved.get(&record.path) {
                    Some(ts) => Some(*ts),
                    None => continue,
                }
            };
            let sequence_order = if deleted {
                tracker.get_order(&record.path)
            } else {
                None
            };
            let enriched = record
                .clone()
                .with_timestamp(timestamp)
                .with_sequence_order(sequence_order);

            let leaf = match previous.find_by_path(&record.path) {
                Some(prev) if *prev == enriched => prev,
                _ => Arc::new(enriched),
            };
            leaves.push(leaf);
        }
        drop(tracker);

        let bounds = PeriodBoundaries::at(&self.local_now());
        let built = Arc::new(ChangeHierarchy::build(
            leaves,
            settings.mode,
            settings.direction,
            &bounds,
        ));
        log::debug!(
            "Refreshed {}: {} files in view",
            self.repo_root.display(),
            built.len()
        );

        *lock(&self.last_error) = None;
        self.hierarchy.send_replace(Arc::clone(&built));
        Ok(built)
    }

    fn local_now(&self) -> chrono::DateTime<Local> {
        Local
            .timestamp_millis_opt(self.clock.now_ms())
            .single()
            .unwrap_or_else(Local::now)
    }

    // === Hierarchy access ===

    /// The last published hierarchy
    pub fn hierarchy(&self) -> Arc<ChangeHierarchy> {
        Arc::clone(&self.hierarchy.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ChangeHierarchy>> {
        self.hierarchy.subscribe()
    }

    /// The exact leaf object for `path` in the last published hierarchy
    pub fn find_by_path(&self, path: &str) -> Option<Arc<ChangeRecord>> {
        self.hierarchy().find_by_path(path)
    }

    pub fn get_parent(&self, node: &HierarchyNode) -> Option<HierarchyNode> {
        self.hierarchy().get_parent(node)
    }

    pub fn get_children(&self, node: Option<&HierarchyNode>) -> Vec<HierarchyNode> {
        self.hierarchy().get_children(node)
    }

    /// Message of the last failed refresh, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Stop scheduling refreshes and flush the deleted-file tracker
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        // A refresh already in flight finishes before the loop is stopped
        let _pipeline = self.refresh_lock.lock().await;
        self.debouncer.shutdown();
        self.tracker.lock().await.dispose().await;
        log::debug!("Disposed aggregator for {}", self.repo_root.display());
    }
}

fn debounced_refresh(this: Weak<ChangeAggregator>) -> DebouncedAction {
    Arc::new(move || {
        let this = this.clone();
        Box::pin(async move {
            let Some(aggregator) = this.upgrade() else {
                return;
            };
            // Failures are already logged and kept in last_error
            let _ = aggregator.refresh_now().await;
        })
    })
}

/// Hide tracked deletions whose file is no longer reported deleted
fn hide_restored(tracker: &mut DeletedFileTracker, status: &StatusMap) {
    let currently_deleted: HashSet<&str> = status
        .values()
        .filter(|r| r.is_deleted())
        .map(|r| r.path.as_str())
        .collect();
    for record in tracker.get_visible_deleted_files() {
        if !currently_deleted.contains(record.file_path.as_str()) {
            log::debug!("{} restored, hiding from view", record.file_path);
            tracker.hide_from_view(&record.file_path);
        }
    }
}

/// Mark every deleted path, new ones in timestamp order so orders are stable
fn track_deletions(
    tracker: &mut DeletedFileTracker,
    status: &StatusMap,
    resolved: &HashMap<String, i64>,
) {
    let mut deleted: Vec<(&str, Option<i64>)> = status
        .values()
        .filter(|r| r.is_deleted())
        .map(|r| (r.path.as_str(), resolved.get(&r.path).copied()))
        .collect();
    deleted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    for (path, timestamp) in deleted {
        tracker.mark_as_deleted(path, timestamp);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::error::ChangeViewError;
    use crate::core::hierarchy::{StatusGroupKind, TimePeriod};
    use crate::core::testing::{change_line, untracked_line, FakeGit};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        git: Arc<FakeGit>,
        aggregator: Arc<ChangeAggregator>,
    }

    fn harness_with(tracker: impl FnOnce(Arc<dyn Clock>) -> DeletedFileTracker, config: ViewConfig) -> Harness {
        let dir = TempDir::new().unwrap();
        let git = Arc::new(FakeGit::new());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(chrono::Utc::now().timestamp_millis()));
        let aggregator = ChangeAggregator::new(
            dir.path(),
            git.clone(),
            Arc::clone(&clock),
            tracker(Arc::clone(&clock)),
            &config,
        );
        Harness { dir, git, aggregator }
    }

    fn harness(config: ViewConfig) -> Harness {
        harness_with(DeletedFileTracker::in_memory, config)
    }

    fn touch(h: &Harness, path: &str) {
        std::fs::write(h.dir.path().join(path), path).unwrap();
    }

    fn grouped() -> ViewConfig {
        ViewConfig {
            hierarchy_mode: HierarchyMode::Grouped,
            ..ViewConfig::default()
        }
    }

    fn leaf_paths(hierarchy: &ChangeHierarchy, node: &HierarchyNode) -> Vec<String> {
        let mut out = Vec::new();
        for child in hierarchy.get_children(Some(node)) {
            match child {
                HierarchyNode::File(record) => out.push(record.path.clone()),
                other => out.extend(leaf_paths(hierarchy, &other)),
            }
        }
        out
    }

    #[tokio::test]
    async fn test_grouped_mode_puts_mm_only_under_unstaged() {
        let h = harness(grouped());
        touch(&h, "staged.ts");
        touch(&h, "dual.ts");
        h.git.set_lines(&[change_line("M.", "staged.ts"), change_line("MM", "dual.ts")]);

        let hierarchy = h.aggregator.refresh_now().await.unwrap();

        let roots = hierarchy.get_children(None);
        assert_eq!(
            roots,
            vec![
                HierarchyNode::Status(StatusGroupKind::Staged),
                HierarchyNode::Status(StatusGroupKind::Unstaged),
            ]
        );
        assert_eq!(leaf_paths(&hierarchy, &roots[0]), vec!["staged.ts"]);
        assert_eq!(leaf_paths(&hierarchy, &roots[1]), vec!["dual.ts"]);

        let dual = h.aggregator.find_by_path("dual.ts").unwrap();
        assert!(h.aggregator.is_modified_after_staging(&dual));
        assert_eq!(h.aggregator.categorize_status(&dual), Classification::Unstaged);
    }

    #[tokio::test]
    async fn test_empty_repository_has_no_nodes() {
        let h = harness(grouped());
        let hierarchy = h.aggregator.refresh_now().await.unwrap();
        assert!(hierarchy.is_empty());
        assert!(h.aggregator.get_children(None).is_empty());
        assert!(h.aggregator.last_error().is_none());
    }

    #[tokio::test]
    async fn test_unchanged_leaves_keep_identity() {
        let h = harness(ViewConfig::default());
        touch(&h, "a.rs");
        touch(&h, "b.rs");
        h.git.set_lines(&[change_line(".M", "a.rs"), change_line(".M", "b.rs")]);

        h.aggregator.refresh_now().await.unwrap();
        let first = h.aggregator.find_by_path("a.rs").unwrap();
        let first_b = h.aggregator.find_by_path("b.rs").unwrap();

        h.git.set_lines(&[change_line(".M", "a.rs"), change_line("M.", "b.rs")]);
        h.aggregator.invalidate_cache();
        h.aggregator.refresh_now().await.unwrap();

        let second = h.aggregator.find_by_path("a.rs").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first_b, &h.aggregator.find_by_path("b.rs").unwrap()));

        // A handle from the earlier refresh still navigates the new tree
        let parent = h.aggregator.get_parent(&HierarchyNode::File(first));
        assert_eq!(
            parent,
            Some(HierarchyNode::Time {
                status: None,
                period: TimePeriod::Today
            })
        );
    }

    #[tokio::test]
    async fn test_deleted_file_keeps_order_across_restore() {
        let h = harness(ViewConfig::default());
        h.git.set_history("gone.rs", 1_000);
        h.git.set_history("later.rs", 2_000);
        h.git.set_lines(&[change_line(".D", "gone.rs")]);

        h.aggregator.refresh_now().await.unwrap();
        let gone = h.aggregator.find_by_path("gone.rs").unwrap();
        assert_eq!(gone.sequence_order, Some(1));
        assert_eq!(gone.timestamp, Some(1_000));

        // restored
        h.git.set_lines(&[]);
        h.aggregator.invalidate_cache();
        h.aggregator.refresh_now().await.unwrap();
        assert!(h.aggregator.get_visible_deleted_files().await.is_empty());
        assert!(h.aggregator.find_by_path("gone.rs").is_none());

        // deleted again, alongside a new deletion
        h.git.set_lines(&[change_line(".D", "later.rs"), change_line("D.", "gone.rs")]);
        h.aggregator.invalidate_cache();
        h.aggregator.refresh_now().await.unwrap();

        assert_eq!(h.aggregator.find_by_path("gone.rs").unwrap().sequence_order, Some(1));
        assert_eq!(h.aggregator.find_by_path("later.rs").unwrap().sequence_order, Some(2));
        assert_eq!(h.aggregator.get_visible_deleted_files().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_deletion_uses_first_seen_time() {
        let h = harness(ViewConfig::default());
        touch(&h, "kept.rs");
        h.git.set_lines(&[change_line(".M", "kept.rs"), change_line(".D", "no-history.rs")]);

        h.aggregator.refresh_now().await.unwrap();

        let record = h.aggregator.find_by_path("no-history.rs").unwrap();
        assert!(record.timestamp.is_some());
        assert_eq!(record.sequence_order, Some(1));
    }

    #[tokio::test]
    async fn test_unresolved_existing_file_is_dropped() {
        let h = harness(ViewConfig::default());
        touch(&h, "real.rs");
        h.git.set_lines(&[change_line(".M", "real.rs"), change_line(".M", "phantom.rs")]);

        let hierarchy = h.aggregator.refresh_now().await.unwrap();
        assert_eq!(hierarchy.len(), 1);
        assert!(h.aggregator.find_by_path("phantom.rs").is_none());
    }

    #[tokio::test]
    async fn test_total_resolution_failure_is_reported() {
        let h = harness(ViewConfig::default());
        h.git.fail_history(true);
        h.git.set_lines(&[change_line(".D", "gone.rs")]);

        let result = h.aggregator.refresh_now().await;
        assert!(matches!(
            result,
            Err(ChangeViewError::TimestampResolutionFailed { count: 1 })
        ));
        assert!(h.aggregator.last_error().is_some());
        // the deletion is still tracked
        assert_eq!(h.aggregator.get_visible_deleted_files().await.len(), 1);
    }

    #[tokio::test]
    async fn test_extension_filter() {
        let h = harness(ViewConfig::default());
        touch(&h, "a.rs");
        touch(&h, "b.TS");
        touch(&h, "Makefile");
        h.git.set_lines(&[
            change_line(".M", "a.rs"),
            change_line(".M", "b.TS"),
            untracked_line("Makefile"),
        ]);

        h.aggregator.set_extension_filter(&[".ts"]);
        h.aggregator.cancel_pending_refresh();
        let hierarchy = h.aggregator.refresh_now().await.unwrap();
        let paths: Vec<String> = hierarchy.leaves().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec!["b.TS"]);

        h.aggregator.set_extension_filter::<&str>(&[]);
        let hierarchy = h.aggregator.refresh_now().await.unwrap();
        assert_eq!(hierarchy.len(), 3);
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_status_reads() {
        let h = harness(ViewConfig::default());
        h.git.set_lines(&[untracked_line("x.rs")]);

        for _ in 0..10 {
            h.aggregator.get_batch_status().await;
        }
        let metrics = h.aggregator.get_cache_metrics();
        assert_eq!(metrics.total, 10);
        assert!(metrics.hit_rate() >= 0.9);
        assert_eq!(h.git.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_debounced_refresh_publishes() {
        let config = ViewConfig {
            debounce_ms: 20,
            ..ViewConfig::default()
        };
        let h = harness(config);
        touch(&h, "a.rs");
        h.git.set_lines(&[change_line(".M", "a.rs")]);
        let mut updates = h.aggregator.subscribe();

        h.aggregator.refresh();
        h.aggregator.refresh();
        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("refresh published")
            .unwrap();

        assert_eq!(updates.borrow().len(), 1);
        assert_eq!(h.git.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_status_keeps_previous_view() {
        let h = harness(ViewConfig::default());
        h.git.set_history("gone.rs", 1_000);
        h.git.set_lines(&[change_line(".D", "gone.rs")]);
        let before = h.aggregator.refresh_now().await.unwrap();
        assert_eq!(before.len(), 1);

        h.git.fail_status(true);
        h.aggregator.invalidate_cache();
        let result = h.aggregator.refresh_now().await;

        assert!(matches!(result, Err(ChangeViewError::ClassificationFailed { .. })));
        assert!(h.aggregator.last_error().is_some());
        assert!(Arc::ptr_eq(&before, &h.aggregator.hierarchy()));
        assert_eq!(h.aggregator.get_visible_deleted_files().await.len(), 1);

        h.git.fail_status(false);
        h.aggregator.invalidate_cache();
        h.aggregator.refresh_now().await.unwrap();
        assert!(h.aggregator.last_error().is_none());
        assert_eq!(h.aggregator.find_by_path("gone.rs").unwrap().sequence_order, Some(1));
    }

    #[tokio::test]
    async fn test_dispose_waits_for_debounced_refresh_in_flight() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let tracker_store = Arc::clone(&store);
        let h = harness_with(
            move |clock| DeletedFileTracker::with_store(tracker_store, "/repo", "repo", clock),
            ViewConfig {
                debounce_ms: 10,
                ..ViewConfig::default()
            },
        );
        h.git.set_history("gone.rs", 5_000);
        h.git.set_history_delay(Duration::from_millis(200));
        h.git.set_lines(&[change_line(".D", "gone.rs")]);

        h.aggregator.refresh();
        tokio::time::timeout(Duration::from_secs(5), async {
            while h.git.history_queries().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("debounced refresh started");
        h.aggregator.dispose().await;

        assert_eq!(h.aggregator.hierarchy().len(), 1);
        let repo_id = store.ensure_repository("/repo", "repo").await.unwrap();
        assert_eq!(store.load(repo_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispose_flushes_deletions() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let tracker_store = Arc::clone(&store);
        let h = harness_with(
            move |clock| DeletedFileTracker::with_store(tracker_store, "/repo", "repo", clock),
            ViewConfig::default(),
        );
        h.git.set_history("gone.rs", 5_000);
        h.git.set_lines(&[change_line(".D", "gone.rs")]);

        h.aggregator.refresh_now().await.unwrap();
        h.aggregator.dispose().await;
        h.aggregator.dispose().await;

        let repo_id = store.ensure_repository("/repo", "repo").await.unwrap();
        let rows = store.load(repo_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_path, "gone.rs");
        assert_eq!(rows[0].sequence_order, 1);

        // no refresh after dispose
        h.aggregator.refresh();
        assert_eq!(h.aggregator.refresh_now().await.unwrap().len(), 1);
    }
}
