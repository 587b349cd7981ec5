//! In-memory deleted-file tracker layered over [`OrderStore`].
//!
//! Each path moves through `untracked -> deleted(N) -> hidden(N) -> deleted(N)`.
//! The order `N` is fixed the first time a path is marked deleted and reused
//! on every later deletion, which is what keeps restored-then-deleted files in
//! the same display slot.
//!
//! New rows are queued and written on [`DeletedFileTracker::flush`] or
//! [`DeletedFileTracker::dispose`]. When the store fails the tracker keeps
//! working from memory for the rest of the session.

use crate::core::clock::Clock;
use crate::core::error::Result;
use crate::core::order_store::OrderStore;
use crate::core::state::DeletedFileRecord;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedFile {
    order: u32,
    timestamp: i64,
    visible: bool,
}

pub struct DeletedFileTracker {
    files: HashMap<String, TrackedFile>,
    next_sequence: u32,
    initialized: bool,
    store: Option<Arc<OrderStore>>,
    repo_root: String,
    label: String,
    repository_id: Option<i64>,
    pending: Vec<DeletedFileRecord>,
    clock: Arc<dyn Clock>,
}

impl DeletedFileTracker {
    /// Tracker without persistence
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            files: HashMap::new(),
            next_sequence: 1,
            initialized: false,
            store: None,
            repo_root: String::new(),
            label: String::new(),
            repository_id: None,
            pending: Vec::new(),
            clock,
        }
    }

    /// Tracker for the repository at `repo_root`, persisted in `store`
    pub fn with_store(
        store: Arc<OrderStore>,
        repo_root: impl Into<String>,
        label: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: Some(store),
            repo_root: repo_root.into(),
            label: label.into(),
            ..Self::in_memory(clock)
        }
    }

    /// Load persisted rows once. Store errors downgrade to memory-only mode.
    pub async fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let Some(store) = self.store.clone() else {
            return;
        };
        match self.load_from(&store).await {
            Ok(count) => log::debug!(
                "Loaded {count} deleted files for {}, next order {}",
                self.repo_root,
                self.next_sequence
            ),
            Err(e) => {
                log::warn!(
                    "Deleted-file store unavailable for {}, continuing in memory: {e}",
                    self.repo_root
                );
                self.store = None;
                self.pending.clear();
            }
        }
    }

    async fn load_from(&mut self, store: &OrderStore) -> Result<usize> {
        let repository_id = store.ensure_repository(&self.repo_root, &self.label).await?;
        let records = store.load(repository_id).await?;
        self.repository_id = Some(repository_id);

        for record in &records {
            self.files.insert(
                record.file_path.clone(),
                TrackedFile {
                    order: record.sequence_order,
                    timestamp: record.first_seen_timestamp,
                    visible: true,
                },
            );
        }
        let max_order = self.files.values().map(|f| f.order).max().unwrap_or(0);
        self.next_sequence = self.next_sequence.max(max_order + 1);
        Ok(records.len())
    }

    /// Mark `file_path` deleted and return its permanent order.
    ///
    /// Known files become visible again and keep their order; `timestamp`
    /// only updates the in-memory value.
    pub fn mark_as_deleted(&mut self, file_path: &str, timestamp: Option<i64>) -> u32 {
        if let Some(file) = self.files.get_mut(file_path) {
            file.visible = true;
            if let Some(ts) = timestamp {
                file.timestamp = ts;
            }
            return file.order;
        }

        let order = self.next_sequence;
        self.next_sequence += 1;
        let timestamp = timestamp.unwrap_or_else(|| self.clock.now_ms());
        self.files.insert(
            file_path.to_string(),
            TrackedFile {
                order,
                timestamp,
                visible: true,
            },
        );
        if self.store.is_some() {
            self.pending.push(DeletedFileRecord {
                repository_id: self.repository_id.unwrap_or_default(),
                file_path: file_path.to_string(),
                sequence_order: order,
                first_seen_timestamp: timestamp,
                visible: true,
            });
        }
        log::debug!("Tracking deleted file {file_path} at order {order}");
        order
    }

    /// Hide a restored file without forgetting its order
    pub fn hide_from_view(&mut self, file_path: &str) -> bool {
        match self.files.get_mut(file_path) {
            Some(file) => {
                file.visible = false;
                true
            }
            None => false,
        }
    }

    pub fn has_file(&self, file_path: &str) -> bool {
        self.files.contains_key(file_path)
    }

    pub fn get_order(&self, file_path: &str) -> Option<u32> {
        self.files.get(file_path).map(|f| f.order)
    }

    pub fn get_timestamp(&self, file_path: &str) -> Option<i64> {
        self.files.get(file_path).map(|f| f.timestamp)
    }

    pub fn is_visible(&self, file_path: &str) -> bool {
        self.files.get(file_path).is_some_and(|f| f.visible)
    }

    /// Tracked files including hidden ones
    pub fn get_total_count(&self) -> usize {
        self.files.len()
    }

    pub fn get_visible_deleted_files(&self) -> Vec<DeletedFileRecord> {
        self.records(|file| file.visible)
    }

    pub fn get_all_deleted_files(&self) -> Vec<DeletedFileRecord> {
        self.records(|_| true)
    }

    fn records(&self, keep: impl Fn(&TrackedFile) -> bool) -> Vec<DeletedFileRecord> {
        let repository_id = self.repository_id.unwrap_or_default();
        let mut records: Vec<DeletedFileRecord> = self
            .files
            .iter()
            .filter(|(_, file)| keep(file))
            .map(|(path, file)| DeletedFileRecord {
                repository_id,
                file_path: path.clone(),
                sequence_order: file.order,
                first_seen_timestamp: file.timestamp,
                visible: file.visible,
            })
            .collect();
        records.sort_by_key(|r| r.sequence_order);
        records
    }

    /// True while rows are still being written to a store
    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Write queued rows. Failures are logged and switch to memory-only mode.
    pub async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let Some(store) = self.store.clone() else {
            self.pending.clear();
            return;
        };
        let batch = std::mem::take(&mut self.pending);
        if let Err(e) = self.write_batch(&store, batch).await {
            log::error!(
                "Failed to persist deleted files for {}, continuing in memory: {e}",
                self.repo_root
            );
            self.store = None;
        }
    }

    async fn write_batch(&mut self, store: &OrderStore, batch: Vec<DeletedFileRecord>) -> Result<()> {
        let repository_id = match self.repository_id {
            Some(id) => id,
            None => {
                let id = store.ensure_repository(&self.repo_root, &self.label).await?;
                self.repository_id = Some(id);
                id
            }
        };
        store.save(repository_id, batch).await?;
        Ok(())
    }

    /// Flush queued rows, then let go of the store
    pub async fn dispose(&mut self) {
        self.flush().await;
        self.store = None;
    }

    /// Forget all in-memory state; persisted rows are untouched
    pub fn clear(&mut self) {
        self.files.clear();
        self.pending.clear();
        self.next_sequence = 1;
        self.initialized = false;
    }
}
