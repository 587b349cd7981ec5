//! Durable ordering store for deleted files, backed by SQLite.
//!
//! Rows are write-once: the first `(repository, path)` row is authoritative and
//! later saves for the same key are ignored (`INSERT OR IGNORE`). That keeps a
//! deleted file's display position stable across restarts and across many
//! delete/restore cycles. A file's first-seen time is therefore permanent even
//! if it is deleted again much later.
//!
//! All statements run on the blocking pool behind one connection mutex, which
//! also serializes concurrent writers.

use crate::core::dirs::get_data_directory;
use crate::core::error::{ChangeViewError, Result};
use crate::core::state::{DeletedFileRecord, DeletionRow, Repository, StoreStats};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const STORE_FILE_NAME: &str = "deleted-files.db";

pub struct OrderStore {
    conn: Arc<Mutex<Option<Connection>>>,
    path: Option<PathBuf>,
}

impl OrderStore {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ChangeViewError::store_directory_creation_failed(parent, e))?;
        }
        let conn = Connection::open(path)?;
        configure_connection(&conn)?;
        init_schema(&conn)?;
        log::debug!("Opened deleted-file store at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open the store in the platform data directory
    pub fn open_default() -> Result<Self> {
        Self::open(default_store_path()?)
    }

    /// Store that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.conn
            .lock()
            .map(|guard| guard.is_none())
            .unwrap_or(true)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let conn = guard.as_mut().ok_or(ChangeViewError::StoreClosed)?;
            f(conn)
        })
        .await?
    }

    /// Id for `root_path`, registering it on first use
    pub async fn ensure_repository(&self, root_path: &str, label: &str) -> Result<i64> {
        let root_path = root_path.to_string();
        let label = label.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO repositories (root_path, label, created_at)
                 VALUES (?1, ?2, ?3)",
                params![root_path, label, chrono::Utc::now().timestamp_millis()],
            )?;
            let id = conn.query_row(
                "SELECT id FROM repositories WHERE root_path = ?1",
                params![root_path],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
    }

    /// Every registered repository, by root path
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, root_path, label FROM repositories ORDER BY root_path ASC")?;
            let repos = stmt
                .query_map([], |row| {
                    Ok(Repository {
                        id: row.get(0)?,
                        root_path: row.get(1)?,
                        label: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(repos)
        })
        .await
    }

    /// Insert rows that do not exist yet; returns how many were new.
    ///
    /// An incoming record for a known path is discarded whole, whatever its
    /// fields say. `visible` is never persisted.
    pub async fn save(&self, repository_id: i64, records: Vec<DeletedFileRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO deleted_files
                        (repository_id, file_path, sequence_order, first_seen_ts)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for record in &records {
                    inserted += stmt.execute(params![
                        repository_id,
                        record.file_path,
                        record.sequence_order,
                        record.first_seen_timestamp
                    ])?;
                }
            }
            tx.commit()?;
            log::debug!(
                "Saved {inserted} of {} deleted-file rows for repository {repository_id}",
                records.len()
            );
            Ok(inserted)
        })
        .await
    }

    /// Every row of one repository in sequence order, all marked visible
    pub async fn load(&self, repository_id: i64) -> Result<Vec<DeletedFileRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT file_path, sequence_order, first_seen_ts
                 FROM deleted_files
                 WHERE repository_id = ?1
                 ORDER BY sequence_order ASC",
            )?;
            let records = stmt
                .query_map(params![repository_id], |row| {
                    Ok(DeletedFileRecord {
                        repository_id,
                        file_path: row.get(0)?,
                        sequence_order: row.get(1)?,
                        first_seen_timestamp: row.get(2)?,
                        visible: true,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    /// Deletions in every repository whose root starts with `root_prefix`
    pub async fn query_by_repository(&self, root_prefix: &str) -> Result<Vec<DeletionRow>> {
        let prefix = root_prefix.to_string();
        self.query_rows(
            "WHERE substr(r.root_path, 1, length(?1)) = ?1
             ORDER BY r.root_path ASC, d.sequence_order ASC",
            vec![rusqlite::types::Value::Text(prefix)],
        )
        .await
    }

    /// Deletions first seen within `[from_ms, to_ms]`, newest first
    pub async fn query_by_time_range(&self, from_ms: i64, to_ms: i64) -> Result<Vec<DeletionRow>> {
        self.query_rows(
            "WHERE d.first_seen_ts BETWEEN ?1 AND ?2
             ORDER BY d.first_seen_ts DESC, d.id DESC",
            vec![from_ms.into(), to_ms.into()],
        )
        .await
    }

    /// The `limit` most recently first-seen deletions across all repositories
    pub async fn query_recent(&self, limit: usize) -> Result<Vec<DeletionRow>> {
        self.query_rows(
            "ORDER BY d.first_seen_ts DESC, d.id DESC LIMIT ?1",
            vec![i64::try_from(limit).unwrap_or(i64::MAX).into()],
        )
        .await
    }

    async fn query_rows(
        &self,
        clause: &'static str,
        args: Vec<rusqlite::types::Value>,
    ) -> Result<Vec<DeletionRow>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT r.root_path, r.label, d.file_path, d.sequence_order, d.first_seen_ts
                 FROM deleted_files d
                 JOIN repositories r ON r.id = d.repository_id
                 {clause}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(args), |row| {
                    Ok(DeletionRow {
                        root_path: row.get(0)?,
                        label: row.get(1)?,
                        file_path: row.get(2)?,
                        sequence_order: row.get(3)?,
                        first_seen_timestamp: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    /// Consistent snapshot of the whole database as SQLite file bytes
    pub async fn backup(&self) -> Result<Vec<u8>> {
        self.with_conn(|conn| {
            let dir = tempfile::tempdir()?;
            let target = dir.path().join("snapshot.db");
            conn.execute(
                "VACUUM INTO ?1",
                params![target.to_string_lossy().into_owned()],
            )?;
            Ok(fs::read(&target)?)
        })
        .await
    }

    /// Write a snapshot to `dest`, replacing any existing file
    pub async fn backup_to(&self, dest: &Path) -> Result<()> {
        let bytes = self.backup().await?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }

    /// Rebuild the database file to reclaim free pages
    pub async fn compact(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("VACUUM;")?;
            Ok(())
        })
        .await
    }

    pub async fn get_stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| {
            let total_repositories: i64 =
                conn.query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))?;
            let (total_deletions, oldest_deletion, newest_deletion): (i64, Option<i64>, Option<i64>) =
                conn.query_row(
                    "SELECT COUNT(*), MIN(first_seen_ts), MAX(first_seen_ts) FROM deleted_files",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;
            let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
            Ok(StoreStats {
                total_repositories: total_repositories as u64,
                total_deletions: total_deletions as u64,
                oldest_deletion,
                newest_deletion,
                database_size_bytes: (page_count * page_size) as u64,
            })
        })
        .await
    }

    /// Release the connection. Later calls are no-ops.
    pub async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = conn
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            match taken {
                Some(conn) => conn.close().map_err(|(_, e)| ChangeViewError::Store(e)),
                None => Ok(()),
            }
        })
        .await?
    }
}

/// `<data dir>/git-changes/deleted-files.db`
pub fn default_store_path() -> Result<PathBuf> {
    Ok(get_data_directory()?.join(STORE_FILE_NAME))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA busy_timeout=2500;",
    )?;
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS repositories (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            root_path  TEXT    NOT NULL UNIQUE,
            label      TEXT    NOT NULL,
            created_at INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS deleted_files (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            repository_id  INTEGER NOT NULL REFERENCES repositories(id),
            file_path      TEXT    NOT NULL,
            sequence_order INTEGER NOT NULL,
            first_seen_ts  INTEGER NOT NULL,
            UNIQUE (repository_id, file_path)
         );
         CREATE INDEX IF NOT EXISTS idx_deleted_files_order
             ON deleted_files(repository_id, sequence_order);
         CREATE INDEX IF NOT EXISTS idx_deleted_files_seen
             ON deleted_files(first_seen_ts);",
    )?;
    Ok(())
}
