//! Scripted [`GitRunner`] for unit tests.

use crate::core::error::{ChangeViewError, Result};
use crate::core::git::GitRunner;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One porcelain v2 ordinary-change line
pub(crate) fn change_line(code: &str, path: &str) -> String {
    format!("1 {code} N... 100644 100644 100644 1111111 2222222 {path}")
}

pub(crate) fn untracked_line(path: &str) -> String {
    format!("? {path}")
}

#[derive(Default)]
pub(crate) struct FakeGit {
    status: Mutex<String>,
    status_fails: AtomicBool,
    history: Mutex<HashMap<String, i64>>,
    history_fails: AtomicBool,
    history_delay: Mutex<Duration>,
    status_calls: AtomicUsize,
    history_queries: Mutex<Vec<String>>,
}

impl FakeGit {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_lines(lines: &[String]) -> Self {
        let fake = Self::new();
        fake.set_lines(lines);
        fake
    }

    pub(crate) fn set_lines(&self, lines: &[String]) {
        let mut raw = lines.join("\n");
        if !raw.is_empty() {
            raw.push('\n');
        }
        *self.status.lock().unwrap() = raw;
    }

    pub(crate) fn fail_status(&self, fail: bool) {
        self.status_fails.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_history(&self, path: &str, ms: i64) {
        self.history.lock().unwrap().insert(path.to_string(), ms);
    }

    pub(crate) fn fail_history(&self, fail: bool) {
        self.history_fails.store(fail, Ordering::SeqCst);
    }

    /// Make every history query take `delay` before answering
    pub(crate) fn set_history_delay(&self, delay: Duration) {
        *self.history_delay.lock().unwrap() = delay;
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn history_queries(&self) -> Vec<String> {
        self.history_queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitRunner for FakeGit {
    async fn status_porcelain(&self, _root: &Path) -> Result<String> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.status_fails.load(Ordering::SeqCst) {
            return Err(ChangeViewError::git_command_failed(
                "status",
                Some(128),
                "fatal: not a git repository",
            ));
        }
        Ok(self.status.lock().unwrap().clone())
    }

    async fn last_commit_time(&self, _root: &Path, rel_path: &str) -> Result<Option<i64>> {
        self.history_queries
            .lock()
            .unwrap()
            .push(rel_path.to_string());
        let delay = *self.history_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.history_fails.load(Ordering::SeqCst) {
            return Err(ChangeViewError::git_command_timeout("log", 200));
        }
        Ok(self.history.lock().unwrap().get(rel_path).copied())
    }
}
