//! Git repository discovery and subprocess queries.
//!
//! Repository discovery goes through `git2`; status and history queries shell
//! out to the `git` binary so the porcelain output matches what users see.
//!
//! # Public API
//! - [`GitRepo`]: Discovered repository with its working directory and label
//! - [`GitRunner`]: Async seam for status and history queries
//! - [`GitCli`]: [`GitRunner`] backed by `tokio::process`

use crate::core::error::{ChangeViewError, Result};
use async_trait::async_trait;
use git2::Repository;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Bound on a single history lookup for a deleted file
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_millis(200);

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => ChangeViewError::NotInGitRepo,
            _ => ChangeViewError::GitRepo(e),
        })?;
        Ok(GitRepo { repo })
    }

    /// Working tree root; bare repositories have nothing to aggregate
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or(ChangeViewError::BareRepository)
    }

    /// Short display name: the working tree's directory name
    pub fn label(&self) -> String {
        self.repo
            .workdir()
            .and_then(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string())
    }
}

/// Queries the change engine needs from version control
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Raw `status --porcelain=v2 --untracked-files=all` output for `root`
    async fn status_porcelain(&self, root: &Path) -> Result<String>;

    /// Unix-millisecond time of the most recent commit touching `rel_path`,
    /// or `None` when the path has no history
    async fn last_commit_time(&self, root: &Path, rel_path: &str) -> Result<Option<i64>>;
}

#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    history_timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
        }
    }

    pub fn with_history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }

    /// Use a specific git executable instead of the one on PATH
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, root: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(root).kill_on_drop(true);
        cmd
    }

    fn check(command: &str, output: Output) -> Result<Output> {
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ChangeViewError::git_command_failed(
            command,
            output.status.code(),
            stderr.trim(),
        ))
    }
}

#[async_trait]
impl GitRunner for GitCli {
    async fn status_porcelain(&self, root: &Path) -> Result<String> {
        let output = self
            .command(root, &["status", "--porcelain=v2", "--untracked-files=all"])
            .output()
            .await?;
        let output = Self::check("status", output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn last_commit_time(&self, root: &Path, rel_path: &str) -> Result<Option<i64>> {
        let query = self
            .command(root, &["log", "-1", "--format=%ct", "--", rel_path])
            .output();
        let output = tokio::time::timeout(self.history_timeout, query)
            .await
            .map_err(|_| {
                ChangeViewError::git_command_timeout("log", self.history_timeout.as_millis() as u64)
            })??;
        let output = Self::check("log", output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let seconds: i64 = trimmed
            .parse()
            .map_err(|_| ChangeViewError::InvalidHistoryOutput {
                output: trimmed.to_string(),
            })?;
        Ok(Some(seconds * 1000))
    }
}
