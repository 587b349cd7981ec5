//! Git repository management and setup utilities
//!
//! Provides functions for creating test repositories driven by the real
//! `git` binary, plus an isolated environment for running the CLI.

#![allow(dead_code)]

use git_changes::core::error::{ChangeViewError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test repository setup result. The TempDir must be kept alive for the
/// duration of the test to prevent cleanup.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub path: PathBuf,
    /// Private home for config and the deleted-file store
    pub home: TempDir,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store_path(&self) -> PathBuf {
        self.home.path().join("deleted-files.db")
    }

    pub fn config_home(&self) -> PathBuf {
        self.home.path().join("config")
    }

    /// `git-changes` command rooted in this repository with isolated
    /// config, store and colors turned off
    pub fn command(&self) -> Result<std::process::Command> {
        use assert_cmd::prelude::*;

        let mut cmd = std::process::Command::cargo_bin("git-changes")
            .map_err(|e| {
                ChangeViewError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    e.to_string(),
                ))
            })?;
        cmd.current_dir(&self.path)
            .env("XDG_CONFIG_HOME", self.config_home())
            .env("XDG_DATA_HOME", self.home.path().join("data"))
            .env("NO_COLOR", "1")
            .arg("--store")
            .arg(self.store_path());
        Ok(cmd)
    }
}

fn git(repo_path: &Path, args: &[&str]) -> Result<()> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .map_err(ChangeViewError::Io)?;
    if !output.status.success() {
        return Err(ChangeViewError::git_command_failed(
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr),
        ));
    }
    Ok(())
}

/// Sets up a fresh git repository for testing
///
/// Creates a temporary directory, initializes it as a git repository,
/// and sets up basic git configuration to avoid user prompts.
pub fn setup_test_repo() -> Result<TestRepo> {
    let temp_dir = TempDir::new().map_err(ChangeViewError::Io)?;
    let home = TempDir::new().map_err(ChangeViewError::Io)?;
    let repo_path = temp_dir.path().to_path_buf();

    git(&repo_path, &["init", "-q"])?;
    git(&repo_path, &["config", "user.name", "Test User"])?;
    git(&repo_path, &["config", "user.email", "test@example.com"])?;
    git(&repo_path, &["config", "commit.gpgsign", "false"])?;

    Ok(TestRepo {
        temp_dir,
        path: repo_path,
        home,
    })
}

/// Sets up a git repository with an initial commit containing "initial.txt"
pub fn setup_test_repo_with_initial_commit() -> Result<TestRepo> {
    let repo = setup_test_repo()?;

    create_file(&repo.path, "initial.txt", "initial content\n")?;
    git_add(&repo.path, "initial.txt")?;
    git_commit(&repo.path, "Initial commit")?;

    Ok(repo)
}

/// Creates a file with specified content, including parent directories
pub fn create_file(repo_path: &Path, filename: &str, content: &str) -> Result<()> {
    let path = repo_path.join(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ChangeViewError::Io)?;
    }
    fs::write(path, content).map_err(ChangeViewError::Io)?;
    Ok(())
}

/// Adds a file to the git index ("." for all files)
pub fn git_add(repo_path: &Path, filename: &str) -> Result<()> {
    git(repo_path, &["add", filename])
}

pub fn git_commit(repo_path: &Path, message: &str) -> Result<()> {
    git(repo_path, &["commit", "-q", "-m", message])
}

/// Restores a deleted or modified file from HEAD
pub fn git_restore(repo_path: &Path, filename: &str) -> Result<()> {
    git(repo_path, &["checkout", "--", filename])
}

/// Removes a file from the filesystem (not from git)
pub fn remove_file(repo_path: &Path, filename: &str) -> Result<()> {
    fs::remove_file(repo_path.join(filename)).map_err(ChangeViewError::Io)?;
    Ok(())
}

/// Creates multiple test files with sequential content
pub fn create_test_files(repo_path: &Path, filenames: &[&str]) -> Result<()> {
    for (i, filename) in filenames.iter().enumerate() {
        let content = format!("content{}\nline 2\n", i + 1);
        create_file(repo_path, filename, &content)?;
    }
    Ok(())
}

/// Modifies multiple test files with new content
pub fn modify_test_files(repo_path: &Path, filenames: &[&str]) -> Result<()> {
    for (i, filename) in filenames.iter().enumerate() {
        let content = format!("modified{}\nline 2\nnew line\n", i + 1);
        create_file(repo_path, filename, &content)?;
    }
    Ok(())
}
