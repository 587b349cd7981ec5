//! Predefined repository scenarios

#![allow(dead_code)]

use super::repository::*;
use git_changes::core::error::Result;

/// Three committed files, all modified, plus two untracked ones
pub fn create_multi_file_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;

    create_test_files(&repo.path, &["file1.txt", "file2.txt", "file3.txt"])?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Initial commit")?;

    modify_test_files(&repo.path, &["file1.txt", "file2.txt", "file3.txt"])?;
    create_test_files(&repo.path, &["file4.txt", "file5.txt"])?;

    Ok(repo)
}

/// One staged-only file and one modified-after-staging ("MM") file
pub fn create_staged_and_dual_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;

    create_test_files(&repo.path, &["staged.ts", "dual.ts"])?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Initial commit")?;

    modify_test_files(&repo.path, &["staged.ts", "dual.ts"])?;
    git_add(&repo.path, ".")?;
    create_file(&repo.path, "dual.ts", "changed again after staging\n")?;

    Ok(repo)
}

/// Committed `a.ts` and `b.ts` plus a kept file, all clean.
///
/// History lookups get a generous timeout so slow CI machines still resolve
/// deleted-file times.
pub fn create_deletion_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    create_file(
        &repo.config_home(),
        "git-changes/config.json",
        r#"{ "history_timeout_ms": 5000 }"#,
    )?;

    create_test_files(&repo.path, &["a.ts", "b.ts", "keep.rs"])?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Initial commit")?;

    Ok(repo)
}
