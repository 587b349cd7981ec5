use crate::commands::deleted::open_store;
use crate::core::{
    error::Result,
    order_store::OrderStore,
    output::{format_timestamp, print_section_header, print_success},
    state::{Repository, StoreStats},
};
use colored::*;
use std::path::PathBuf;

#[derive(clap::Subcommand, Debug, Clone)]
pub enum StoreAction {
    /// Row counts, time span and size
    Stats,
    /// Repositories that have recorded deletions
    Repos,
    /// Write a consistent snapshot of the store to a file
    Backup { file: PathBuf },
    /// Reclaim unused space
    Compact,
}

pub async fn execute_store(action: StoreAction, store: Option<PathBuf>) -> Result<()> {
    let store = open_store(store)?;
    let result = run(&store, &action).await;
    store.close().await?;
    result
}

async fn run(store: &OrderStore, action: &StoreAction) -> Result<()> {
    match action {
        StoreAction::Stats => {
            let stats = store.get_stats().await?;
            print_section_header("Deleted-file store");
            for line in format_stats(&stats) {
                println!("{line}");
            }
            println!();
        }
        StoreAction::Repos => {
            let repos = store.list_repositories().await?;
            if repos.is_empty() {
                println!("No repositories recorded");
                return Ok(());
            }
            print_section_header("Repositories");
            for repo in &repos {
                println!("{}", format_repository(repo));
            }
            println!();
        }
        StoreAction::Backup { file } => {
            store.backup_to(file).await?;
            print_success(&format!("Backup written to {}", file.display()));
        }
        StoreAction::Compact => {
            store.compact().await?;
            print_success("Store compacted");
        }
    }
    Ok(())
}

fn format_stats(stats: &StoreStats) -> Vec<String> {
    let span = |ts: Option<i64>| ts.map(format_timestamp).unwrap_or_else(|| "-".to_string());
    vec![
        format!("  {:<14}{}", "Repositories".bright_black(), stats.total_repositories),
        format!("  {:<14}{}", "Deletions".bright_black(), stats.total_deletions),
        format!("  {:<14}{}", "Oldest".bright_black(), span(stats.oldest_deletion)),
        format!("  {:<14}{}", "Newest".bright_black(), span(stats.newest_deletion)),
        format!("  {:<14}{} bytes", "Size".bright_black(), stats.database_size_bytes),
    ]
}

fn format_repository(repo: &Repository) -> String {
    format!(
        "  {:>3}  {:<16}{}",
        repo.id,
        repo.label.as_str().bold(),
        repo.root_path.as_str().bright_black()
    )
}
