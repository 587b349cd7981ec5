use crate::core::{
    error::Result,
    order_store::{default_store_path, OrderStore},
    output::{format_timestamp, print_info, print_section_header},
    state::DeletionRow,
};
use colored::*;
use std::path::PathBuf;

#[derive(clap::Subcommand, Debug, Clone)]
pub enum DeletedQuery {
    /// Most recently first-seen deletions across all repositories
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Deletions first seen between two Unix-ms timestamps
    Range {
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
    },
    /// Deletions in repositories whose root starts with a prefix
    Repo { prefix: String },
}

/// `--store` when given, otherwise the default data-directory store
pub fn open_store(store: Option<PathBuf>) -> Result<OrderStore> {
    let path = match store {
        Some(path) => path,
        None => default_store_path()?,
    };
    log::debug!("Opening deleted-file store at {}", path.display());
    OrderStore::open(path)
}

pub async fn execute_deleted(query: DeletedQuery, store: Option<PathBuf>) -> Result<()> {
    let store = open_store(store)?;
    let rows = match &query {
        DeletedQuery::Recent { limit } => store.query_recent(*limit).await,
        DeletedQuery::Range { from, to } => store.query_by_time_range(*from, *to).await,
        DeletedQuery::Repo { prefix } => store.query_by_repository(prefix).await,
    };
    store.close().await?;
    let rows = rows?;

    if rows.is_empty() {
        print_info("No deleted files recorded");
        return Ok(());
    }
    print_section_header("Deleted files");
    for row in &rows {
        println!("{}", format_row(row));
    }
    println!();
    Ok(())
}

fn format_row(row: &DeletionRow) -> String {
    format!(
        "  {}  {}  {}  {}",
        format!("#{}", row.sequence_order).as_str().bright_black(),
        row.file_path.as_str().red(),
        format_timestamp(row.first_seen_timestamp).as_str().bright_black(),
        row.label.as_str().blue()
    )
}
