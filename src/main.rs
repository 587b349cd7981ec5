use clap::{Parser, Subcommand};
use git_changes::commands::*;
use git_changes::core::{error::Result, output::describe_error, print_error};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-changes")]
#[command(about = "Working-tree changes of a Git repository, ordered by time")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Deleted-file store to use instead of the default one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show changed files grouped by recency
    Status {
        #[command(flatten)]
        view: ViewOptions,
    },
    /// Keep the change view up to date as files change
    Watch {
        #[command(flatten)]
        view: ViewOptions,
    },
    /// Query the deleted-file history
    Deleted {
        #[command(subcommand)]
        query: DeletedQuery,
    },
    /// Maintain the deleted-file store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let result = match cli.command {
        Commands::Status { view } => execute_status(view, cli.store).await,
        Commands::Watch { view } => execute_watch(view, cli.store).await,
        Commands::Deleted { query } => execute_deleted(query, cli.store).await,
        Commands::Store { action } => execute_store(action, cli.store).await,
    };

    if let Err(e) = result {
        log::debug!("{e:?}");
        print_error(&describe_error(&e));
        std::process::exit(1);
    }

    Ok(())
}
