use crate::core::{
    aggregator::ChangeAggregator,
    config::ViewConfig,
    error::Result,
    hierarchy::{HierarchyMode, SortDirection},
    output::{print_info, render_hierarchy},
};
use std::env;
use std::path::PathBuf;

/// View flags shared by `status` and `watch`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ViewOptions {
    /// Split staged and unstaged changes into separate groups
    #[arg(long)]
    pub grouped: bool,

    /// Show the oldest changes first
    #[arg(long)]
    pub oldest_first: bool,

    /// Only show these extensions (e.g. "rs,ts")
    #[arg(long, value_delimiter = ',')]
    pub ext: Vec<String>,
}

impl ViewOptions {
    /// Overlay command-line flags on the loaded config
    pub fn apply(&self, config: &mut ViewConfig) {
        if self.grouped {
            config.hierarchy_mode = HierarchyMode::Grouped;
        }
        if self.oldest_first {
            config.sort_direction = SortDirection::OldestFirst;
        }
        if !self.ext.is_empty() {
            config.extension_filter = self.ext.clone();
        }
    }
}

/// User config with `--store` and view flags applied
pub fn load_view_config(options: &ViewOptions, store: Option<PathBuf>) -> Result<ViewConfig> {
    let mut config = ViewConfig::load_or_default()?;
    options.apply(&mut config);
    if store.is_some() {
        config.store_path = store;
    }
    log::debug!("Using view config {config:?}");
    Ok(config)
}

pub async fn execute_status(options: ViewOptions, store: Option<PathBuf>) -> Result<()> {
    let current_dir = env::current_dir()?;
    let config = load_view_config(&options, store)?;
    let aggregator = ChangeAggregator::open(&current_dir, &config)?;

    let result = aggregator.refresh_now().await;
    aggregator.dispose().await;
    let hierarchy = result?;

    if hierarchy.is_empty() {
        print_info("No changes");
        return Ok(());
    }
    println!("\n{}\n", render_hierarchy(&hierarchy));
    Ok(())
}
