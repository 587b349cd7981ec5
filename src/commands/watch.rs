use crate::commands::status::{load_view_config, ViewOptions};
use crate::core::{
    aggregator::ChangeAggregator,
    error::Result,
    hierarchy::ChangeHierarchy,
    output::{print_error, print_info, render_hierarchy},
};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::env;
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;

/// Keep the change view on screen, refreshing on filesystem events until Ctrl-C
pub async fn execute_watch(options: ViewOptions, store: Option<PathBuf>) -> Result<()> {
    let current_dir = env::current_dir()?;
    let config = load_view_config(&options, store)?;
    let aggregator = ChangeAggregator::open(&current_dir, &config)?;
    let root = aggregator.repo_root().to_path_buf();

    let (tx, mut events) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    log::debug!("Watching {}", root.display());

    let mut updates = aggregator.subscribe();
    if let Err(e) = aggregator.refresh_now().await {
        print_error(&e.to_string());
    }
    show(&updates.borrow_and_update());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Some(Ok(event)) => {
                    if event.paths.iter().any(|p| is_relevant(&root, p)) {
                        aggregator.refresh();
                    }
                }
                Some(Err(e)) => log::warn!("Watcher error: {e}"),
                None => break,
            },
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let hierarchy = updates.borrow_and_update().clone();
                show(&hierarchy);
            }
        }
    }

    drop(watcher);
    aggregator.dispose().await;
    Ok(())
}

fn show(hierarchy: &ChangeHierarchy) {
    // clear screen and home the cursor
    print!("\x1B[2J\x1B[H");
    if hierarchy.is_empty() {
        print_info("No changes");
    } else {
        println!("\n{}\n", render_hierarchy(hierarchy));
    }
}

/// Working-tree paths plus the parts of `.git` that change status output
fn is_relevant(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    let mut components = relative.components();
    match components.next() {
        Some(Component::Normal(first)) if first == ".git" => {
            let rest: Vec<_> = components.collect();
            match rest.first() {
                Some(Component::Normal(name)) => {
                    *name == "index" || *name == "HEAD" || *name == "refs"
                }
                _ => false,
            }
        }
        _ => true,
    }
}
