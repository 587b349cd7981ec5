//! Core of the change aggregation engine.
//!
//! This module provides status parsing and classification, the status cache,
//! the deleted-file order store and tracker, timestamp resolution and the
//! aggregator that turns all of it into a time-bucketed hierarchy.

pub mod aggregator;
pub mod clock;
pub mod colors;
pub mod config;
pub mod debounce;
pub mod deleted_tracker;
pub mod dirs;
pub mod error;
pub mod git;
pub mod git_status;
pub mod hierarchy;
pub mod order_store;
pub mod output;
pub mod state;
pub mod status_cache;
pub mod timestamps;

#[cfg(test)]
pub(crate) mod testing;

// === Error handling ===
pub use error::{ChangeViewError, Result};

// === Git access ===
// Repository discovery plus the subprocess seam used by cache and resolver
pub use git::{GitCli, GitRepo, GitRunner};

// === Status classification ===
pub use git_status::{
    classify, is_modified_after_staging, parse_porcelain_v2, ChangeKind, Classification,
    StatusCode,
};

// === Data model ===
pub use state::{ChangeRecord, DeletedFileRecord, DeletionRow, Repository, StatusMap, StoreStats};

// === Engine components ===
pub use aggregator::ChangeAggregator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ViewConfig;
pub use deleted_tracker::DeletedFileTracker;
pub use hierarchy::{
    ChangeHierarchy, GroupNode, HierarchyMode, HierarchyNode, SortDirection, StatusGroup,
    StatusGroupKind, TimeGroup, TimePeriod,
};
pub use order_store::OrderStore;
pub use status_cache::{CacheMetrics, StatusCache};
pub use timestamps::{ResolvedTimestamps, TimestampRequest, TimestampResolver};

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_success};
