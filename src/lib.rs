//! git-changes - a time-ordered view of the working-tree changes of a Git repository.
//!
//! The library groups changed files into recency buckets ("today",
//! "yesterday", ...) and optionally into staged and unstaged partitions,
//! keeping deleted files in a stable position across restore and re-delete
//! cycles through a small persistent store.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module:
//! - [`ChangeAggregator`]: debounced refresh pipeline and hierarchy lookups
//! - [`StatusCache`] and [`parse_porcelain_v2`]: status queries and parsing
//! - [`OrderStore`] and [`DeletedFileTracker`]: write-once deletion ordering
//! - [`TimestampResolver`]: last-change times with fallbacks
//! - Error handling and result types

pub mod commands;
pub mod core;

pub use core::{
    // Status parsing and classification
    classify,
    is_modified_after_staging,
    parse_porcelain_v2,

    CacheMetrics,
    // Aggregation
    ChangeAggregator,
    ChangeHierarchy,
    ChangeKind,
    ChangeRecord,
    // Error handling
    ChangeViewError,
    Classification,
    DeletedFileRecord,
    // Deleted-file ordering
    DeletedFileTracker,
    GitRepo,
    HierarchyMode,
    HierarchyNode,
    OrderStore,
    Result,
    SortDirection,
    StatusCache,
    StatusCode,
    StatusMap,
    TimePeriod,
    TimestampResolver,
    ViewConfig,
};
