//! Time-bucketed, optionally status-grouped view of one refresh.
//!
//! # Identity contract
//! Leaves are `Arc<ChangeRecord>` and are compared by allocation, never by
//! value. The parent index is keyed the same way, so a consumer that holds a
//! leaf handed out by [`ChangeHierarchy::find_by_path`] can always navigate
//! from it with [`ChangeHierarchy::get_parent`]. Both indexes are built
//! together with the tree and replaced as one value on every refresh.
//!
//! # Shape
//! - flat: `TimeGroup*` at the root
//! - grouped: `StatusGroup(staged) -> TimeGroup*`, `StatusGroup(unstaged) -> TimeGroup*`
//!
//! Empty groups are never emitted.

use crate::core::git_status::Classification;
use crate::core::state::ChangeRecord;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HierarchyMode {
    #[default]
    Flat,
    Grouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    ThisMonth,
    LastMonth,
    Older,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 7] = [
        TimePeriod::Today,
        TimePeriod::Yesterday,
        TimePeriod::Last7Days,
        TimePeriod::Last30Days,
        TimePeriod::ThisMonth,
        TimePeriod::LastMonth,
        TimePeriod::Older,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            TimePeriod::Today => "today",
            TimePeriod::Yesterday => "yesterday",
            TimePeriod::Last7Days => "last7days",
            TimePeriod::Last30Days => "last30days",
            TimePeriod::ThisMonth => "thisMonth",
            TimePeriod::LastMonth => "lastMonth",
            TimePeriod::Older => "older",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimePeriod::Today => "Today",
            TimePeriod::Yesterday => "Yesterday",
            TimePeriod::Last7Days => "Last 7 days",
            TimePeriod::Last30Days => "Last 30 days",
            TimePeriod::ThisMonth => "This month",
            TimePeriod::LastMonth => "Last month",
            TimePeriod::Older => "Older",
        }
    }
}

/// Bucket start times (Unix ms) computed from one "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBoundaries {
    today: i64,
    yesterday: i64,
    last_7_days: i64,
    last_30_days: i64,
    this_month: i64,
    last_month: i64,
}

impl PeriodBoundaries {
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let this_month = today.with_day(1).unwrap_or(today);
        let start = |date: Option<NaiveDate>| local_midnight(&tz, date.unwrap_or(today));

        Self {
            today: local_midnight(&tz, today),
            yesterday: start(today.pred_opt()),
            last_7_days: start(today.checked_sub_days(Days::new(7))),
            last_30_days: start(today.checked_sub_days(Days::new(30))),
            this_month: local_midnight(&tz, this_month),
            last_month: start(this_month.checked_sub_months(Months::new(1))),
        }
    }

    pub fn today_start(&self) -> i64 {
        self.today
    }

    /// Bucket for a timestamp; unknown times are `Older`
    pub fn period_of(&self, timestamp: Option<i64>) -> TimePeriod {
        let Some(ts) = timestamp else {
            return TimePeriod::Older;
        };
        if ts >= self.today {
            TimePeriod::Today
        } else if ts >= self.yesterday {
            TimePeriod::Yesterday
        } else if ts >= self.last_7_days {
            TimePeriod::Last7Days
        } else if ts >= self.last_30_days {
            TimePeriod::Last30Days
        } else if ts >= self.this_month {
            TimePeriod::ThisMonth
        } else if ts >= self.last_month {
            TimePeriod::LastMonth
        } else {
            TimePeriod::Older
        }
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::default());
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.timestamp_millis(),
        // Midnight skipped by a DST jump
        None => naive.and_utc().timestamp_millis(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusGroupKind {
    Staged,
    Unstaged,
}

impl StatusGroupKind {
    pub fn of(record: &ChangeRecord) -> Self {
        // Dual-state ("MM") records classify as unstaged and land only here
        match record.classification {
            Classification::Staged => StatusGroupKind::Staged,
            _ => StatusGroupKind::Unstaged,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusGroupKind::Staged => "Staged Changes",
            StatusGroupKind::Unstaged => "Changes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeGroup {
    pub period: TimePeriod,
    pub status: Option<StatusGroupKind>,
    pub children: Vec<Arc<ChangeRecord>>,
}

#[derive(Debug, Clone)]
pub struct StatusGroup {
    pub kind: StatusGroupKind,
    pub total_count: usize,
    pub children: Vec<TimeGroup>,
}

#[derive(Debug, Clone)]
pub enum GroupNode {
    Status(StatusGroup),
    Time(TimeGroup),
}

/// Navigation handle for one node of the tree
#[derive(Debug, Clone)]
pub enum HierarchyNode {
    Status(StatusGroupKind),
    Time {
        status: Option<StatusGroupKind>,
        period: TimePeriod,
    },
    File(Arc<ChangeRecord>),
}

impl PartialEq for HierarchyNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HierarchyNode::Status(a), HierarchyNode::Status(b)) => a == b,
            (
                HierarchyNode::Time { status, period },
                HierarchyNode::Time {
                    status: other_status,
                    period: other_period,
                },
            ) => status == other_status && period == other_period,
            (HierarchyNode::File(a), HierarchyNode::File(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for HierarchyNode {}

impl TimeGroup {
    fn handle(&self) -> HierarchyNode {
        HierarchyNode::Time {
            status: self.status,
            period: self.period,
        }
    }
}

/// Hash and equality by allocation address
#[derive(Debug, Clone)]
struct RecordKey(Arc<ChangeRecord>);

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RecordKey {}

#[derive(Debug, Clone, Default)]
pub struct ChangeHierarchy {
    roots: Vec<GroupNode>,
    parents: HashMap<RecordKey, HierarchyNode>,
    by_path: HashMap<String, Arc<ChangeRecord>>,
    mode: HierarchyMode,
}

impl ChangeHierarchy {
    pub fn empty(mode: HierarchyMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Sort and bucket `records`, then index every leaf
    pub fn build(
        mut records: Vec<Arc<ChangeRecord>>,
        mode: HierarchyMode,
        direction: SortDirection,
        bounds: &PeriodBoundaries,
    ) -> Self {
        sort_records(&mut records, direction);

        let roots = match mode {
            HierarchyMode::Flat => bucket(&records, None, direction, bounds)
                .into_iter()
                .map(GroupNode::Time)
                .collect(),
            HierarchyMode::Grouped => [StatusGroupKind::Staged, StatusGroupKind::Unstaged]
                .into_iter()
                .filter_map(|kind| {
                    let members: Vec<Arc<ChangeRecord>> = records
                        .iter()
                        .filter(|r| StatusGroupKind::of(r) == kind)
                        .cloned()
                        .collect();
                    if members.is_empty() {
                        return None;
                    }
                    Some(GroupNode::Status(StatusGroup {
                        kind,
                        total_count: members.len(),
                        children: bucket(&members, Some(kind), direction, bounds),
                    }))
                })
                .collect(),
        };

        let mut hierarchy = Self {
            roots,
            parents: HashMap::new(),
            by_path: HashMap::new(),
            mode,
        };
        hierarchy.index();
        hierarchy
    }

    fn index(&mut self) {
        let mut parents = HashMap::new();
        let mut by_path = HashMap::new();
        for group in self.time_groups() {
            for leaf in &group.children {
                parents.insert(RecordKey(Arc::clone(leaf)), group.handle());
                by_path.insert(leaf.path.clone(), Arc::clone(leaf));
            }
        }
        self.parents = parents;
        self.by_path = by_path;
    }

    fn time_groups(&self) -> impl Iterator<Item = &TimeGroup> {
        self.roots.iter().flat_map(|node| match node {
            GroupNode::Time(group) => std::slice::from_ref(group).iter(),
            GroupNode::Status(status) => status.children.iter(),
        })
    }

    fn time_group(&self, status: Option<StatusGroupKind>, period: TimePeriod) -> Option<&TimeGroup> {
        self.time_groups()
            .find(|g| g.status == status && g.period == period)
    }

    pub fn mode(&self) -> HierarchyMode {
        self.mode
    }

    pub fn roots(&self) -> &[GroupNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    /// The exact leaf object for `path` from this build
    pub fn find_by_path(&self, path: &str) -> Option<Arc<ChangeRecord>> {
        self.by_path.get(path).cloned()
    }

    /// Children of `node`; `None` asks for the roots
    pub fn get_children(&self, node: Option<&HierarchyNode>) -> Vec<HierarchyNode> {
        match node {
            None => self
                .roots
                .iter()
                .map(|root| match root {
                    GroupNode::Status(group) => HierarchyNode::Status(group.kind),
                    GroupNode::Time(group) => group.handle(),
                })
                .collect(),
            Some(HierarchyNode::Status(kind)) => self
                .roots
                .iter()
                .find_map(|root| match root {
                    GroupNode::Status(group) if group.kind == *kind => {
                        Some(group.children.iter().map(TimeGroup::handle).collect())
                    }
                    _ => None,
                })
                .unwrap_or_default(),
            Some(HierarchyNode::Time { status, period }) => self
                .time_group(*status, *period)
                .map(|group| {
                    group
                        .children
                        .iter()
                        .map(|leaf| HierarchyNode::File(Arc::clone(leaf)))
                        .collect()
                })
                .unwrap_or_default(),
            Some(HierarchyNode::File(_)) => Vec::new(),
        }
    }

    /// Immediate container of `node`; roots and unknown leaves have none
    pub fn get_parent(&self, node: &HierarchyNode) -> Option<HierarchyNode> {
        match node {
            HierarchyNode::File(record) => self.parents.get(&RecordKey(Arc::clone(record))).cloned(),
            HierarchyNode::Time {
                status: Some(kind), ..
            } => Some(HierarchyNode::Status(*kind)),
            HierarchyNode::Time { status: None, .. } | HierarchyNode::Status(_) => None,
        }
    }

    /// Every leaf in display order
    pub fn leaves(&self) -> Vec<Arc<ChangeRecord>> {
        self.time_groups()
            .flat_map(|group| group.children.iter().cloned())
            .collect()
    }
}

fn compare_time(a: &ChangeRecord, b: &ChangeRecord, direction: SortDirection) -> Ordering {
    let by_time = match direction {
        SortDirection::NewestFirst => b.timestamp.cmp(&a.timestamp),
        SortDirection::OldestFirst => a.timestamp.cmp(&b.timestamp),
    };
    by_time.then_with(|| a.path.cmp(&b.path))
}

fn sort_records(records: &mut [Arc<ChangeRecord>], direction: SortDirection) {
    records.sort_by(|a, b| compare_time(a, b, direction));
}

/// Split already-sorted records into non-empty period buckets
fn bucket(
    records: &[Arc<ChangeRecord>],
    status: Option<StatusGroupKind>,
    direction: SortDirection,
    bounds: &PeriodBoundaries,
) -> Vec<TimeGroup> {
    let mut groups: Vec<TimeGroup> = TimePeriod::ALL
        .iter()
        .map(|&period| TimeGroup {
            period,
            status,
            children: Vec::new(),
        })
        .collect();
    for record in records {
        let slot = bounds.period_of(record.timestamp) as usize;
        groups[slot].children.push(Arc::clone(record));
    }

    // Old deletions keep their first-seen order instead of jumping around
    if let Some(older) = groups.iter_mut().find(|g| g.period == TimePeriod::Older) {
        older.children.sort_by(|a, b| match (a.is_deleted(), b.is_deleted()) {
            (false, false) => compare_time(a, b, direction),
            (true, true) => a
                .sequence_order
                .unwrap_or(u32::MAX)
                .cmp(&b.sequence_order.unwrap_or(u32::MAX))
                .then_with(|| a.path.cmp(&b.path)),
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
        });
    }

    groups.retain(|g| !g.children.is_empty());
    groups
}
