#![forbid(unsafe_code)]

//! Overlap stacking for per-tab lanes.
//!
//! Within a lane, events closer in time than the overlap threshold must not
//! share a row. Each event gets the lowest level strictly above every
//! still-overlapping predecessor:
//!
//! ```text
//! level(i) = max{ level(j) + 1 : j < i, |t(i) − t(j)| < threshold }   (else 0)
//! ```
//!
//! [`stack_levels_naive`] evaluates that definition directly in O(n²).
//! [`stack_levels`] produces identical output in O(n) amortized: on sorted
//! input the overlapping predecessors of `i` are a contiguous suffix, so the
//! maximum is a sliding-window maximum kept in a monotonic deque.
//!
//! Levels are not a minimal coloring; they mirror the greedy rule above so
//! that a row never moves when later events arrive.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tabscope_core::event::{Event, EventId, TabId, Timestamp};

/// Quadratic reference evaluation of the stacking rule.
///
/// `times` must be ascending.
#[must_use]
pub fn stack_levels_naive(times: &[Timestamp], threshold_ms: u64) -> Vec<u32> {
    let mut levels = Vec::with_capacity(times.len());
    for (i, &t) in times.iter().enumerate() {
        let mut level = 0;
        for j in 0..i {
            if t.abs_diff(times[j]) < threshold_ms {
                level = level.max(levels[j] + 1);
            }
        }
        levels.push(level);
    }
    levels
}

/// Sliding-window evaluation of the stacking rule.
///
/// `times` must be ascending. Agrees with [`stack_levels_naive`] on every
/// input.
#[must_use]
pub fn stack_levels(times: &[Timestamp], threshold_ms: u64) -> Vec<u32> {
    debug_assert!(times.windows(2).all(|w| w[0] <= w[1]), "times must be sorted");
    let mut levels: Vec<u32> = Vec::with_capacity(times.len());
    // Indices with strictly decreasing levels; the front holds the window max.
    let mut active: VecDeque<usize> = VecDeque::new();
    for (i, &t) in times.iter().enumerate() {
        while let Some(&front) = active.front() {
            if t.abs_diff(times[front]) >= threshold_ms {
                active.pop_front();
            } else {
                break;
            }
        }
        let level = active.front().map_or(0, |&front| levels[front] + 1);
        while let Some(&back) = active.back() {
            if levels[back] <= level {
                active.pop_back();
            } else {
                break;
            }
        }
        active.push_back(i);
        levels.push(level);
    }
    levels
}

/// One tab's row group: its events in time order with their stack levels.
#[derive(Debug, Clone)]
pub struct Lane {
    tab_id: TabId,
    events: Vec<Arc<Event>>,
    levels: Vec<u32>,
}

impl Lane {
    /// Sort `events` by `(time, id)` and stack them.
    #[must_use]
    pub fn new(tab_id: TabId, mut events: Vec<Arc<Event>>, threshold_ms: u64) -> Self {
        events.sort_by_key(|event| event.order_key());
        let times: Vec<Timestamp> = events.iter().map(|event| event.timestamp).collect();
        let levels = stack_levels(&times, threshold_ms);
        Self {
            tab_id,
            events,
            levels,
        }
    }

    #[must_use]
    pub const fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Events ascending by `(time, id)`.
    #[must_use]
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    /// Level of each event, parallel to [`events`](Self::events).
    #[must_use]
    pub fn stack_levels(&self) -> &[u32] {
        &self.levels
    }

    /// Level of the first event with `id` in this lane.
    #[must_use]
    pub fn stack_level_of(&self, id: EventId) -> Option<u32> {
        self.events
            .iter()
            .position(|event| event.id == id)
            .map(|i| self.levels[i])
    }

    /// Rows this lane occupies: one more than the highest level, at least 1.
    #[must_use]
    pub fn max_stack_height(&self) -> u32 {
        self.levels.iter().copied().max().map_or(1, |max| max + 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One lane per distinct tab id, ascending by tab id.
#[must_use]
pub fn build_lanes(events: &[Arc<Event>], threshold_ms: u64) -> Vec<Lane> {
    let mut by_tab: BTreeMap<TabId, Vec<Arc<Event>>> = BTreeMap::new();
    for event in events {
        by_tab.entry(event.tab_id).or_default().push(Arc::clone(event));
    }
    by_tab
        .into_iter()
        .map(|(tab_id, events)| Lane::new(tab_id, events, threshold_ms))
        .collect()
}

/// First row of each lane when lanes are drawn top to bottom.
#[must_use]
pub fn row_offsets(lanes: &[Lane]) -> Vec<u32> {
    lanes
        .iter()
        .scan(0u32, |row, lane| {
            let start = *row;
            *row = row.saturating_add(lane.max_stack_height());
            Some(start)
        })
        .collect()
}
