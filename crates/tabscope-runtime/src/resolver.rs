#![forbid(unsafe_code)]

//! Nearest-event queries against a set of lanes.
//!
//! Lanes keep their events sorted by `(time, id)`, so every query is a pair of
//! binary searches per lane: O(L · log n) for the lookup plus the size of the
//! answer.
//!
//! Two query shapes:
//!
//! - [`all_within`]: every event with `|t − cursor| ≤ tolerance`, ordered by
//!   `(time, id)`.
//! - [`nearest_per_lane`]: at most one event per lane, the one minimizing
//!   `|t − cursor|` within tolerance. Ties go to the earlier event, then to the
//!   lower id. Ordered by tab id.

use std::sync::Arc;

use serde::Serialize;
use tabscope_core::event::{Event, TabId, Timestamp};
use tabscope_layout::stacking::Lane;

/// One event matched by a cursor query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    pub event: Arc<Event>,
    pub tab_id: TabId,
    pub distance_ms: u64,
    pub stack_level: u32,
}

impl Hit {
    fn at(lane: &Lane, index: usize, cursor: Timestamp) -> Self {
        let event = Arc::clone(&lane.events()[index]);
        Self {
            tab_id: lane.tab_id(),
            distance_ms: event.timestamp.abs_diff(cursor),
            stack_level: lane.stack_levels()[index],
            event,
        }
    }
}

/// Which query a [`Resolver`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    AllWithin,
    #[default]
    NearestPerLane,
}

/// Source of cursor query results.
pub trait CursorQuery {
    /// Events under `cursor`, in the order the implementation defines.
    fn query(&self, cursor: Timestamp) -> Vec<Hit>;
}

/// Lanes plus tolerance plus mode, ready to answer cursor queries.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    lanes: &'a [Lane],
    tolerance_ms: u64,
    mode: QueryMode,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub const fn new(lanes: &'a [Lane], tolerance_ms: u64, mode: QueryMode) -> Self {
        Self {
            lanes,
            tolerance_ms,
            mode,
        }
    }

    #[must_use]
    pub const fn tolerance_ms(&self) -> u64 {
        self.tolerance_ms
    }

    #[must_use]
    pub const fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Same lanes and tolerance, different mode.
    #[must_use]
    pub const fn with_mode(self, mode: QueryMode) -> Self {
        Self { mode, ..self }
    }
}

impl CursorQuery for Resolver<'_> {
    fn query(&self, cursor: Timestamp) -> Vec<Hit> {
        let hits = match self.mode {
            QueryMode::AllWithin => all_within(self.lanes, cursor, self.tolerance_ms),
            QueryMode::NearestPerLane => nearest_per_lane(self.lanes, cursor, self.tolerance_ms),
        };
        tracing::trace!(
            cursor_ms = cursor.as_millis(),
            tolerance_ms = self.tolerance_ms,
            hits = hits.len(),
            "cursor query"
        );
        hits
    }
}

fn tolerance_delta(tolerance_ms: u64) -> i64 {
    i64::try_from(tolerance_ms).unwrap_or(i64::MAX)
}

/// Index range of `lane` whose timestamps fall in `[lo, hi]`.
fn band(lane: &Lane, lo: Timestamp, hi: Timestamp) -> std::ops::Range<usize> {
    let events = lane.events();
    let start = events.partition_point(|e| e.timestamp < lo);
    let end = events.partition_point(|e| e.timestamp <= hi);
    start..end.max(start)
}

/// Every event within `tolerance_ms` of `cursor`, ordered by `(time, id)`.
#[must_use]
pub fn all_within(lanes: &[Lane], cursor: Timestamp, tolerance_ms: u64) -> Vec<Hit> {
    let delta = tolerance_delta(tolerance_ms);
    let lo = cursor.saturating_add_millis(delta.saturating_neg());
    let hi = cursor.saturating_add_millis(delta);
    let mut hits: Vec<Hit> = lanes
        .iter()
        .flat_map(|lane| band(lane, lo, hi).map(move |i| Hit::at(lane, i, cursor)))
        .collect();
    hits.sort_by_key(|hit| (hit.event.timestamp, hit.event.id, hit.tab_id));
    hits
}

/// Closest event of one lane within tolerance, earlier event on ties.
fn nearest_in_lane(lane: &Lane, cursor: Timestamp, tolerance_ms: u64) -> Option<Hit> {
    let events = lane.events();
    let split = events.partition_point(|e| e.timestamp < cursor);

    // First event of the run sharing the latest timestamp before the cursor.
    let before = split.checked_sub(1).map(|last| {
        let t = events[last].timestamp;
        events[..last].partition_point(|e| e.timestamp < t)
    });
    // First event at or after the cursor; sorted by id within its timestamp.
    let after = (split < events.len()).then_some(split);

    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if events[b].timestamp.abs_diff(cursor) <= events[a].timestamp.abs_diff(cursor) {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };
    (events[best].timestamp.abs_diff(cursor) <= tolerance_ms).then(|| Hit::at(lane, best, cursor))
}

/// The closest event of each lane within tolerance, ordered by tab id.
#[must_use]
pub fn nearest_per_lane(lanes: &[Lane], cursor: Timestamp, tolerance_ms: u64) -> Vec<Hit> {
    let mut hits: Vec<Hit> = lanes
        .iter()
        .filter_map(|lane| nearest_in_lane(lane, cursor, tolerance_ms))
        .collect();
    hits.sort_by_key(|hit| hit.tab_id);
    hits
}
