#![forbid(unsafe_code)]

//! Epoch-aligned fixed-size time windows.
//!
//! A window of size `W` milliseconds covers `[k·W, (k+1)·W)` for some integer
//! `k`, its [`WindowId`]. Boundaries are aligned to the Unix epoch, never to
//! the first event, so the same instant always lands in the same window
//! regardless of what else is in the snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::WindowSize;
use crate::event::{Event, Timestamp};
use crate::hierarchy::Hierarchy;

/// Index of a window on the epoch-aligned grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

impl WindowId {
    /// Window containing `t`. Floors toward negative infinity, so pre-epoch
    /// instants get negative ids.
    #[must_use]
    pub const fn containing(t: Timestamp, size: WindowSize) -> Self {
        Self(t.as_millis().div_euclid(size.as_millis_i64()))
    }

    /// Inclusive start of this window.
    #[must_use]
    pub const fn start(self, size: WindowSize) -> Timestamp {
        Timestamp::from_millis(self.0.saturating_mul(size.as_millis_i64()))
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Id of the window containing `t`.
#[must_use]
pub const fn window_id_for(t: Timestamp, size: WindowSize) -> WindowId {
    WindowId::containing(t, size)
}

/// Start of the window containing `t`.
#[must_use]
pub const fn window_start(t: Timestamp, size: WindowSize) -> Timestamp {
    WindowId::containing(t, size).start(size)
}

/// One non-empty window with its events and their reconstructed hierarchy.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    pub id: WindowId,
    /// Inclusive.
    pub start: Timestamp,
    /// Exclusive.
    pub end: Timestamp,
    /// `HH:MM:SS–HH:MM:SS` in UTC.
    pub label: String,
    /// Sorted by `(timestamp, id)`.
    pub events: Vec<Arc<Event>>,
    pub hierarchy: Hierarchy,
}

impl TimeWindow {
    fn new(id: WindowId, size: WindowSize, mut events: Vec<Arc<Event>>) -> Self {
        events.sort_by_key(|event| event.order_key());
        let start = id.start(size);
        let end = start.saturating_add_millis(size.as_millis_i64());
        let hierarchy = Hierarchy::build(&events);
        Self {
            id,
            start,
            end,
            label: format!("{}–{}", start.format_hms(), end.format_hms()),
            events,
            hierarchy,
        }
    }

    /// Number of events in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false` for windows produced by [`partition`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Length of the window in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.start.abs_diff(self.end)
    }

    /// Whether `t` falls inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }
}

/// Split `events` into epoch-aligned windows of `size`.
///
/// Only non-empty windows are returned, ascending by start. Each window owns a
/// hierarchy built from its own events alone, so a parent that fell into an
/// earlier window does not resolve.
///
/// Events taken from a [`Snapshot`](crate::event::Snapshot) lie in the
/// calendar range, where each one is inside its window. Outside it the top
/// window's end saturates at `i64::MAX` and no longer contains that instant.
#[must_use]
pub fn partition(events: &[Arc<Event>], size: WindowSize) -> Vec<TimeWindow> {
    let _span = crate::debug_span!("partition", events = events.len()).entered();
    let mut buckets: BTreeMap<WindowId, Vec<Arc<Event>>> = BTreeMap::new();
    for event in events {
        buckets
            .entry(WindowId::containing(event.timestamp, size))
            .or_default()
            .push(Arc::clone(event));
    }
    let windows: Vec<_> = buckets
        .into_iter()
        .map(|(id, bucket)| TimeWindow::new(id, size, bucket))
        .collect();
    crate::debug!(windows = windows.len(), size_ms = size.as_millis(), "partitioned");
    windows
}
