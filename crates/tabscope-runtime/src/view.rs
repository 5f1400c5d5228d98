#![forbid(unsafe_code)]

//! Everything derived from one snapshot under one windowing/stacking setup.

use tabscope_core::config::{EngineConfig, WindowSize};
use tabscope_core::event::{Snapshot, SnapshotFingerprint, Timestamp};
use tabscope_core::hierarchy::Hierarchy;
use tabscope_core::window::{TimeWindow, partition};
use tabscope_layout::axis::TimeAxis;
use tabscope_layout::stacking::{Lane, build_lanes};

use crate::resolver::{QueryMode, Resolver};
use crate::stats::{HierarchyStats, WindowStats};

/// Windows, whole-snapshot hierarchy, lanes, and statistics for one snapshot.
///
/// Depends only on the snapshot, the window size, and the overlap threshold;
/// tolerance, zoom, and axis padding are applied at query time.
#[derive(Debug, Clone)]
pub struct TimelineView {
    pub fingerprint: SnapshotFingerprint,
    pub window_size: WindowSize,
    pub overlap_threshold_ms: u64,
    pub windows: Vec<TimeWindow>,
    pub hierarchy: Hierarchy,
    pub lanes: Vec<Lane>,
    pub hierarchy_stats: HierarchyStats,
    pub window_stats: WindowStats,
    /// Earliest and latest event time.
    pub time_bounds: Option<(Timestamp, Timestamp)>,
    pub rejected: usize,
}

impl TimelineView {
    /// Derive every view of `snapshot`. `config` is clamped first.
    #[must_use]
    pub fn build(snapshot: &Snapshot, config: &EngineConfig) -> Self {
        Self::build_with(snapshot, config.window_size(), config.overlap_threshold())
    }

    /// Derive every view with explicit, already valid parameters.
    #[must_use]
    pub fn build_with(snapshot: &Snapshot, window_size: WindowSize, overlap_threshold_ms: u64) -> Self {
        let _span = tracing::debug_span!(
            "timeline_view_build",
            events = snapshot.len(),
            window_ms = window_size.as_millis(),
            threshold_ms = overlap_threshold_ms
        )
        .entered();

        let events = snapshot.events();
        let windows = partition(events, window_size);
        let hierarchy = Hierarchy::build(events);
        let lanes = build_lanes(events, overlap_threshold_ms);
        let hierarchy_stats = HierarchyStats::collect(&hierarchy);
        let window_stats = WindowStats::collect(&windows, window_size);

        tracing::debug!(
            windows = windows.len(),
            lanes = lanes.len(),
            nodes = hierarchy.len(),
            rejected = snapshot.rejected().len(),
            "timeline view built"
        );

        Self {
            fingerprint: snapshot.fingerprint(),
            window_size,
            overlap_threshold_ms,
            windows,
            hierarchy,
            lanes,
            hierarchy_stats,
            window_stats,
            time_bounds: snapshot.time_bounds(),
            rejected: snapshot.rejected().len(),
        }
    }

    /// Resolver over this view's lanes.
    #[must_use]
    pub fn resolver(&self, tolerance_ms: u64, mode: QueryMode) -> Resolver<'_> {
        Resolver::new(&self.lanes, tolerance_ms, mode)
    }

    /// Padded display axis, if there is at least one event.
    #[must_use]
    pub fn axis(&self, padding_ms: u64) -> Option<TimeAxis> {
        self.time_bounds
            .map(|(min, max)| TimeAxis::new(min, max, padding_ms))
    }

    /// Window containing `t`, if that window is occupied.
    #[must_use]
    pub fn window_at(&self, t: Timestamp) -> Option<&TimeWindow> {
        let index = self.windows.partition_point(|w| w.end <= t);
        self.windows.get(index).filter(|w| w.contains(t))
    }

    /// Total rows when all lanes are stacked top to bottom.
    #[must_use]
    pub fn total_rows(&self) -> u32 {
        self.lanes
            .iter()
            .fold(0u32, |rows, lane| rows.saturating_add(lane.max_stack_height()))
    }
}
