#![forbid(unsafe_code)]

//! Summary statistics over a hierarchy and over a window partition.
//!
//! # Key Invariants
//!
//! 1. **Exact**: the per-window average is computed in integer tenths with
//!    round-half-up, so it never depends on float rounding.
//! 2. **Stable tie-break**: the busiest window is the first one reaching the
//!    maximum count.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | No windows | Counts 0, busiest window and time span read `N/A` |
//! | Hierarchy with orphans | Synthetic containers counted as containers and reported separately |

use std::fmt;

use serde::Serialize;
use tabscope_core::config::WindowSize;
use tabscope_core::event::Timestamp;
use tabscope_core::hierarchy::{ContainerKind, Hierarchy, NodeKind};
use tabscope_core::window::{TimeWindow, WindowId};

/// Placeholder for labels that need at least one window.
pub const NOT_AVAILABLE: &str = "N/A";

/// Node counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStats {
    pub tabs: usize,
    /// Pages and lefts, synthetic ones included.
    pub containers: usize,
    pub pages: usize,
    pub lefts: usize,
    pub synthetic_containers: usize,
    pub widgets: usize,
    pub actions: usize,
    /// Every node.
    pub total: usize,
}

impl HierarchyStats {
    #[must_use]
    pub fn collect(tree: &Hierarchy) -> Self {
        let mut stats = Self::default();
        for node in tree.nodes() {
            stats.total += 1;
            match node.kind {
                NodeKind::Tab => stats.tabs += 1,
                NodeKind::Container(kind) => {
                    stats.containers += 1;
                    match kind {
                        ContainerKind::Page => stats.pages += 1,
                        ContainerKind::Left => stats.lefts += 1,
                    }
                    if node.is_synthetic() {
                        stats.synthetic_containers += 1;
                    }
                }
                NodeKind::Widget => stats.widgets += 1,
                NodeKind::Action => stats.actions += 1,
            }
        }
        stats
    }
}

/// Aggregate figures over a window partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub total_windows: usize,
    pub total_items: usize,
    /// Mean events per window, rounded half-up to one decimal.
    pub average_items_per_window: f64,
    /// Label of the first window holding the most events, or `N/A`.
    pub busiest_window: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busiest_window_id: Option<WindowId>,
    pub max_items_in_window: usize,
    /// `HH:MM:SS to HH:MM:SS` from the first window start to the last window
    /// end, or `N/A`.
    pub time_span: String,
    #[serde(skip)]
    pub span: Option<(Timestamp, Timestamp)>,
    /// `"<n> seconds"`.
    pub window_size: String,
    #[serde(skip)]
    average_tenths: u64,
}

impl WindowStats {
    #[must_use]
    pub fn collect(windows: &[TimeWindow], size: WindowSize) -> Self {
        let (Some(first), Some(last)) = (windows.first(), windows.last()) else {
            return Self::empty(size);
        };

        let total_items: usize = windows.iter().map(TimeWindow::len).sum();
        let mut busiest = first;
        for window in &windows[1..] {
            if window.len() > busiest.len() {
                busiest = window;
            }
        }
        let average_tenths = average_tenths(total_items as u64, windows.len() as u64);

        Self {
            total_windows: windows.len(),
            total_items,
            average_items_per_window: average_tenths as f64 / 10.0,
            busiest_window: busiest.label.clone(),
            busiest_window_id: Some(busiest.id),
            max_items_in_window: busiest.len(),
            time_span: format!("{} to {}", first.start.format_hms(), last.end.format_hms()),
            span: Some((first.start, last.end)),
            window_size: size.to_string(),
            average_tenths,
        }
    }

    fn empty(size: WindowSize) -> Self {
        Self {
            total_windows: 0,
            total_items: 0,
            average_items_per_window: 0.0,
            busiest_window: NOT_AVAILABLE.to_string(),
            busiest_window_id: None,
            max_items_in_window: 0,
            time_span: NOT_AVAILABLE.to_string(),
            span: None,
            window_size: size.to_string(),
            average_tenths: 0,
        }
    }

    /// The average in exact tenths (`25` means 2.5).
    #[must_use]
    pub const fn average_tenths(&self) -> u64 {
        self.average_tenths
    }
}

impl fmt::Display for WindowStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} windows, {} items, {}.{} avg, busiest {} ({}), span {}",
            self.total_windows,
            self.total_items,
            self.average_tenths / 10,
            self.average_tenths % 10,
            self.busiest_window,
            self.max_items_in_window,
            self.time_span
        )
    }
}

/// `round_half_up(10 · items / windows)`.
fn average_tenths(items: u64, windows: u64) -> u64 {
    if windows == 0 {
        return 0;
    }
    let numerator = u128::from(items) * 20 + u128::from(windows);
    let tenths = numerator / (u128::from(windows) * 2);
    u64::try_from(tenths).unwrap_or(u64::MAX)
}
