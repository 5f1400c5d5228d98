//! Property-based tests for lane stacking.
//!
//! 1. Sliding-window and quadratic evaluation agree on every sorted input.
//! 2. Overlapping events never share a level.
//! 3. Each level is justified by an overlapping predecessor one level below.
//! 4. Lanes partition events by tab and preserve `(time, id)` order.
//! 5. Projection round-trips through pixels at whole-millisecond precision.

use std::sync::Arc;

use proptest::prelude::*;
use tabscope_core::event::{Event, Timestamp};
use tabscope_layout::axis::TimeScale;
use tabscope_layout::stacking::{build_lanes, stack_levels, stack_levels_naive};

// ── Helpers ─────────────────────────────────────────────────────────────

fn sorted_times(max_len: usize, spread: i64) -> impl Strategy<Value = Vec<Timestamp>> {
    prop::collection::vec(-spread..spread, 0..max_len).prop_map(|mut raw| {
        raw.sort_unstable();
        raw.into_iter().map(Timestamp::from_millis).collect()
    })
}

/// Tight bursts separated by gaps: the shape that drives deep stacks and
/// frequent expiry in the deque.
fn clustered_times() -> impl Strategy<Value = Vec<Timestamp>> {
    prop::collection::vec((0i64..50_000, prop::collection::vec(0i64..300, 1..40)), 0..12)
        .prop_map(|clusters| {
            let mut times: Vec<i64> = clusters
                .into_iter()
                .flat_map(|(base, offsets)| offsets.into_iter().map(move |o| base + o))
                .collect();
            times.sort_unstable();
            times.into_iter().map(Timestamp::from_millis).collect()
        })
}

fn threshold_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), Just(1u64), 1u64..5_000, Just(2_000u64)]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Sliding-window and quadratic evaluation agree
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn sliding_matches_naive(times in sorted_times(300, 20_000), threshold in threshold_strategy()) {
        prop_assert_eq!(stack_levels(&times, threshold), stack_levels_naive(&times, threshold));
    }

    #[test]
    fn sliding_matches_naive_on_clusters(times in clustered_times(), threshold in threshold_strategy()) {
        prop_assert_eq!(stack_levels(&times, threshold), stack_levels_naive(&times, threshold));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–3. Separation and minimality
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn overlapping_events_get_distinct_levels(times in clustered_times(), threshold in threshold_strategy()) {
        let levels = stack_levels(&times, threshold);
        for i in 0..times.len() {
            for j in 0..i {
                if times[i].abs_diff(times[j]) < threshold {
                    prop_assert_ne!(levels[i], levels[j], "i={} j={}", i, j);
                }
            }
        }
    }

    #[test]
    fn each_level_has_a_witness(times in sorted_times(200, 10_000), threshold in threshold_strategy()) {
        let levels = stack_levels(&times, threshold);
        for i in 0..times.len() {
            if levels[i] > 0 {
                let witnessed = (0..i).any(|j| {
                    times[i].abs_diff(times[j]) < threshold && levels[j] + 1 == levels[i]
                });
                prop_assert!(witnessed, "level {} at {} has no witness", levels[i], i);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Lanes partition by tab
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn lanes_partition_by_tab(rows in prop::collection::vec((1u64..6, 0i64..30_000), 0..200)) {
        let events: Vec<Arc<Event>> = rows
            .iter()
            .enumerate()
            .map(|(i, &(tab, t))| Arc::new(Event::new(i as u64, tab, t)))
            .collect();
        let lanes = build_lanes(&events, 2_000);
        let total: usize = lanes.iter().map(|lane| lane.len()).sum();
        prop_assert_eq!(total, events.len());
        for pair in lanes.windows(2) {
            prop_assert!(pair[0].tab_id() < pair[1].tab_id());
        }
        for lane in &lanes {
            prop_assert!(!lane.is_empty());
            prop_assert!(lane.events().iter().all(|e| e.tab_id == lane.tab_id()));
            let keys: Vec<_> = lane.events().iter().map(|e| e.order_key()).collect();
            prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(lane.stack_levels().len(), lane.len());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Projection round-trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn projection_round_trips(
        origin in -1_000_000i64..1_000_000,
        offset in -3_600_000i64..3_600_000,
        pps in 10.0f64..=1000.0,
    ) {
        let scale = TimeScale::new(Timestamp::from_millis(origin), pps);
        let t = Timestamp::from_millis(origin + offset);
        prop_assert_eq!(scale.x_to_time(scale.time_to_x(t)), t);
    }
}
