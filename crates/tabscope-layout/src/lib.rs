#![forbid(unsafe_code)]

//! Layout: per-tab lanes with overlap stacking, and time ↔ pixel projection.

pub mod axis;
pub mod stacking;

pub use axis::{Tick, TimeAxis, TimeScale};
pub use stacking::{Lane, build_lanes, row_offsets, stack_levels, stack_levels_naive};
