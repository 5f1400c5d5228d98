#![forbid(unsafe_code)]

//! Runtime: cursor queries, statistics, the inspection state machine, and the
//! memoized view bundle built from a snapshot.

pub mod export;
pub mod interaction;
pub mod resolver;
pub mod stats;
pub mod view;
pub mod view_cache;

pub use export::{NestedJson, nested_json};
pub use interaction::{
    CancelReason, InteractionEffect, InteractionInput, InteractionMachine, InteractionNoopReason,
    InteractionState, InteractionTransition, UnfreezeCause,
};
pub use resolver::{CursorQuery, Hit, QueryMode, Resolver, all_within, nearest_per_lane};
pub use stats::{HierarchyStats, WindowStats};
pub use view::TimelineView;
pub use view_cache::{CacheStats, ViewCache, ViewKey};
