#![forbid(unsafe_code)]

//! Core: event model, snapshot ingestion, hierarchy reconstruction, and
//! epoch-aligned time windows.

pub mod config;
pub mod event;
pub mod hierarchy;
pub mod logging;
pub mod window;

pub use config::{EngineConfig, WindowSize};
pub use event::{Event, EventError, EventId, RawEvent, Scope, Snapshot, TabId, Timestamp};
pub use hierarchy::{Hierarchy, HierarchyNode, NodeId, NodeKey, NodeKind};
pub use window::{TimeWindow, WindowId, partition, window_id_for, window_start};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, warn};
