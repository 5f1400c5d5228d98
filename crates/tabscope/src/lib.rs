#![forbid(unsafe_code)]

//! tabscope public facade crate.
//!
//! Re-exports the common types from the internal crates, adds snapshot and
//! configuration loading from JSON, and offers [`Inspector`], which owns a
//! snapshot, its memoized views, and the cursor inspection machine.

use std::fmt;
use std::io::Read;

mod inspector;

pub use inspector::Inspector;

// --- Core re-exports -------------------------------------------------------

pub use tabscope_core::config::{ConfigAdjustment, EngineConfig, WindowSize};
pub use tabscope_core::event::{
    Event, EventError, EventId, RawEvent, RawTimestamp, Scope, Snapshot, SnapshotFingerprint,
    TabId, Timestamp,
};
pub use tabscope_core::hierarchy::{
    ContainerKind, Hierarchy, HierarchyNode, NodeId, NodeKey, NodeKind, NodeShape,
};
pub use tabscope_core::window::{TimeWindow, WindowId, partition, window_start};

// --- Layout re-exports -----------------------------------------------------

pub use tabscope_layout::{Lane, Tick, TimeAxis, TimeScale, build_lanes};

// --- Runtime re-exports ----------------------------------------------------

pub use tabscope_runtime::{
    CancelReason, CursorQuery, HierarchyStats, Hit, InteractionEffect, InteractionInput,
    InteractionMachine, InteractionState, InteractionTransition, NestedJson, QueryMode, Resolver,
    TimelineView, ViewCache, WindowStats, nested_json,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for tabscope callers.
#[derive(Debug)]
pub enum Error {
    /// Malformed JSON input, or a value that could not be serialized.
    Json(serde_json::Error),
    /// I/O failure while reading input.
    Io(std::io::Error),
    /// Logging could not be installed.
    Logging(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "json: {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Logging(msg) => write!(f, "logging: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Logging(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for tabscope APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Loading ----------------------------------------------------------------

/// Parse a JSON array of raw event records into a snapshot.
///
/// Records without a usable timestamp do not fail the load; they end up in
/// [`Snapshot::rejected`].
pub fn load_snapshot_json(text: &str) -> Result<Snapshot> {
    let records: Vec<RawEvent> = serde_json::from_str(text)?;
    Ok(Snapshot::from_raw(records))
}

/// Like [`load_snapshot_json`], reading from `reader`.
pub fn load_snapshot_reader<R: Read>(reader: R) -> Result<Snapshot> {
    let records: Vec<RawEvent> = serde_json::from_reader(reader)?;
    Ok(Snapshot::from_raw(records))
}

/// Parse an [`EngineConfig`] from JSON. Missing fields take their defaults;
/// out-of-range values are clamped.
pub fn load_config_json(text: &str) -> Result<EngineConfig> {
    let config: EngineConfig = serde_json::from_str(text)?;
    Ok(config.sanitized())
}

/// Install a JSON `tracing` subscriber filtered by `RUST_LOG`.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        EngineConfig, Error, Event, Hit, InteractionInput, InteractionState, Inspector, QueryMode,
        Result, Scope, Snapshot, TimelineView, Timestamp,
    };

    pub use crate::{core, layout, runtime};
}

pub use tabscope_core as core;
pub use tabscope_layout as layout;
pub use tabscope_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_raw_records_and_sets_rejects_aside() {
        let snapshot = load_snapshot_json(
            r#"[
                {"id": 1, "userId": 7, "property": "nav", "tabId": 1, "date": "1970-01-01T00:00:01Z"},
                {"id": 2, "tabId": 1, "scope": "page", "date": 2000},
                {"id": 3, "tabId": 1, "date": "Date"},
                {"id": 4, "tabId": 1}
            ]"#,
        )
        .expect("valid json");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.rejected().len(), 2);
        assert_eq!(snapshot.events()[0].label, "nav");
        assert_eq!(snapshot.events()[1].scope, Scope::Page);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = load_snapshot_json("{not json").expect_err("must fail");
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("json: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn reader_loading() {
        let text = br#"[{"id": 1, "tabId": 3, "date": 0}]"#;
        let snapshot = load_snapshot_reader(&text[..]).expect("valid json");
        assert_eq!(snapshot.events()[0].tab_id, TabId(3));
    }

    #[test]
    fn config_loading_clamps() {
        let config = load_config_json(r#"{"tolerance_ms": 0, "pixels_per_second": 5000}"#)
            .expect("valid json");
        assert_eq!(config.tolerance_ms, 1);
        assert_eq!(config.pixels_per_second, 1000.0);
        assert_eq!(config.window_size_secs, 5.0);
    }
}
