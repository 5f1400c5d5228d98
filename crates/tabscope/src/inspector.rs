#![forbid(unsafe_code)]

//! One inspection session: snapshot, configuration, memoized view, and the
//! cursor machine.

use std::sync::Arc;

use tabscope_core::config::EngineConfig;
use tabscope_core::event::{Snapshot, Timestamp};
use tabscope_layout::axis::{TimeAxis, TimeScale};
use tabscope_runtime::export::nested_json;
use tabscope_runtime::interaction::{InteractionInput, InteractionMachine, InteractionTransition};
use tabscope_runtime::resolver::{CursorQuery, Hit, QueryMode};
use tabscope_runtime::view::TimelineView;
use tabscope_runtime::view_cache::{CacheStats, ViewCache};

use crate::Result;

/// Owns everything needed to inspect one snapshot interactively.
///
/// Views are rebuilt only when the snapshot, window size, or overlap
/// threshold change; pointer and zoom input only issue cursor queries.
#[derive(Debug)]
pub struct Inspector {
    config: EngineConfig,
    snapshot: Snapshot,
    cache: ViewCache,
    view: Arc<TimelineView>,
    machine: InteractionMachine,
    mode: QueryMode,
}

impl Inspector {
    /// Start a session; `config` is clamped into range first.
    #[must_use]
    pub fn new(snapshot: Snapshot, config: EngineConfig) -> Self {
        let config = config.sanitized();
        let mut cache = ViewCache::default();
        let view = cache.get_or_build(&snapshot, &config);
        let machine = InteractionMachine::new(scale_for(&view, &config));
        Self {
            config,
            snapshot,
            cache,
            view,
            machine,
            mode: QueryMode::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn view(&self) -> &TimelineView {
        &self.view
    }

    #[must_use]
    pub fn machine(&self) -> &InteractionMachine {
        &self.machine
    }

    #[must_use]
    pub const fn query_mode(&self) -> QueryMode {
        self.mode
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Padded display axis for the current view.
    #[must_use]
    pub fn axis(&self) -> Option<TimeAxis> {
        self.view.axis(self.config.axis_padding())
    }

    /// Swap in a new snapshot. The inspection returns to idle unless the
    /// content is identical to the current one.
    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.refresh();
    }

    /// Replace the configuration. The inspection returns to idle only when
    /// the derived view changes; padding and zoom re-anchor the pointer
    /// mapping in place.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config.sanitized();
        self.refresh();
    }

    pub fn set_query_mode(&mut self, mode: QueryMode) {
        self.mode = mode;
    }

    fn refresh(&mut self) {
        let view = self.cache.get_or_build(&self.snapshot, &self.config);
        let scale = scale_for(&view, &self.config);
        if Arc::ptr_eq(&view, &self.view) {
            self.machine.set_scale(scale);
        } else {
            self.machine = InteractionMachine::new(scale);
            self.view = view;
        }
    }

    /// Feed one interaction input. Zoom input is kept in the configuration so
    /// it survives later rebuilds.
    pub fn apply(&mut self, input: InteractionInput) -> InteractionTransition {
        let resolver = self.view.resolver(self.config.tolerance(), self.mode);
        let transition = self.machine.apply(input, &resolver);
        if let InteractionInput::Zoom { .. } = input {
            self.config.pixels_per_second = self.machine.scale().pixels_per_second();
        }
        transition
    }

    /// One-off query at `cursor` with the session's tolerance and mode.
    #[must_use]
    pub fn query(&self, cursor: Timestamp) -> Vec<Hit> {
        self.view
            .resolver(self.config.tolerance(), self.mode)
            .query(cursor)
    }

    /// Nested JSON export of the current view.
    pub fn export_json(&self, pretty: bool) -> Result<String> {
        Ok(nested_json(&self.view).to_json(pretty)?)
    }
}

fn scale_for(view: &TimelineView, config: &EngineConfig) -> TimeScale {
    let origin = view
        .axis(config.axis_padding())
        .map_or(Timestamp::EPOCH, |axis| axis.start());
    TimeScale::new(origin, config.scale())
}
