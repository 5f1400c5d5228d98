#![forbid(unsafe_code)]

//! Structured log output of view builds, cache lookups, and inspection
//! transitions, captured through a `tracing_subscriber` layer.

use std::sync::{Arc, Mutex};

use tabscope_core::config::EngineConfig;
use tabscope_core::event::{Event, Snapshot};
use tabscope_layout::axis::TimeScale;
use tabscope_runtime::{InteractionInput, InteractionMachine, QueryMode, ViewCache};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Captured {
    message: String,
    fields: Vec<(String, String)>,
}

impl Captured {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Visit for Captured {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{value:?}").trim_matches('"').to_string();
        if field.name() == "message" {
            self.message = text;
        } else {
            self.fields.push((field.name().to_string(), text));
        }
    }
}

#[derive(Default)]
struct EventLog {
    events: Arc<Mutex<Vec<Captured>>>,
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventLog
where
    S: tracing::Subscriber,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        self.spans
            .lock()
            .unwrap()
            .push(attrs.metadata().name().to_string());
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut captured = Captured::default();
        event.record(&mut captured);
        self.events.lock().unwrap().push(captured);
    }
}

type Handles = (Arc<Mutex<Vec<Captured>>>, Arc<Mutex<Vec<String>>>);

fn capture() -> (tracing::dispatcher::DefaultGuard, Handles) {
    let log = EventLog::default();
    let handles = (log.events.clone(), log.spans.clone());
    let subscriber = tracing_subscriber::registry().with(log);
    let guard = tracing::subscriber::set_default(subscriber);
    // Ensure callsite interest is re-evaluated in parallel test runs.
    tracing::callsite::rebuild_interest_cache();
    (guard, handles)
}

fn snapshot() -> Snapshot {
    Snapshot::new(vec![
        Event::new(1, 1, 0),
        Event::new(2, 1, 900),
        Event::new(3, 2, 7_000),
    ])
}

// ============================================================================
// View builds and cache traffic
// ============================================================================

#[test]
fn cache_miss_builds_view_inside_span() {
    let (_guard, (events, spans)) = capture();
    let mut cache = ViewCache::default();
    cache.get_or_build(&snapshot(), &EngineConfig::default());
    cache.get_or_build(&snapshot(), &EngineConfig::default());

    let spans = spans.lock().unwrap();
    assert_eq!(spans.iter().filter(|s| *s == "timeline_view_build").count(), 1);

    let events = events.lock().unwrap();
    let ours: Vec<_> = events
        .iter()
        .filter(|e| e.message.starts_with("view cache") || e.message == "timeline view built")
        .collect();
    let messages: Vec<_> = ours.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["view cache miss", "timeline view built", "view cache hit"]
    );
    let built = ours[1];
    assert_eq!(built.field("windows"), Some("2"));
    assert_eq!(built.field("lanes"), Some("2"));
    assert_eq!(built.field("rejected"), Some("0"));
}

// ============================================================================
// Inspection transitions
// ============================================================================

#[test]
fn every_transition_is_logged_with_its_states() {
    let mut cache = ViewCache::default();
    let view = cache.get_or_build(&snapshot(), &EngineConfig::default());
    let resolver = view.resolver(500, QueryMode::AllWithin);
    let mut machine = InteractionMachine::new(TimeScale::default());

    let (_guard, (events, _)) = capture();
    machine.apply(InteractionInput::PointerMove { x: 20.0 }, &resolver);
    machine.apply(InteractionInput::Click, &resolver);
    machine.apply(InteractionInput::Close, &resolver);

    let events = events.lock().unwrap();
    let transitions: Vec<_> = events
        .iter()
        .filter(|e| e.message == "inspection transition")
        .collect();
    assert_eq!(transitions.len(), 3);
    assert_eq!(transitions[0].field("to"), Some("hover"));
    assert_eq!(transitions[0].field("hits"), Some("2"));
    assert_eq!(transitions[1].field("to"), Some("frozen"));
    assert_eq!(transitions[2].field("from"), Some("frozen"));
    assert_eq!(transitions[2].field("to"), Some("idle"));
    assert_eq!(transitions[2].field("transition_id"), Some("3"));
}
