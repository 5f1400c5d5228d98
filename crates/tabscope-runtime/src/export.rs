#![forbid(unsafe_code)]

//! Nested JSON document for external inspection tools.
//!
//! Shape:
//!
//! ```json
//! {
//!   "timeRange": { "from": "…", "to": "…" },
//!   "spans": [ { "from", "to", "label", "eventCount", "events": [ … ] } ],
//!   "hierarchy": [ { "tabId", "topLevelEvents", "containers": [ … ] } ]
//! }
//! ```
//!
//! Instants are RFC 3339 strings in UTC.

use serde::Serialize;
use tabscope_core::event::{Event, EventId, TabId, Timestamp};
use tabscope_core::hierarchy::{ContainerKind, Hierarchy, NodeId, NodeKey, NodeKind};
use tabscope_core::window::{TimeWindow, WindowId};

use crate::view::TimelineView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanEvent {
    pub id: EventId,
    pub timestamp: String,
    pub tab_id: TabId,
    pub scope: Option<&'static str>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub id: WindowId,
    pub from: String,
    pub to: String,
    pub label: String,
    pub event_count: usize,
    pub events: Vec<SpanEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetSummary {
    pub id: EventId,
    /// Actions attached to the widget.
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    /// Container event id, or the wrapped widget's id when synthetic.
    pub id: EventId,
    pub scope: &'static str,
    pub synthetic: bool,
    /// Actions attached directly to the container.
    pub events: usize,
    pub widgets: Vec<WidgetSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
    pub tab_id: TabId,
    /// Independent actions attached to the tab itself.
    pub top_level_events: usize,
    pub containers: Vec<ContainerSummary>,
}

/// The exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedJson {
    /// Absent when the snapshot has no events.
    pub time_range: Option<TimeRange>,
    pub spans: Vec<Span>,
    pub hierarchy: Vec<TabSummary>,
}

impl NestedJson {
    /// Serialize to a JSON string.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Build the nested document for `view`.
#[must_use]
pub fn nested_json(view: &TimelineView) -> NestedJson {
    NestedJson {
        time_range: view.time_bounds.map(|(min, max)| TimeRange {
            from: iso(min),
            to: iso(max),
        }),
        spans: view.windows.iter().map(span).collect(),
        hierarchy: view
            .hierarchy
            .tabs()
            .iter()
            .filter_map(|&tab| tab_summary(&view.hierarchy, tab))
            .collect(),
    }
}

fn iso(t: Timestamp) -> String {
    t.format_rfc3339()
        .unwrap_or_else(|| t.as_millis().to_string())
}

fn span_event(event: &Event) -> SpanEvent {
    SpanEvent {
        id: event.id,
        timestamp: iso(event.timestamp),
        tab_id: event.tab_id,
        scope: event.scope.tag(),
        label: event.label.clone(),
    }
}

fn span(window: &TimeWindow) -> Span {
    Span {
        id: window.id,
        from: iso(window.start),
        to: iso(window.end),
        label: window.label.clone(),
        event_count: window.len(),
        events: window.events.iter().map(|e| span_event(e)).collect(),
    }
}

fn count_kind(tree: &Hierarchy, id: NodeId, kind: NodeKind) -> usize {
    tree.children(id)
        .iter()
        .filter(|&&child| tree[child].kind == kind)
        .count()
}

fn tab_summary(tree: &Hierarchy, tab: NodeId) -> Option<TabSummary> {
    let NodeKey::Tab(tab_id) = tree.get(tab)?.key else {
        return None;
    };
    let containers = tree
        .children(tab)
        .iter()
        .filter_map(|&child| {
            let node = &tree[child];
            let NodeKind::Container(kind) = node.kind else {
                return None;
            };
            let id = match node.key {
                NodeKey::Event(id) | NodeKey::OrphanContainer(id) => id,
                NodeKey::Tab(_) => return None,
            };
            let widgets = tree
                .children(child)
                .iter()
                .filter_map(|&w| match (tree[w].kind, tree[w].key) {
                    (NodeKind::Widget, NodeKey::Event(id)) => Some(WidgetSummary {
                        id,
                        events: count_kind(tree, w, NodeKind::Action),
                    }),
                    _ => None,
                })
                .collect();
            Some(ContainerSummary {
                id,
                scope: match kind {
                    ContainerKind::Page => "page",
                    ContainerKind::Left => "left",
                },
                synthetic: node.is_synthetic(),
                events: count_kind(tree, child, NodeKind::Action),
                widgets,
            })
        })
        .collect();
    Some(TabSummary {
        tab_id,
        top_level_events: count_kind(tree, tab, NodeKind::Action),
        containers,
    })
}
