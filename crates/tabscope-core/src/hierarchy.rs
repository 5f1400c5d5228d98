#![forbid(unsafe_code)]

//! Tab → Container → Widget → Action reconstruction from parent pointers.
//!
//! Events arrive flat; each may name a parent by id. The builder restores the
//! four-level tree per tab:
//!
//! ```text
//! Tab
//! ├── Container (page | left)      root-level page/left events
//! │   ├── Widget                   widget whose parent is this container
//! │   │   └── Action               action whose parent is this widget
//! │   └── Action                   action whose parent is this container
//! ├── Container (orphaned)         synthetic, wraps a widget whose container is absent
//! │   └── Widget
//! └── Action                       action with no resolvable parent
//! ```
//!
//! # Invariants
//!
//! 1. One root per distinct tab id, roots ascending by tab id.
//! 2. Every input event appears in exactly one node; each node has exactly one
//!    parent. Nodes live in an arena and refer to children by [`NodeId`].
//! 3. Children are ordered by source time, then event id.
//! 4. Parent pointers are resolved at most one level deep, through a per-tab
//!    id lookup table. A pointer never implies ownership, so cyclic or
//!    dangling chains cannot loop or fail; they degrade to tab-level placement.
//! 5. Building twice from the same events yields structurally identical trees.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::ops::Index;
use std::sync::Arc;

use serde::Serialize;

use crate::event::{Event, EventId, Scope, TabId, Timestamp};

/// Arena index of a node inside one [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Flavour of a container node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Page,
    Left,
}

/// Closed set of node kinds, decided once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "container", rename_all = "snake_case")]
pub enum NodeKind {
    Tab,
    Container(ContainerKind),
    Widget,
    Action,
}

impl NodeKind {
    fn for_scope(scope: Scope) -> Self {
        match scope {
            Scope::Page => Self::Container(ContainerKind::Page),
            Scope::Left => Self::Container(ContainerKind::Left),
            Scope::Widget => Self::Widget,
            Scope::None => Self::Action,
        }
    }
}

/// Stable, reconstructible identity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "key", content = "id", rename_all = "snake_case")]
pub enum NodeKey {
    Tab(TabId),
    Event(EventId),
    /// Synthetic container wrapping the widget with this id.
    OrphanContainer(EventId),
}

/// One node of a reconstructed tree.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub label: String,
    /// Event this node was derived from. `None` for tab roots; the wrapped
    /// widget's event for synthetic containers.
    pub source: Option<Arc<Event>>,
    pub children: Vec<NodeId>,
    /// Presentation flag; never read by the engine.
    pub expanded: bool,
}

impl HierarchyNode {
    /// Whether this is a container synthesized for an orphaned widget.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        matches!(self.key, NodeKey::OrphanContainer(_))
    }

    fn order_key(&self) -> Option<(Timestamp, EventId)> {
        self.source.as_deref().map(Event::order_key)
    }
}

/// Structural outline of a subtree, for comparisons and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeShape {
    #[serde(flatten)]
    pub key: NodeKey,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub children: Vec<NodeShape>,
}

/// Forest of per-tab trees stored in one arena.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    roots: Vec<NodeId>,
    by_event: HashMap<EventId, NodeId>,
}

impl Hierarchy {
    /// Reconstruct one tree per tab from `events`.
    #[must_use]
    pub fn build(events: &[Arc<Event>]) -> Self {
        let mut buckets: BTreeMap<TabId, Vec<&Arc<Event>>> = BTreeMap::new();
        for event in events {
            buckets.entry(event.tab_id).or_default().push(event);
        }

        let mut tree = Self {
            nodes: Vec::with_capacity(events.len() + buckets.len()),
            roots: Vec::with_capacity(buckets.len()),
            by_event: HashMap::with_capacity(events.len()),
        };
        let mut orphaned = 0usize;
        let mut independent = 0usize;

        for (tab_id, mut bucket) in buckets {
            bucket.sort_by_key(|event| event.order_key());
            let tab = tree.push(HierarchyNode {
                key: NodeKey::Tab(tab_id),
                kind: NodeKind::Tab,
                label: tab_id.to_string(),
                source: None,
                children: Vec::new(),
                expanded: false,
            });
            tree.roots.push(tab);

            // Lookup tables are scoped to this tab's partition.
            let mut containers: HashMap<EventId, NodeId> = HashMap::new();
            let mut widgets: HashMap<EventId, NodeId> = HashMap::new();

            for event in bucket.iter().filter(|e| e.scope.is_container()) {
                let node = tree.push_event(event, tab);
                containers.entry(event.id).or_insert(node);
            }

            for event in bucket.iter().filter(|e| e.scope == Scope::Widget) {
                let container = event
                    .parent_id
                    .and_then(|parent| containers.get(&parent).copied());
                let parent = match container {
                    Some(container) => container,
                    None => {
                        orphaned += 1;
                        let synthetic = tree.push(HierarchyNode {
                            key: NodeKey::OrphanContainer(event.id),
                            kind: NodeKind::Container(ContainerKind::Page),
                            label: format!("orphaned_container_{}", event.label),
                            source: Some(Arc::clone(event)),
                            children: Vec::new(),
                            expanded: false,
                        });
                        tree.nodes[tab.0].children.push(synthetic);
                        synthetic
                    }
                };
                let node = tree.push_event(event, parent);
                widgets.entry(event.id).or_insert(node);
            }

            for event in bucket.iter().filter(|e| e.scope == Scope::None) {
                let resolved = event.parent_id.and_then(|parent| {
                    containers
                        .get(&parent)
                        .or_else(|| widgets.get(&parent))
                        .copied()
                });
                if resolved.is_none() {
                    independent += 1;
                }
                tree.push_event(event, resolved.unwrap_or(tab));
            }
        }

        tree.sort_children();
        crate::debug!(
            tabs = tree.roots.len(),
            nodes = tree.nodes.len(),
            orphaned_widgets = orphaned,
            independent_actions = independent,
            "hierarchy built"
        );
        tree
    }

    fn push(&mut self, node: HierarchyNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn push_event(&mut self, event: &Arc<Event>, parent: NodeId) -> NodeId {
        let node = self.push(HierarchyNode {
            key: NodeKey::Event(event.id),
            kind: NodeKind::for_scope(event.scope),
            label: event.label.clone(),
            source: Some(Arc::clone(event)),
            children: Vec::new(),
            expanded: false,
        });
        self.nodes[parent.0].children.push(node);
        self.by_event.entry(event.id).or_insert(node);
        node
    }

    fn sort_children(&mut self) {
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by_key(|child| self.nodes[child.0].order_key());
            self.nodes[i].children = children;
        }
    }

    /// Tab roots, ascending by tab id.
    #[must_use]
    pub fn tabs(&self) -> &[NodeId] {
        &self.roots
    }

    /// Node by id, if it belongs to this hierarchy.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&HierarchyNode> {
        self.nodes.get(id.0)
    }

    /// Node carrying `key`, if present. Event keys resolve to the first
    /// node built for that id.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<NodeId> {
        match key {
            NodeKey::Event(id) => self.find_by_event(id),
            _ => self
                .nodes
                .iter()
                .position(|node| node.key == key)
                .map(NodeId),
        }
    }

    /// Children of `id` in display order (empty for unknown ids).
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |node| node.children.as_slice())
    }

    /// All nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.iter()
    }

    /// Node built from the event with `id` (the widget itself, not its
    /// synthetic container).
    #[must_use]
    pub fn find_by_event(&self, id: EventId) -> Option<NodeId> {
        self.by_event.get(&id).copied()
    }

    /// Set the presentation flag. Returns `false` for unknown ids.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Flip the presentation flag, returning the new value.
    pub fn toggle_expanded(&mut self, id: NodeId) -> Option<bool> {
        let node = self.nodes.get_mut(id.0)?;
        node.expanded = !node.expanded;
        Some(node.expanded)
    }

    /// Total number of nodes, tab roots and synthetic containers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether there are no tabs at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural outline of every tab tree.
    #[must_use]
    pub fn shape(&self) -> Vec<NodeShape> {
        self.roots.iter().map(|&root| self.shape_of(root)).collect()
    }

    fn shape_of(&self, id: NodeId) -> NodeShape {
        let node = &self.nodes[id.0];
        NodeShape {
            key: node.key,
            kind: node.kind,
            children: node.children.iter().map(|&c| self.shape_of(c)).collect(),
        }
    }

    /// Compact one-line outline, e.g. `Tab(1) → [Action(1), Page(2) → [Widget(3)]]`.
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for (i, &root) in self.roots.iter().enumerate() {
            if i > 0 {
                out.push_str("; ");
            }
            self.write_outline(root, &mut out);
        }
        out
    }

    fn write_outline(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        let _ = write!(out, "{}", OutlineToken(node));
        if node.children.is_empty() {
            return;
        }
        out.push_str(" → [");
        for (i, &child) in node.children.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_outline(child, out);
        }
        out.push(']');
    }
}

impl Index<NodeId> for Hierarchy {
    type Output = HierarchyNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

struct OutlineToken<'a>(&'a HierarchyNode);

impl fmt::Display for OutlineToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0.key, self.0.kind) {
            (NodeKey::Tab(tab), _) => write!(f, "Tab({})", tab.get()),
            (NodeKey::OrphanContainer(widget), _) => write!(f, "Orphan({})", widget.get()),
            (NodeKey::Event(id), NodeKind::Container(ContainerKind::Page)) => {
                write!(f, "Page({})", id.get())
            }
            (NodeKey::Event(id), NodeKind::Container(ContainerKind::Left)) => {
                write!(f, "Left({})", id.get())
            }
            (NodeKey::Event(id), NodeKind::Widget) => write!(f, "Widget({})", id.get()),
            (NodeKey::Event(id), _) => write!(f, "Action({})", id.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(events: Vec<Event>) -> Vec<Arc<Event>> {
        events.into_iter().map(Arc::new).collect()
    }

    fn scenario() -> Vec<Arc<Event>> {
        arc(vec![
            Event::new(1, 1, 0),
            Event::new(2, 1, 1000).with_scope(Scope::Page),
            Event::new(3, 1, 1500).with_scope(Scope::Widget).with_parent(2),
            Event::new(4, 1, 1600).with_parent(3),
        ])
    }

    #[test]
    fn builds_four_level_tree() {
        let tree = Hierarchy::build(&scenario());
        assert_eq!(
            tree.outline(),
            "Tab(1) → [Action(1), Page(2) → [Widget(3) → [Action(4)]]]"
        );
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        let tree = Hierarchy::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.tabs().is_empty());
        assert_eq!(tree.outline(), "");
    }

    #[test]
    fn tabs_are_ascending() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 9, 0),
            Event::new(2, 2, 0),
            Event::new(3, 5, 0),
        ]));
        let tabs: Vec<_> = tree
            .tabs()
            .iter()
            .map(|&t| tree[t].key)
            .collect();
        assert_eq!(
            tabs,
            vec![
                NodeKey::Tab(TabId(2)),
                NodeKey::Tab(TabId(5)),
                NodeKey::Tab(TabId(9))
            ]
        );
    }

    #[test]
    fn widget_without_container_gets_synthetic_parent() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(10, 1, 500)
                .with_scope(Scope::Widget)
                .with_parent(99)
                .with_label("search"),
            Event::new(11, 1, 600).with_parent(10),
        ]));
        assert_eq!(tree.outline(), "Tab(1) → [Orphan(10) → [Widget(10) → [Action(11)]]]");
        let orphan = tree.children(tree.tabs()[0])[0];
        assert!(tree[orphan].is_synthetic());
        assert_eq!(tree[orphan].label, "orphaned_container_search");
        assert_eq!(tree[orphan].kind, NodeKind::Container(ContainerKind::Page));
        assert_eq!(tree.find_by_event(EventId(10)).map(|n| tree[n].kind), Some(NodeKind::Widget));
        assert_eq!(tree.node(NodeKey::OrphanContainer(EventId(10))), Some(orphan));
        assert_eq!(tree.node(NodeKey::Tab(TabId(1))), Some(tree.tabs()[0]));
        assert_eq!(tree.node(NodeKey::Tab(TabId(2))), None);
    }

    #[test]
    fn widget_parented_to_widget_is_orphaned() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 1, 0).with_scope(Scope::Page),
            Event::new(2, 1, 1).with_scope(Scope::Widget).with_parent(1),
            Event::new(3, 1, 2).with_scope(Scope::Widget).with_parent(2),
        ]));
        assert_eq!(
            tree.outline(),
            "Tab(1) → [Page(1) → [Widget(2)], Orphan(3) → [Widget(3)]]"
        );
    }

    #[test]
    fn dangling_action_becomes_independent() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 1, 0).with_scope(Scope::Left),
            Event::new(2, 1, 5).with_parent(404),
            Event::new(3, 1, 7).with_parent(1),
        ]));
        assert_eq!(tree.outline(), "Tab(1) → [Left(1) → [Action(3)], Action(2)]");
    }

    #[test]
    fn action_parented_to_action_stays_at_tab_level() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 1, 0),
            Event::new(2, 1, 1).with_parent(1),
        ]));
        assert_eq!(tree.outline(), "Tab(1) → [Action(1), Action(2)]");
    }

    #[test]
    fn parents_resolve_only_within_the_same_tab() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 1, 0).with_scope(Scope::Page),
            Event::new(2, 2, 1).with_scope(Scope::Widget).with_parent(1),
            Event::new(3, 2, 2).with_parent(1),
        ]));
        assert_eq!(
            tree.outline(),
            "Tab(1) → [Page(1)]; Tab(2) → [Orphan(2) → [Widget(2)], Action(3)]"
        );
    }

    #[test]
    fn cyclic_parents_terminate() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 1, 0).with_scope(Scope::Widget).with_parent(2),
            Event::new(2, 1, 1).with_scope(Scope::Widget).with_parent(1),
            Event::new(3, 1, 2).with_parent(3),
        ]));
        assert_eq!(
            tree.outline(),
            "Tab(1) → [Orphan(1) → [Widget(1)], Orphan(2) → [Widget(2)], Action(3)]"
        );
    }

    #[test]
    fn nested_container_is_promoted_to_tab_level() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(1, 1, 0).with_scope(Scope::Page),
            Event::new(2, 1, 1).with_scope(Scope::Left).with_parent(1),
        ]));
        assert_eq!(tree.outline(), "Tab(1) → [Page(1), Left(2)]");
    }

    #[test]
    fn children_sorted_by_time_then_id() {
        let tree = Hierarchy::build(&arc(vec![
            Event::new(5, 1, 100).with_scope(Scope::Page),
            Event::new(4, 1, 100),
            Event::new(3, 1, 50),
            Event::new(6, 1, 120).with_parent(5),
            Event::new(2, 1, 110).with_parent(5),
        ]));
        assert_eq!(
            tree.outline(),
            "Tab(1) → [Action(3), Action(4), Page(5) → [Action(2), Action(6)]]"
        );
    }

    #[test]
    fn rebuild_is_structurally_identical() {
        let events = scenario();
        assert_eq!(Hierarchy::build(&events).shape(), Hierarchy::build(&events).shape());
    }

    #[test]
    fn expansion_flags() {
        let mut tree = Hierarchy::build(&scenario());
        let tab = tree.tabs()[0];
        assert!(!tree[tab].expanded);
        assert_eq!(tree.toggle_expanded(tab), Some(true));
        assert!(tree.set_expanded(tab, false));
        assert!(!tree[tab].expanded);
        assert!(!tree.set_expanded(NodeId(999), true));
        assert_eq!(tree.toggle_expanded(NodeId(999)), None);
    }

    #[test]
    fn shape_serializes_with_flattened_keys() {
        let tree = Hierarchy::build(&arc(vec![Event::new(7, 3, 0)]));
        let json = serde_json::to_value(tree.shape()).expect("json");
        assert_eq!(json[0]["key"], "tab");
        assert_eq!(json[0]["id"], 3);
        assert_eq!(json[0]["children"][0]["kind"], "action");
        assert_eq!(json[0]["children"][0]["id"], 7);
    }
}
