/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Window filtering and view diffing.
//!
//! [`filter_window`] derives the visible subgraph for a window; the
//! [`DiffEngine`] compares successive filtered views by id and reports what
//! appeared, what left, and what stayed. Both are deterministic: inputs are
//! iterated in id order and outputs are emitted sorted.
//!
//! Filter rule: a node survives when it has no timestamp or its timestamp is
//! inside the window (inclusive); an edge survives under the same timestamp
//! test, and a surviving edge pulls both endpoint nodes into the output even
//! when their own timestamps fall outside the window. Every edge in a
//! filtered view therefore has both endpoints in that same view.
//!
//! Full recomputation on every change is O(N+E) and acceptable for the
//! bounded datasets this engine targets (hundreds to low thousands of
//! elements).

use std::collections::BTreeMap;

use log::debug;

use crate::dataset::DatasetStore;
use crate::model::{EdgeRecord, ElementId, GraphElement, NodeRecord};
use crate::window::TimeWindow;

/// The visible subgraph for one window, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView {
    pub nodes: BTreeMap<ElementId, NodeRecord>,
    pub edges: BTreeMap<ElementId, EdgeRecord>,
}

impl FilteredView {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }
}

/// Filter the dataset by the window.
pub fn filter_window(store: &DatasetStore, window: &TimeWindow) -> FilteredView {
    let mut nodes: BTreeMap<ElementId, NodeRecord> = BTreeMap::new();
    for node in store.nodes() {
        if node.timestamp.is_none_or(|ts| window.contains(ts)) {
            nodes.insert(node.id.clone(), node.clone());
        }
    }

    let mut edges: BTreeMap<ElementId, EdgeRecord> = BTreeMap::new();
    for edge in store.edges() {
        if edge.timestamp.is_none_or(|ts| window.contains(ts)) {
            edges.insert(edge.id.clone(), edge.clone());
        }
    }

    // A windowed edge keeps its endpoints visible. The store guarantees the
    // endpoint records exist.
    for edge in edges.values() {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !nodes.contains_key(endpoint)
                && let Some(node) = store.node(endpoint)
            {
                nodes.insert(node.id.clone(), node.clone());
            }
        }
    }

    FilteredView { nodes, edges }
}

/// Added/removed/unchanged between two successive filtered views.
///
/// `added` and `unchanged` list nodes before edges; `removed` lists edges
/// before nodes, matching the order in which the animation layer inserts and
/// detaches. Within each kind the order is ascending by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewDiff {
    pub added: Vec<GraphElement>,
    pub removed: Vec<GraphElement>,
    pub unchanged: Vec<GraphElement>,
}

impl ViewDiff {
    /// True when the view did not change.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn added_ids(&self) -> Vec<ElementId> {
        self.added.iter().map(|e| e.id().clone()).collect()
    }

    pub fn removed_ids(&self) -> Vec<ElementId> {
        self.removed.iter().map(|e| e.id().clone()).collect()
    }
}

/// Compares each new filtered view against the previous one by id.
#[derive(Debug, Default)]
pub struct DiffEngine {
    last_nodes: BTreeMap<ElementId, NodeRecord>,
    last_edges: BTreeMap<ElementId, EdgeRecord>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `next` against the previously applied view and remember it.
    pub fn apply(&mut self, next: &FilteredView) -> ViewDiff {
        let mut diff = ViewDiff::default();

        for (id, node) in &next.nodes {
            if self.last_nodes.contains_key(id) {
                diff.unchanged.push(GraphElement::Node(node.clone()));
            } else {
                diff.added.push(GraphElement::Node(node.clone()));
            }
        }
        for (id, edge) in &next.edges {
            if self.last_edges.contains_key(id) {
                diff.unchanged.push(GraphElement::Edge(edge.clone()));
            } else {
                diff.added.push(GraphElement::Edge(edge.clone()));
            }
        }

        for (id, edge) in &self.last_edges {
            if !next.edges.contains_key(id) {
                diff.removed.push(GraphElement::Edge(edge.clone()));
            }
        }
        for (id, node) in &self.last_nodes {
            if !next.nodes.contains_key(id) {
                diff.removed.push(GraphElement::Node(node.clone()));
            }
        }

        debug!(
            "View diff: {} added, {} removed, {} unchanged",
            diff.added.len(),
            diff.removed.len(),
            diff.unchanged.len()
        );
        self.last_nodes = next.nodes.clone();
        self.last_edges = next.edges.clone();
        diff
    }

    /// Forget the previous view. The next apply reports everything as added.
    pub fn reset(&mut self) {
        self.last_nodes.clear();
        self.last_edges.clear();
    }
}
