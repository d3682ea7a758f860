/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The on-screen graph.
//!
//! Core structures:
//! - [`ViewGraph`]: stable graph of currently rendered elements, keyed by
//!   element id, including elements mid fade-out
//! - [`ViewNode`] / [`ViewEdge`]: render state (position, opacity) joined to
//!   the element identity
//!
//! Edge insertion validates that both endpoints are present, so the view can
//! never hold a dangling edge regardless of the order mutations arrive in.

use std::collections::HashMap;

use euclid::default::Point2D;
use log::debug;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::model::{EdgeRecord, ElementId, NodeRecord, TimeMs};

pub type NodeKey = NodeIndex;
pub type EdgeKey = EdgeIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub id: ElementId,
    pub label: String,
    pub category: String,
    pub timestamp: Option<TimeMs>,
    pub position: Point2D<f32>,
    pub opacity: f32,
}

impl ViewNode {
    pub fn from_record(record: &NodeRecord, position: Point2D<f32>, opacity: f32) -> Self {
        ViewNode {
            id: record.id.clone(),
            label: record.label.clone(),
            category: record.category.clone(),
            timestamp: record.timestamp,
            position,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewEdge {
    pub id: ElementId,
    pub category: String,
    pub timestamp: Option<TimeMs>,
    pub opacity: f32,
}

impl ViewEdge {
    pub fn from_record(record: &EdgeRecord, opacity: f32) -> Self {
        ViewEdge {
            id: record.id.clone(),
            category: record.category.clone(),
            timestamp: record.timestamp,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

/// One rendered edge joined to its endpoint nodes.
pub struct EdgeView<'a> {
    pub edge: &'a ViewEdge,
    pub source: &'a ViewNode,
    pub target: &'a ViewNode,
}

#[derive(Debug, Default)]
pub struct ViewGraph {
    inner: StableGraph<ViewNode, ViewEdge>,
    node_keys: HashMap<ElementId, NodeKey>,
    edge_keys: HashMap<ElementId, EdgeKey>,
}

impl ViewGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. An id already present keeps its existing state and key.
    pub fn insert_node(
        &mut self,
        record: &NodeRecord,
        position: Point2D<f32>,
        opacity: f32,
    ) -> NodeKey {
        if let Some(key) = self.node_keys.get(&record.id) {
            return *key;
        }
        let key = self.inner.add_node(ViewNode::from_record(record, position, opacity));
        self.node_keys.insert(record.id.clone(), key);
        key
    }

    /// Insert an edge; both endpoints must already be in the view.
    pub fn insert_edge(&mut self, record: &EdgeRecord, opacity: f32) -> Option<EdgeKey> {
        if let Some(key) = self.edge_keys.get(&record.id) {
            return Some(*key);
        }
        let (Some(&source), Some(&target)) = (
            self.node_keys.get(&record.source_id),
            self.node_keys.get(&record.target_id),
        ) else {
            debug!(
                "Refusing edge {} with missing endpoint ({} -> {})",
                record.id, record.source_id, record.target_id
            );
            return None;
        };
        let key = self.inner.add_edge(source, target, ViewEdge::from_record(record, opacity));
        self.edge_keys.insert(record.id.clone(), key);
        Some(key)
    }

    /// Remove a node and any edges still attached to it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(key) = self.node_keys.remove(id) else {
            return false;
        };
        let orphaned: Vec<ElementId> = self
            .inner
            .edge_references()
            .filter(|e| e.source() == key || e.target() == key)
            .map(|e| e.weight().id.clone())
            .collect();
        for edge_id in orphaned {
            self.edge_keys.remove(&edge_id);
        }
        self.inner.remove_node(key).is_some()
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        let Some(key) = self.edge_keys.remove(id) else {
            return false;
        };
        self.inner.remove_edge(key).is_some()
    }

    pub fn node(&self, id: &str) -> Option<&ViewNode> {
        self.node_keys.get(id).and_then(|key| self.inner.node_weight(*key))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut ViewNode> {
        let key = *self.node_keys.get(id)?;
        self.inner.node_weight_mut(key)
    }

    pub fn edge(&self, id: &str) -> Option<&ViewEdge> {
        self.edge_keys.get(id).and_then(|key| self.inner.edge_weight(*key))
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut ViewEdge> {
        let key = *self.edge_keys.get(id)?;
        self.inner.edge_weight_mut(key)
    }

    pub fn set_node_position(&mut self, id: &str, position: Point2D<f32>) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.position = position;
                true
            },
            None => false,
        }
    }

    pub fn set_node_opacity(&mut self, id: &str, opacity: f32) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.opacity = opacity.clamp(0.0, 1.0);
                true
            },
            None => false,
        }
    }

    pub fn set_edge_opacity(&mut self, id: &str, opacity: f32) -> bool {
        match self.edge_mut(id) {
            Some(edge) => {
                edge.opacity = opacity.clamp(0.0, 1.0);
                true
            },
            None => false,
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_keys.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_keys.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ViewNode> {
        self.inner.node_weights()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &ElementId> {
        self.node_keys.keys()
    }

    /// Rendered edges joined to endpoint state.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.inner.edge_references().filter_map(|e| {
            let source = self.inner.node_weight(e.source())?;
            let target = self.inner.node_weight(e.target())?;
            Some(EdgeView { edge: e.weight(), source, target })
        })
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.node_keys.clear();
        self.edge_keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point2D<f32> {
        Point2D::new(x, y)
    }

    fn add_pair(view: &mut ViewGraph) {
        view.insert_node(&NodeRecord::new("a"), p(0.0, 0.0), 1.0);
        view.insert_node(&NodeRecord::new("b"), p(10.0, 0.0), 1.0);
        view.insert_edge(&EdgeRecord::new("a-b", "a", "b"), 1.0);
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut view = ViewGraph::new();
        add_pair(&mut view);
        assert_eq!(view.node_count(), 2);
        assert_eq!(view.edge_count(), 1);
        assert_eq!(view.node("a").unwrap().position, p(0.0, 0.0));
        assert!(view.contains_edge("a-b"));
    }

    #[test]
    fn test_duplicate_insert_keeps_existing_state() {
        let mut view = ViewGraph::new();
        let first = view.insert_node(&NodeRecord::new("a"), p(1.0, 2.0), 0.5);
        let second = view.insert_node(&NodeRecord::new("a"), p(9.0, 9.0), 1.0);
        assert_eq!(first, second);
        assert_eq!(view.node_count(), 1);
        assert_eq!(view.node("a").unwrap().position, p(1.0, 2.0));
    }

    #[test]
    fn test_edge_requires_both_endpoints() {
        let mut view = ViewGraph::new();
        view.insert_node(&NodeRecord::new("a"), p(0.0, 0.0), 1.0);
        assert!(view.insert_edge(&EdgeRecord::new("a-x", "a", "x"), 1.0).is_none());
        assert_eq!(view.edge_count(), 0);
    }

    #[test]
    fn test_remove_node_drops_attached_edges() {
        let mut view = ViewGraph::new();
        add_pair(&mut view);
        assert!(view.remove_node("a"));
        assert_eq!(view.node_count(), 1);
        assert_eq!(view.edge_count(), 0);
        assert!(!view.contains_edge("a-b"));
        // The edge key map is cleaned up too, so re-adding works.
        view.insert_node(&NodeRecord::new("a"), p(0.0, 0.0), 1.0);
        assert!(view.insert_edge(&EdgeRecord::new("a-b", "a", "b"), 1.0).is_some());
    }

    #[test]
    fn test_remove_edge_keeps_nodes() {
        let mut view = ViewGraph::new();
        add_pair(&mut view);
        assert!(view.remove_edge("a-b"));
        assert!(!view.remove_edge("a-b"));
        assert_eq!(view.node_count(), 2);
    }

    #[test]
    fn test_opacity_clamped() {
        let mut view = ViewGraph::new();
        add_pair(&mut view);
        view.set_node_opacity("a", 3.0);
        assert_eq!(view.node("a").unwrap().opacity, 1.0);
        view.set_edge_opacity("a-b", -1.0);
        assert_eq!(view.edge("a-b").unwrap().opacity, 0.0);
    }

    #[test]
    fn test_edges_iterator_joins_endpoints() {
        let mut view = ViewGraph::new();
        add_pair(&mut view);
        let views: Vec<_> = view.edges().collect();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].source.id, "a");
        assert_eq!(views[0].target.id, "b");
        assert_eq!(views[0].edge.id, "a-b");
    }

    #[test]
    fn test_self_edge_supported() {
        let mut view = ViewGraph::new();
        view.insert_node(&NodeRecord::new("a"), p(0.0, 0.0), 1.0);
        assert!(view.insert_edge(&EdgeRecord::new("loop", "a", "a"), 1.0).is_some());
        assert!(view.remove_node("a"));
        assert_eq!(view.edge_count(), 0);
        assert!(!view.contains_edge("loop"));
    }
}
