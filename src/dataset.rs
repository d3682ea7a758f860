/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! In-memory dataset store.
//!
//! Holds the full element set the external collaborator fetched, keyed by id,
//! and computes the dataset-wide timestamp range on every load. Malformed
//! elements and edges with unknown endpoints are dropped and counted rather
//! than failing the load; a fetch failure upstream leaves the previous
//! dataset in place.

use std::collections::BTreeMap;

use log::warn;

use crate::config::DEFAULT_FALLBACK_SPAN_MS;
use crate::model::{EdgeRecord, ElementId, GraphElement, NodeRecord, TimeBounds, TimeMs};

/// Widening applied when every timestamp in the dataset is identical, so a
/// valid window (start < end) can still exist over it.
const DEGENERATE_RANGE_WIDEN_MS: u64 = 3_600_000;

/// Outcome of a [`DatasetStore::load`], surfaced to the host as the non-fatal
/// malformed-input warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub dropped: usize,
    pub bounds: TimeBounds,
}

#[derive(Debug, Default)]
pub struct DatasetStore {
    nodes: BTreeMap<ElementId, NodeRecord>,
    edges: BTreeMap<ElementId, EdgeRecord>,
    bounds: Option<TimeBounds>,
    loads: u64,
    fetch_error: Option<String>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full element set.
    ///
    /// Drops, with a warning, anything that cannot be rendered: elements with
    /// empty required ids, edges whose endpoints are not in the loaded node
    /// set, and duplicate ids (last occurrence wins). Computes the timestamp
    /// range over elements that carry one, falling back to a fixed-width
    /// range ending at the supplied wall clock when none do.
    pub fn load(&mut self, elements: Vec<GraphElement>, now: TimeMs) -> LoadReport {
        let mut nodes: BTreeMap<ElementId, NodeRecord> = BTreeMap::new();
        let mut pending_edges: Vec<EdgeRecord> = Vec::new();
        let mut dropped = 0usize;

        for element in elements {
            if !element.is_well_formed() {
                warn!("Dropping element with missing required fields: {:?}", element.id());
                dropped += 1;
                continue;
            }
            match element {
                GraphElement::Node(node) => {
                    if nodes.insert(node.id.clone(), node).is_some() {
                        dropped += 1;
                    }
                },
                GraphElement::Edge(edge) => pending_edges.push(edge),
            }
        }

        let mut edges: BTreeMap<ElementId, EdgeRecord> = BTreeMap::new();
        for edge in pending_edges {
            if !nodes.contains_key(&edge.source_id) || !nodes.contains_key(&edge.target_id) {
                warn!(
                    "Dropping edge {} with unknown endpoint ({} -> {})",
                    edge.id, edge.source_id, edge.target_id
                );
                dropped += 1;
                continue;
            }
            if edges.insert(edge.id.clone(), edge).is_some() {
                dropped += 1;
            }
        }

        let bounds = compute_bounds(&nodes, &edges, now);
        let loaded = nodes.len() + edges.len();
        if dropped > 0 {
            warn!("Dataset load kept {loaded} elements, dropped {dropped}");
        }

        self.nodes = nodes;
        self.edges = edges;
        self.bounds = Some(bounds);
        self.loads += 1;
        self.fetch_error = None;

        LoadReport { loaded, dropped, bounds }
    }

    /// Record that the upstream fetch failed. The previous dataset stays
    /// available; an engine that never loaded presents a valid empty state.
    pub fn mark_fetch_failed(&mut self, reason: impl Into<String>) {
        self.fetch_error = Some(reason.into());
    }

    pub fn fetch_error(&self) -> Option<&str> {
        self.fetch_error.as_deref()
    }

    /// Read-only snapshot of the full set, nodes before edges, sorted by id.
    pub fn all(&self) -> Vec<GraphElement> {
        let mut out = Vec::with_capacity(self.nodes.len() + self.edges.len());
        out.extend(self.nodes.values().cloned().map(GraphElement::Node));
        out.extend(self.edges.values().cloned().map(GraphElement::Edge));
        out
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.edges.values()
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &ElementId> {
        self.nodes.keys()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Bounds of the most recent load; `None` before the first load.
    pub fn bounds(&self) -> Option<TimeBounds> {
        self.bounds
    }

    /// Number of completed loads. The range-computed notification fires once
    /// per increment.
    pub fn load_count(&self) -> u64 {
        self.loads
    }
}

fn compute_bounds(
    nodes: &BTreeMap<ElementId, NodeRecord>,
    edges: &BTreeMap<ElementId, EdgeRecord>,
    now: TimeMs,
) -> TimeBounds {
    let timestamps = nodes
        .values()
        .filter_map(|n| n.timestamp)
        .chain(edges.values().filter_map(|e| e.timestamp));

    let mut min: Option<TimeMs> = None;
    let mut max: Option<TimeMs> = None;
    for ts in timestamps {
        min = Some(min.map_or(ts, |m| m.min(ts)));
        max = Some(max.map_or(ts, |m| m.max(ts)));
    }

    match (min, max) {
        (Some(min), Some(max)) if min == max => {
            TimeBounds::new(min, max.saturating_add(DEGENERATE_RANGE_WIDEN_MS))
        },
        (Some(min), Some(max)) => TimeBounds::new(min, max),
        _ => TimeBounds::new(now.saturating_sub(DEFAULT_FALLBACK_SPAN_MS), now),
    }
}
