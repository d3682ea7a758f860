/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spatial index for node hit-testing.
//!
//! Nodes are indexed by their world-space position so pointer picking can
//! use an R*-tree query instead of a full O(n) node scan. Queries operate
//! in world space; callers convert screen coordinates through the camera
//! before querying.

use euclid::default::Point2D;
use rstar::{AABB, RTree, RTreeObject};

use crate::model::ElementId;

/// A node entry stored in the R*-tree.
struct IndexedNode {
    envelope: AABB<[f32; 2]>,
    center: Point2D<f32>,
    radius: f32,
    id: ElementId,
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

pub(crate) struct NodeSpatialIndex {
    tree: RTree<IndexedNode>,
}

impl NodeSpatialIndex {
    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index from an iterator of `(id, world_position, radius)` tuples.
    pub fn build(nodes: impl Iterator<Item = (ElementId, Point2D<f32>, f32)>) -> Self {
        let entries: Vec<_> = nodes
            .map(|(id, pos, radius)| IndexedNode {
                envelope: AABB::from_corners(
                    [pos.x - radius, pos.y - radius],
                    [pos.x + radius, pos.y + radius],
                ),
                center: pos,
                radius,
                id,
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    /// Nearest node whose disc (own radius widened by `slop`) covers `point`.
    ///
    /// Ties on distance resolve to the lexicographically-smallest id so picks
    /// are deterministic for overlapping nodes.
    pub fn node_at(&self, point: Point2D<f32>, slop: f32) -> Option<ElementId> {
        let probe = AABB::from_corners(
            [point.x - slop, point.y - slop],
            [point.x + slop, point.y + slop],
        );
        self.tree
            .locate_in_envelope_intersecting(&probe)
            .filter_map(|n| {
                let distance = (n.center - point).length();
                (distance <= n.radius + slop).then_some((distance, &n.id))
            })
            .min_by(|(da, ia), (db, ib)| {
                da.partial_cmp(db).unwrap_or(std::cmp::Ordering::Equal).then_with(|| ia.cmp(ib))
            })
            .map(|(_, id)| id.clone())
    }
}
