/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Session-scoped node position memory.
//!
//! One coordinate per node id, written by the layout engine for newly-seen
//! nodes and overwritten on drag-end. Window filtering never clears it: a
//! node leaving and later re-entering the window reappears exactly where it
//! was. The only ways an entry dies are a dataset reload that does not carry
//! the id forward ([`PositionStore::retain_ids`]) and the explicit reset.
//!
//! There is deliberately no eviction beyond that; `len` is exposed so a host
//! can watch growth over very long sessions.

use std::collections::{HashMap, HashSet};

use euclid::default::Point2D;

use crate::model::ElementId;

#[derive(Debug, Default, Clone)]
pub struct PositionStore {
    positions: HashMap<ElementId, Point2D<f32>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Point2D<f32>> {
        self.positions.get(id).copied()
    }

    pub fn set(&mut self, id: impl Into<ElementId>, position: Point2D<f32>) {
        self.positions.insert(id.into(), position);
    }

    pub fn has(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Point2D<f32>> {
        self.positions.remove(id)
    }

    /// Reload rule: keep only ids the new dataset carries forward.
    pub fn retain_ids(&mut self, keep: &HashSet<ElementId>) {
        self.positions.retain(|id, _| keep.contains(id));
    }

    /// Explicit reset. The next layout pass repositions everything.
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
