/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Coordinate assignment for nodes without a persisted position.
//!
//! The layout engine never moves a node that already has a coordinate in the
//! position store; those act as fixed anchors. Two selectable families:
//! force-directed (seeded, otherwise non-deterministic) and deterministic
//! placement (circular, grid, jittered-radial) for large graphs or
//! lightweight rendering. Algorithm names resolve through
//! [`resolve_algorithm`], degrading to a fallback for unknown names.

mod force;

pub use force::ForceParams;

use euclid::default::{Point2D, Size2D};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::diff::FilteredView;
use crate::model::ElementId;
use crate::positions::PositionStore;

/// Golden angle in radians; spreads radial placements without overlap bands.
const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlgorithm {
    ForceDirected,
    Circular,
    Grid,
    JitteredRadial,
}

impl LayoutAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutAlgorithm::ForceDirected => "force-directed",
            LayoutAlgorithm::Circular => "circular",
            LayoutAlgorithm::Grid => "grid",
            LayoutAlgorithm::JitteredRadial => "jittered-radial",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "force" | "force-directed" => Some(LayoutAlgorithm::ForceDirected),
            "circular" | "circle" => Some(LayoutAlgorithm::Circular),
            "grid" => Some(LayoutAlgorithm::Grid),
            "radial" | "jittered-radial" => Some(LayoutAlgorithm::JitteredRadial),
            _ => None,
        }
    }
}

/// Outcome of resolving an algorithm name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResolution {
    pub requested: String,
    pub resolved: LayoutAlgorithm,
    pub fallback_used: bool,
}

/// Resolve a requested name, falling back with a warning when unknown.
pub fn resolve_algorithm(name: &str, fallback: LayoutAlgorithm) -> LayoutResolution {
    match LayoutAlgorithm::from_name(name) {
        Some(resolved) => LayoutResolution {
            requested: name.to_string(),
            resolved,
            fallback_used: false,
        },
        None => {
            warn!("Unknown layout algorithm {name:?}, falling back to {}", fallback.name());
            LayoutResolution {
                requested: name.to_string(),
                resolved: fallback,
                fallback_used: true,
            }
        },
    }
}

pub struct LayoutEngine {
    algorithm: LayoutAlgorithm,
    params: ForceParams,
    seed: Option<u64>,
    canvas: Size2D<f32>,
}

impl LayoutEngine {
    pub fn new(
        algorithm: LayoutAlgorithm,
        params: ForceParams,
        seed: Option<u64>,
        canvas: Size2D<f32>,
    ) -> Self {
        LayoutEngine { algorithm, params, seed, canvas }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.layout, config.force, config.layout_seed, config.canvas)
    }

    pub fn algorithm(&self) -> LayoutAlgorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: LayoutAlgorithm) {
        self.algorithm = algorithm;
    }

    /// Assign coordinates to every node in `view` lacking a persisted
    /// position. Returns how many positions were written.
    ///
    /// Each write re-checks `has` first: a drag that completed while the
    /// solve ran owns the coordinate and must not be clobbered.
    pub fn place_new(&self, view: &FilteredView, positions: &mut PositionStore) -> usize {
        let targets: Vec<ElementId> =
            view.nodes.keys().filter(|id| !positions.has(id)).cloned().collect();
        if targets.is_empty() {
            return 0;
        }

        let placements = match self.algorithm {
            LayoutAlgorithm::ForceDirected => {
                force::solve(view, positions, &targets, self.params, self.seed, self.canvas)
            },
            LayoutAlgorithm::Circular => self.circular(&targets),
            LayoutAlgorithm::Grid => self.grid(&targets),
            LayoutAlgorithm::JitteredRadial => self.jittered_radial(&targets),
        };

        let mut written = 0;
        for (id, position) in placements {
            if !positions.has(&id) {
                positions.set(id, position);
                written += 1;
            }
        }
        debug!("Layout {} placed {written} new nodes", self.algorithm.name());
        written
    }

    fn center(&self) -> Point2D<f32> {
        Point2D::new(self.canvas.width / 2.0, self.canvas.height / 2.0)
    }

    fn circular(&self, targets: &[ElementId]) -> Vec<(ElementId, Point2D<f32>)> {
        let center = self.center();
        let radius = 0.4 * self.canvas.width.min(self.canvas.height);
        let n = targets.len() as f32;
        targets
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let angle = (i as f32 / n) * std::f32::consts::TAU;
                let position = Point2D::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                );
                (id.clone(), position)
            })
            .collect()
    }

    fn grid(&self, targets: &[ElementId]) -> Vec<(ElementId, Point2D<f32>)> {
        let cols = (targets.len() as f32).sqrt().ceil().max(1.0) as usize;
        let rows = targets.len().div_ceil(cols);
        let spacing_x = self.canvas.width / (cols as f32 + 1.0);
        let spacing_y = self.canvas.height / (rows as f32 + 1.0);
        targets
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let col = i % cols;
                let row = i / cols;
                let position = Point2D::new(
                    spacing_x * (col as f32 + 1.0),
                    spacing_y * (row as f32 + 1.0),
                );
                (id.clone(), position)
            })
            .collect()
    }

    /// Phyllotaxis spiral with a per-id jitter, deterministic for a given
    /// target order.
    fn jittered_radial(&self, targets: &[ElementId]) -> Vec<(ElementId, Point2D<f32>)> {
        let center = self.center();
        let n = (targets.len() as f32).sqrt().max(1.0);
        let spread = 0.45 * self.canvas.width.min(self.canvas.height) / n;
        let jitter_radius = spread * 0.25;
        targets
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let angle = i as f32 * GOLDEN_ANGLE;
                let radius = spread * (i as f32).sqrt();
                let (jx, jy) = id_jitter(id, jitter_radius);
                let position = Point2D::new(
                    center.x + radius * angle.cos() + jx,
                    center.y + radius * angle.sin() + jy,
                );
                (id.clone(), position)
            })
            .collect()
    }
}

/// Small deterministic offset derived from the id alone.
fn id_jitter(id: &str, radius: f32) -> (f32, f32) {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let bits = hasher.finish();
    let a = ((bits & 0xFFFF) as f32 / 65_535.0) * 2.0 - 1.0;
    let b = (((bits >> 16) & 0xFFFF) as f32 / 65_535.0) * 2.0 - 1.0;
    (a * radius, b * radius)
}
