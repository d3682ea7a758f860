/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Force-directed placement with velocity integration.
//!
//! Nodes that already hold a persisted coordinate participate as fixed
//! anchors; only the new nodes move. New nodes seed near the mean of their
//! anchored neighbours when one exists, otherwise near the canvas centre
//! with a seeded jitter, so connected arrivals land close to their cluster.

use std::collections::HashMap;

use euclid::default::{Point2D, Size2D, Vector2D};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::diff::FilteredView;
use crate::model::ElementId;
use crate::positions::PositionStore;

/// Distance floor to keep force terms finite for coincident nodes.
const MIN_DISTANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceParams {
    pub c_repulse: f32,
    pub c_attract: f32,
    pub k_scale: f32,
    pub dt: f32,
    pub max_step: f32,
    pub damping: f32,
    pub gravity: f32,
    pub cooling: f32,
    pub iterations: u32,
}

impl Default for ForceParams {
    fn default() -> Self {
        ForceParams {
            c_repulse: 0.28,
            c_attract: 0.22,
            k_scale: 0.42,
            dt: 0.03,
            max_step: 3.0,
            damping: 0.55,
            gravity: 0.18,
            cooling: 0.95,
            iterations: 120,
        }
    }
}

/// Run the solver and return final coordinates for `targets` only.
pub(crate) fn solve(
    view: &FilteredView,
    positions: &PositionStore,
    targets: &[ElementId],
    params: ForceParams,
    seed: Option<u64>,
    canvas: Size2D<f32>,
) -> Vec<(ElementId, Point2D<f32>)> {
    let ids: Vec<&ElementId> = view.nodes.keys().collect();
    let index: HashMap<&ElementId, usize> =
        ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let n = ids.len();
    if n == 0 {
        return Vec::new();
    }

    let mut mobile = vec![false; n];
    for id in targets {
        if let Some(&i) = index.get(id) {
            mobile[i] = true;
        }
    }

    let edges: Vec<(usize, usize)> = view
        .edges
        .values()
        .filter_map(|edge| {
            let a = *index.get(&edge.source_id)?;
            let b = *index.get(&edge.target_id)?;
            (a != b).then_some((a, b))
        })
        .collect();

    let center = Point2D::new(canvas.width / 2.0, canvas.height / 2.0);
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let mut pos = seed_positions(&ids, positions, &mobile, &edges, center, canvas, &mut rng);
    let mut vel = vec![Vector2D::zero(); n];

    let area = canvas.width * canvas.height;
    let k = params.k_scale * (area / n as f32).sqrt();
    let mut temp = 0.1 * canvas.width.min(canvas.height);

    for _ in 0..params.iterations {
        let mut disp = vec![Vector2D::<f32>::zero(); n];

        for i in 0..n {
            for j in (i + 1)..n {
                if !mobile[i] && !mobile[j] {
                    continue;
                }
                let delta = pos[i] - pos[j];
                let dist = delta.length().max(MIN_DISTANCE);
                let unit = delta / dist;
                let repulse = unit * (params.c_repulse * k * k / dist);
                disp[i] += repulse;
                disp[j] -= repulse;
            }
        }

        for &(a, b) in &edges {
            if !mobile[a] && !mobile[b] {
                continue;
            }
            let delta = pos[a] - pos[b];
            let dist = delta.length().max(MIN_DISTANCE);
            let unit = delta / dist;
            let attract = unit * (params.c_attract * dist * dist / k);
            disp[a] -= attract;
            disp[b] += attract;
        }

        for i in 0..n {
            if !mobile[i] {
                continue;
            }
            disp[i] += (center - pos[i]) * params.gravity;
            vel[i] = (vel[i] + disp[i] * params.dt) * params.damping;
            let speed = vel[i].length();
            let cap = params.max_step.min(temp);
            if speed > cap {
                vel[i] = vel[i] * (cap / speed);
            }
            pos[i] += vel[i];
        }
        temp *= params.cooling;
    }

    targets
        .iter()
        .filter_map(|id| {
            let &i = index.get(id)?;
            let clamped = Point2D::new(
                pos[i].x.clamp(0.0, canvas.width),
                pos[i].y.clamp(0.0, canvas.height),
            );
            Some((id.clone(), clamped))
        })
        .collect()
}

fn seed_positions(
    ids: &[&ElementId],
    positions: &PositionStore,
    mobile: &[bool],
    edges: &[(usize, usize)],
    center: Point2D<f32>,
    canvas: Size2D<f32>,
    rng: &mut StdRng,
) -> Vec<Point2D<f32>> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for &(a, b) in edges {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let spread = 0.25 * canvas.width.min(canvas.height);
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            if !mobile[i]
                && let Some(anchored) = positions.get(id)
            {
                return anchored;
            }
            let mut sum = Vector2D::zero();
            let mut anchored_neighbors = 0;
            for &j in &adjacency[i] {
                if let Some(p) = positions.get(ids[j]) {
                    sum += p.to_vector();
                    anchored_neighbors += 1;
                }
            }
            let jitter = Vector2D::new(
                rng.gen_range(-1.0_f32..1.0),
                rng.gen_range(-1.0_f32..1.0),
            );
            if anchored_neighbors > 0 {
                let mean = (sum / anchored_neighbors as f32).to_point();
                mean + jitter * (spread * 0.1)
            } else {
                center + jitter * spread
            }
        })
        .collect()
}
