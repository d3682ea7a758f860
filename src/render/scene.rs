/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serializable scene snapshots handed to drawing backends.
//!
//! A packet is the full visible state for one frame plus the id-level delta
//! since the previous frame, so paint-everything backends and incremental
//! backends can both consume it. Element order is sorted by id so repeated
//! derivations of the same view byte-compare equal.

use euclid::default::{Point2D, Vector2D};
use serde::Serialize;

use crate::diff::ViewDiff;
use crate::glyphs::GlyphRegistry;
use crate::model::ElementId;
use crate::view::ViewGraph;

use super::{Camera, SelectionState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub id: ElementId,
    pub label: String,
    pub position: Point2D<f32>,
    pub glyph_symbol: char,
    pub glyph_tint: (u8, u8, u8),
    pub glyph_scale: f32,
    pub opacity: f32,
    pub selected: bool,
    pub hovered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEdge {
    pub id: ElementId,
    pub source_id: ElementId,
    pub target_id: ElementId,
    pub from: Point2D<f32>,
    pub to: Point2D<f32>,
    pub opacity: f32,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraState {
    pub pan: Vector2D<f32>,
    pub zoom: f32,
}

/// Ids that entered or left the view since the previous packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneDelta {
    pub added: Vec<ElementId>,
    pub removed: Vec<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenePacket {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub camera: CameraState,
    pub delta: SceneDelta,
}

pub fn derive_scene(
    view: &ViewGraph,
    camera: &Camera,
    selection: &SelectionState,
    hovered: Option<&ElementId>,
    glyphs: &GlyphRegistry,
    diff: &ViewDiff,
) -> ScenePacket {
    let mut nodes: Vec<SceneNode> = view
        .nodes()
        .map(|node| {
            let glyph = glyphs.resolve(&node.category).glyph;
            SceneNode {
                id: node.id.clone(),
                label: node.label.clone(),
                position: node.position,
                glyph_symbol: glyph.symbol,
                glyph_tint: glyph.tint_rgb,
                glyph_scale: glyph.scale,
                opacity: node.opacity,
                selected: selection.contains(&node.id),
                hovered: hovered == Some(&node.id),
            }
        })
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<SceneEdge> = view
        .edges()
        .map(|ev| SceneEdge {
            id: ev.edge.id.clone(),
            source_id: ev.source.id.clone(),
            target_id: ev.target.id.clone(),
            from: ev.source.position,
            to: ev.target.position,
            opacity: ev.edge.opacity,
            selected: selection.contains(&ev.edge.id),
        })
        .collect();
    edges.sort_by(|a, b| a.id.cmp(&b.id));

    ScenePacket {
        nodes,
        edges,
        camera: camera.state(),
        delta: SceneDelta { added: diff.added_ids(), removed: diff.removed_ids() },
    }
}
