/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Rendering seam and pointer interaction.
//!
//! Core structures:
//! - [`RenderBackend`]: the swappable drawing surface. Backends receive
//!   whole [`scene::ScenePacket`]s and report failures as errors instead of
//!   panicking into the host.
//! - [`RendererAdapter`]: owns one backend plus everything interaction
//!   related: camera, selection, hover, drag tracking, hit-testing and the
//!   host callback set.
//! - [`Camera`]: pan/zoom with clamped zoom. Data updates never touch it.
//!
//! Interaction rules: a press on a node arms a pending drag; it becomes a
//! real drag only after the pointer travels the configured threshold,
//! otherwise the release counts as a click. Drag moves update the view for
//! visual feedback only; the position store is written exactly once, on
//! drag-end.

pub mod headless;
pub mod scene;
mod spatial_index;

use std::collections::HashSet;

use euclid::default::{Point2D, Vector2D};

use crate::config::EngineConfig;
use crate::diff::ViewDiff;
use crate::error::ReplayError;
use crate::glyphs::GlyphRegistry;
use crate::model::ElementId;
use crate::positions::PositionStore;
use crate::view::ViewGraph;

use scene::{CameraState, ScenePacket, derive_scene};
use spatial_index::NodeSpatialIndex;

/// A drawing surface the adapter can mount, feed scenes to, and unmount.
pub trait RenderBackend {
    fn mount(&mut self) -> Result<(), ReplayError>;
    fn apply(&mut self, scene: &ScenePacket) -> Result<(), ReplayError>;
    fn refresh(&mut self) -> Result<(), ReplayError>;
    fn unmount(&mut self);
    fn name(&self) -> &str;
}

/// Camera state with zoom bounds enforcement.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pan: Vector2D<f32>,
    zoom: f32,
    zoom_min: f32,
    zoom_max: f32,
}

impl Camera {
    pub fn new(zoom_min: f32, zoom_max: f32) -> Self {
        Camera { pan: Vector2D::zero(), zoom: 1.0, zoom_min, zoom_max }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.zoom_min, config.zoom_max)
    }

    pub fn pan(&self) -> Vector2D<f32> {
        self.pan
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Clamp a zoom value to the allowed range.
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = self.clamp(zoom);
    }

    pub fn set_pan(&mut self, pan: Vector2D<f32>) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, delta: Vector2D<f32>) {
        self.pan += delta;
    }

    pub fn screen_to_world(&self, screen: Point2D<f32>) -> Point2D<f32> {
        (screen - self.pan) / self.zoom
    }

    pub fn world_to_screen(&self, world: Point2D<f32>) -> Point2D<f32> {
        world * self.zoom + self.pan
    }

    pub fn state(&self) -> CameraState {
        CameraState { pan: self.pan, zoom: self.zoom }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

/// Canonical selection state, keyed by element id.
///
/// Wraps the selected set with explicit ordering metadata so consumers can
/// reason about selection changes deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    ids: HashSet<ElementId>,
    order: Vec<ElementId>,
    primary: Option<ElementId>,
    revision: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic revision incremented whenever the selection changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Primary selected element (most recently selected).
    pub fn primary(&self) -> Option<&ElementId> {
        self.primary.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in the order they were added.
    pub fn selected_ids(&self) -> &[ElementId] {
        &self.order
    }

    pub fn select(&mut self, id: ElementId, multi_select: bool) {
        if multi_select {
            if self.ids.remove(&id) {
                self.order.retain(|existing| *existing != id);
                self.primary = self.order.last().cloned();
                self.revision = self.revision.saturating_add(1);
            } else if self.ids.insert(id.clone()) {
                self.order.push(id.clone());
                self.primary = Some(id);
                self.revision = self.revision.saturating_add(1);
            }
            return;
        }

        if self.ids.len() == 1 && self.ids.contains(&id) && self.primary.as_ref() == Some(&id) {
            self.ids.clear();
            self.order.clear();
            self.primary = None;
            self.revision = self.revision.saturating_add(1);
            return;
        }

        self.ids.clear();
        self.order.clear();
        self.ids.insert(id.clone());
        self.order.push(id.clone());
        self.primary = Some(id);
        self.revision = self.revision.saturating_add(1);
    }

    pub fn clear(&mut self) {
        if self.ids.is_empty() && self.primary.is_none() {
            return;
        }
        self.ids.clear();
        self.order.clear();
        self.primary = None;
        self.revision = self.revision.saturating_add(1);
    }

    /// Drop selected ids that no longer pass `keep`. One revision bump for
    /// the whole sweep.
    pub fn retain_present(&mut self, keep: impl Fn(&ElementId) -> bool) {
        let before = self.ids.len();
        self.ids.retain(&keep);
        if self.ids.len() == before {
            return;
        }
        self.order.retain(|id| self.ids.contains(id));
        self.primary = self.order.last().cloned();
        self.revision = self.revision.saturating_add(1);
    }
}

pub type HoverCallback = Box<dyn FnMut(Option<&ElementId>)>;
pub type ElementCallback = Box<dyn FnMut(&ElementId)>;
pub type DragCallback = Box<dyn FnMut(&ElementId, Point2D<f32>)>;

#[derive(Default)]
struct CallbackSet {
    node_hover: Option<HoverCallback>,
    node_click: Option<ElementCallback>,
    node_drag_start: Option<ElementCallback>,
    node_drag_move: Option<DragCallback>,
    node_drag_end: Option<DragCallback>,
    edge_click: Option<ElementCallback>,
}

impl CallbackSet {
    fn release(&mut self) {
        *self = CallbackSet::default();
    }
}

enum DragState {
    Idle,
    Pending { id: ElementId, origin: Point2D<f32>, multi: bool },
    Dragging { id: ElementId },
}

pub struct RendererAdapter {
    backend: Box<dyn RenderBackend>,
    camera: Camera,
    selection: SelectionState,
    hovered: Option<ElementId>,
    drag: DragState,
    callbacks: CallbackSet,
    index: NodeSpatialIndex,
    glyphs: GlyphRegistry,
    node_radius: f32,
    pick_radius: f32,
    drag_threshold: f32,
    mounted: bool,
}

impl RendererAdapter {
    pub fn new(backend: Box<dyn RenderBackend>, config: &EngineConfig) -> Self {
        RendererAdapter {
            backend,
            camera: Camera::from_config(config),
            selection: SelectionState::new(),
            hovered: None,
            drag: DragState::Idle,
            callbacks: CallbackSet::default(),
            index: NodeSpatialIndex::empty(),
            glyphs: GlyphRegistry::default(),
            node_radius: config.node_radius,
            pick_radius: config.pick_radius,
            drag_threshold: config.drag_threshold,
            mounted: false,
        }
    }

    pub fn mount(&mut self) -> Result<(), ReplayError> {
        if self.mounted {
            return Ok(());
        }
        self.backend.mount()?;
        self.mounted = true;
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Push the current view to the backend as one scene packet.
    ///
    /// Prunes hover, selection and drag state referring to elements no
    /// longer in the view, rebuilds the hit-test index, and leaves the
    /// camera alone.
    pub fn load_elements(&mut self, view: &ViewGraph, diff: &ViewDiff) -> Result<(), ReplayError> {
        if let Some(hovered) = &self.hovered
            && !view.contains_node(hovered)
        {
            self.hovered = None;
            if let Some(cb) = self.callbacks.node_hover.as_mut() {
                cb(None);
            }
        }
        self.selection
            .retain_present(|id| view.contains_node(id) || view.contains_edge(id));
        let drag_id = match &self.drag {
            DragState::Pending { id, .. } | DragState::Dragging { id } => Some(id.clone()),
            DragState::Idle => None,
        };
        if let Some(id) = drag_id
            && !view.contains_node(&id)
        {
            self.drag = DragState::Idle;
        }

        self.rebuild_index(view);
        let scene = derive_scene(
            view,
            &self.camera,
            &self.selection,
            self.hovered.as_ref(),
            &self.glyphs,
            diff,
        );
        self.backend.apply(&scene)
    }

    pub fn refresh(&mut self) -> Result<(), ReplayError> {
        self.backend.refresh()
    }

    pub fn pointer_moved(&mut self, view: &mut ViewGraph, screen: Point2D<f32>) {
        match std::mem::replace(&mut self.drag, DragState::Idle) {
            DragState::Pending { id, origin, multi } => {
                if (screen - origin).length() >= self.drag_threshold {
                    self.drag = DragState::Dragging { id: id.clone() };
                    if let Some(cb) = self.callbacks.node_drag_start.as_mut() {
                        cb(&id);
                    }
                    self.apply_drag(view, &id, screen);
                } else {
                    self.drag = DragState::Pending { id, origin, multi };
                }
            },
            DragState::Dragging { id } => {
                self.drag = DragState::Dragging { id: id.clone() };
                self.apply_drag(view, &id, screen);
            },
            DragState::Idle => self.update_hover(view, screen),
        }
    }

    pub fn pointer_pressed(&mut self, view: &ViewGraph, screen: Point2D<f32>, multi: bool) {
        let world = self.camera.screen_to_world(screen);
        let slop = self.pick_radius / self.camera.zoom();
        if let Some(id) = self.index.node_at(world, slop).filter(|id| view.contains_node(id)) {
            self.drag = DragState::Pending { id, origin: screen, multi };
            return;
        }
        if let Some(id) = self.edge_at(view, world, slop) {
            self.selection.select(id.clone(), multi);
            if let Some(cb) = self.callbacks.edge_click.as_mut() {
                cb(&id);
            }
            return;
        }
        if !multi {
            self.selection.clear();
        }
    }

    pub fn pointer_released(
        &mut self,
        view: &mut ViewGraph,
        positions: &mut PositionStore,
        screen: Point2D<f32>,
    ) {
        match std::mem::replace(&mut self.drag, DragState::Idle) {
            DragState::Dragging { id } => {
                let world = self.camera.screen_to_world(screen);
                view.set_node_position(&id, world);
                // The single store write for the whole gesture.
                positions.set(id.clone(), world);
                self.rebuild_index(view);
                if let Some(cb) = self.callbacks.node_drag_end.as_mut() {
                    cb(&id, world);
                }
            },
            DragState::Pending { id, multi, .. } => {
                self.selection.select(id.clone(), multi);
                if let Some(cb) = self.callbacks.node_click.as_mut() {
                    cb(&id);
                }
            },
            DragState::Idle => {},
        }
    }

    pub fn on_node_hover(&mut self, cb: impl FnMut(Option<&ElementId>) + 'static) {
        self.callbacks.node_hover = Some(Box::new(cb));
    }

    pub fn on_node_click(&mut self, cb: impl FnMut(&ElementId) + 'static) {
        self.callbacks.node_click = Some(Box::new(cb));
    }

    pub fn on_node_drag_start(&mut self, cb: impl FnMut(&ElementId) + 'static) {
        self.callbacks.node_drag_start = Some(Box::new(cb));
    }

    pub fn on_node_drag_move(&mut self, cb: impl FnMut(&ElementId, Point2D<f32>) + 'static) {
        self.callbacks.node_drag_move = Some(Box::new(cb));
    }

    pub fn on_node_drag_end(&mut self, cb: impl FnMut(&ElementId, Point2D<f32>) + 'static) {
        self.callbacks.node_drag_end = Some(Box::new(cb));
    }

    pub fn on_edge_click(&mut self, cb: impl FnMut(&ElementId) + 'static) {
        self.callbacks.edge_click = Some(Box::new(cb));
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn hovered(&self) -> Option<&ElementId> {
        self.hovered.as_ref()
    }

    pub fn glyphs_mut(&mut self) -> &mut GlyphRegistry {
        &mut self.glyphs
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Release every subscription and unmount the backend. The camera keeps
    /// its state for a later remount.
    pub fn teardown(&mut self) {
        self.callbacks.release();
        self.drag = DragState::Idle;
        self.hovered = None;
        self.index = NodeSpatialIndex::empty();
        if self.mounted {
            self.backend.unmount();
            self.mounted = false;
        }
    }

    /// Swap the drawing surface, keeping camera and selection.
    pub fn replace_backend(&mut self, backend: Box<dyn RenderBackend>) -> Result<(), ReplayError> {
        self.teardown();
        self.backend = backend;
        self.mount()
    }

    fn rebuild_index(&mut self, view: &ViewGraph) {
        self.index = NodeSpatialIndex::build(
            view.nodes().map(|n| (n.id.clone(), n.position, self.node_radius)),
        );
    }

    fn apply_drag(&mut self, view: &mut ViewGraph, id: &ElementId, screen: Point2D<f32>) {
        let world = self.camera.screen_to_world(screen);
        view.set_node_position(id, world);
        if let Some(cb) = self.callbacks.node_drag_move.as_mut() {
            cb(id, world);
        }
    }

    fn update_hover(&mut self, view: &ViewGraph, screen: Point2D<f32>) {
        let world = self.camera.screen_to_world(screen);
        let slop = self.pick_radius / self.camera.zoom();
        let hit = self.index.node_at(world, slop).filter(|id| view.contains_node(id));
        if hit != self.hovered {
            self.hovered = hit;
            if let Some(cb) = self.callbacks.node_hover.as_mut() {
                cb(self.hovered.as_ref());
            }
        }
    }

    fn edge_at(&self, view: &ViewGraph, world: Point2D<f32>, slop: f32) -> Option<ElementId> {
        let mut best: Option<(f32, ElementId)> = None;
        for ev in view.edges() {
            let distance = segment_distance(world, ev.source.position, ev.target.position);
            if distance <= slop
                && best
                    .as_ref()
                    .is_none_or(|(bd, bid)| distance < *bd || (distance == *bd && ev.edge.id < *bid))
            {
                best = Some((distance, ev.edge.id.clone()));
            }
        }
        best.map(|(_, id)| id)
    }
}

fn segment_distance(p: Point2D<f32>, a: Point2D<f32>, b: Point2D<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.square_length();
    if len_sq <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}
