/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The replay engine: one explicitly-passed context object owning every
//! stage of the pipeline.
//!
//! Core structures:
//! - [`ReplayEngine`]: dataset, window controller, diff engine, position
//!   store, layout, animation, renderer adapter and playback clock behind
//!   named mutators. No ambient globals; hosts hold the engine and pump it.
//!
//! The single suspension point is [`ReplayEngine::tick`]: hosts call it from
//! their frame loop (or timer) with the current `Instant`, and it advances
//! playback, collects the due window notification, refilters, diffs, lays
//! out, animates, and pushes one scene to the backend. Everything in between
//! runs to completion, so stages never observe half-applied state.
//!
//! A backend failure is terminal for the render session: playback pauses,
//! pending notifications and fades are dropped, the backend unmounts, and
//! only [`ReplayEngine::remount`] brings rendering back.

use std::time::Instant;

use euclid::default::Point2D;
use log::warn;

use crate::animation::{AnimationController, AnimationPreset};
use crate::config::EngineConfig;
use crate::dataset::{DatasetStore, LoadReport};
use crate::diff::{DiffEngine, ViewDiff, filter_window};
use crate::error::ReplayError;
use crate::events::{EngineEvent, EventHub};
use crate::glyphs::GlyphRegistry;
use crate::layout::{LayoutEngine, LayoutResolution, resolve_algorithm};
use crate::model::{ElementId, GraphElement, TimeBounds, TimeMs, parse_elements};
use crate::playback::{PlaybackClock, PlaybackState, TickOutcome};
use crate::positions::PositionStore;
use crate::render::headless::HeadlessBackend;
use crate::render::{Camera, RenderBackend, RendererAdapter, SelectionState};
use crate::view::ViewGraph;
use crate::window::{StepDirection, TimeWindow, TimeWindowController, WindowPreset};

pub struct ReplayEngine {
    config: EngineConfig,
    dataset: DatasetStore,
    windows: TimeWindowController,
    diff: DiffEngine,
    positions: PositionStore,
    layout: LayoutEngine,
    animations: AnimationController,
    adapter: RendererAdapter,
    playback: PlaybackClock,
    view: ViewGraph,
    events: EventHub,
    /// Delta for the next scene packet; consumed by the first apply after a
    /// refilter.
    pending_scene_diff: ViewDiff,
    /// Forces a refilter on the next tick even without a window change.
    recompute_requested: bool,
    halted: bool,
}

impl ReplayEngine {
    /// An engine drawing to the headless backend.
    pub fn new(config: EngineConfig) -> Result<Self, ReplayError> {
        Self::with_backend(config, Box::new(HeadlessBackend::new()))
    }

    /// An engine drawing to the supplied backend. Mount failures are
    /// constructor failures; there is no half-initialized engine.
    pub fn with_backend(
        config: EngineConfig,
        backend: Box<dyn RenderBackend>,
    ) -> Result<Self, ReplayError> {
        let mut adapter = RendererAdapter::new(backend, &config);
        adapter.mount()?;
        Ok(ReplayEngine {
            dataset: DatasetStore::new(),
            windows: TimeWindowController::from_config(&config),
            diff: DiffEngine::new(),
            positions: PositionStore::new(),
            layout: LayoutEngine::from_config(&config),
            animations: AnimationController::new(config.animation),
            adapter,
            playback: PlaybackClock::from_config(&config),
            view: ViewGraph::new(),
            events: EventHub::new(),
            pending_scene_diff: ViewDiff::default(),
            recompute_requested: false,
            halted: false,
            config,
        })
    }

    // --- loading ---

    /// Replace the dataset with already-typed elements.
    pub fn load_elements(&mut self, elements: Vec<GraphElement>) -> LoadReport {
        self.load_inner(elements, 0)
    }

    /// Replace the dataset from raw upstream JSON values. Records that do
    /// not parse count into the report's dropped total.
    pub fn load_json(&mut self, values: Vec<serde_json::Value>) -> LoadReport {
        let (elements, parse_dropped) = parse_elements(values);
        self.load_inner(elements, parse_dropped)
    }

    fn load_inner(&mut self, elements: Vec<GraphElement>, parse_dropped: usize) -> LoadReport {
        let now_wall = TimeMs::now();
        let now = Instant::now();

        let mut report = self.dataset.load(elements, now_wall);
        report.dropped += parse_dropped;

        // Positions survive a reload only for ids carried forward.
        let keep: std::collections::HashSet<ElementId> =
            self.dataset.node_ids().cloned().collect();
        self.positions.retain_ids(&keep);

        self.windows.set_bounds(report.bounds.min, report.bounds.max, now_wall, now);
        // The effective bounds may differ from the raw ones when the clock
        // policy substituted a fallback; widgets get the effective range.
        let effective = self.windows.bounds().unwrap_or(report.bounds);
        report.bounds = effective;
        self.events.emit(EngineEvent::RangeComputed { bounds: effective });
        self.events
            .emit(EngineEvent::Loaded { loaded: report.loaded, dropped: report.dropped });

        // A reload with identical bounds still changes content.
        self.recompute_requested = true;
        report
    }

    /// Accept the collaborator's "no data" signal. Previously loaded data
    /// stays; with none, the engine simply keeps presenting a valid empty
    /// state.
    pub fn mark_fetch_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.dataset.mark_fetch_failed(reason.clone());
        self.events.emit(EngineEvent::FetchFailed { reason });
    }

    // --- window control ---

    pub fn set_window(&mut self, start: TimeMs, end: TimeMs) -> bool {
        self.windows.set_window(start, end, Instant::now())
    }

    pub fn step_window(&mut self, direction: StepDirection, fraction: f64) -> bool {
        self.windows.step(direction, fraction, Instant::now())
    }

    /// Apply a named preset (`1h`, `6h`, `24h`, `7d`, `30d`, `all`).
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(preset) = WindowPreset::from_name(name) else {
            warn!("Unknown window preset {name:?}");
            return false;
        };
        self.windows.apply_preset(preset, TimeMs::now(), Instant::now())
    }

    pub fn center_drag(&mut self, delta_ratio: f64) -> bool {
        self.windows.center_drag(delta_ratio, Instant::now())
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.windows.window()
    }

    pub fn bounds(&self) -> Option<TimeBounds> {
        self.windows.bounds()
    }

    // --- playback ---

    pub fn play(&mut self) -> bool {
        if self.halted || self.windows.window().is_none() {
            return false;
        }
        let started = self.playback.play(Instant::now());
        if started {
            self.emit_playback_changed();
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        let stopped = self.playback.pause();
        if stopped {
            self.emit_playback_changed();
        }
        stopped
    }

    pub fn set_speed(&mut self, speed: f64) -> bool {
        let changed = self.playback.set_speed(speed, Instant::now());
        if changed {
            self.emit_playback_changed();
        }
        changed
    }

    pub fn set_tick_interval_ms(&mut self, interval_ms: u64) -> bool {
        let changed = self.playback.set_tick_interval_ms(interval_ms, Instant::now());
        if changed {
            self.emit_playback_changed();
        }
        changed
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    // --- visual configuration ---

    pub fn set_animation_preset(&mut self, preset: AnimationPreset) {
        self.animations.set_preset(preset);
    }

    /// Resolve and install a layout algorithm by name. Unknown names keep
    /// the current algorithm and report the fallback.
    pub fn set_layout_algorithm(&mut self, name: &str) -> LayoutResolution {
        let resolution = resolve_algorithm(name, self.layout.algorithm());
        self.layout.set_algorithm(resolution.resolved);
        resolution
    }

    pub fn glyphs_mut(&mut self) -> &mut GlyphRegistry {
        self.adapter.glyphs_mut()
    }

    // --- pointer input ---

    pub fn pointer_moved(&mut self, screen: Point2D<f32>) {
        self.adapter.pointer_moved(&mut self.view, screen);
    }

    pub fn pointer_pressed(&mut self, screen: Point2D<f32>, multi: bool) {
        self.adapter.pointer_pressed(&self.view, screen, multi);
    }

    pub fn pointer_released(&mut self, screen: Point2D<f32>) {
        self.adapter.pointer_released(&mut self.view, &mut self.positions, screen);
    }

    pub fn on_node_hover(&mut self, cb: impl FnMut(Option<&ElementId>) + 'static) {
        self.adapter.on_node_hover(cb);
    }

    pub fn on_node_click(&mut self, cb: impl FnMut(&ElementId) + 'static) {
        self.adapter.on_node_click(cb);
    }

    pub fn on_node_drag_start(&mut self, cb: impl FnMut(&ElementId) + 'static) {
        self.adapter.on_node_drag_start(cb);
    }

    pub fn on_node_drag_move(&mut self, cb: impl FnMut(&ElementId, Point2D<f32>) + 'static) {
        self.adapter.on_node_drag_move(cb);
    }

    pub fn on_node_drag_end(&mut self, cb: impl FnMut(&ElementId, Point2D<f32>) + 'static) {
        self.adapter.on_node_drag_end(cb);
    }

    pub fn on_edge_click(&mut self, cb: impl FnMut(&ElementId) + 'static) {
        self.adapter.on_edge_click(cb);
    }

    // --- the pump ---

    /// Advance the whole engine to `now`.
    ///
    /// Stage order: playback tick, window notification, refilter/diff,
    /// layout for new nodes, animation transitions, then a single scene
    /// apply. A halted session ticks as a no-op.
    pub fn tick(&mut self, now: Instant) -> Result<(), ReplayError> {
        if self.halted {
            return Ok(());
        }

        if self.playback.advance(&mut self.windows, now) == TickOutcome::Completed {
            self.emit_playback_changed();
        }

        let mut scene_dirty = false;

        let due_window = match self.windows.poll(now) {
            Some(change) => {
                self.events.emit(EngineEvent::WindowChanged {
                    window: change.window,
                    revision: change.revision,
                });
                self.recompute_requested = false;
                Some(change.window)
            },
            None if self.recompute_requested => {
                self.recompute_requested = false;
                self.windows.window()
            },
            None => None,
        };

        if let Some(window) = due_window {
            let filtered = filter_window(&self.dataset, &window);
            let diff = self.diff.apply(&filtered);
            if !diff.is_empty() {
                self.layout.place_new(&filtered, &mut self.positions);
                self.animations.apply_diff(&diff, &mut self.view, &self.positions, now);
                self.pending_scene_diff = diff;
                scene_dirty = true;
            }
        }

        if !self.animations.is_idle() {
            self.animations.tick(now, &mut self.view);
            scene_dirty = true;
        }

        if scene_dirty {
            let diff = std::mem::take(&mut self.pending_scene_diff);
            if let Err(e) = self.adapter.load_elements(&self.view, &diff) {
                self.fail_render_session(e.to_string());
                return Err(e);
            }
        }
        Ok(())
    }

    /// Redraw the current state without refiltering.
    pub fn refresh(&mut self) -> Result<(), ReplayError> {
        if self.halted {
            return Err(ReplayError::RenderBackend(
                "render session halted; remount required".to_string(),
            ));
        }
        let result = self
            .adapter
            .load_elements(&self.view, &ViewDiff::default())
            .and_then(|()| self.adapter.refresh());
        if let Err(e) = result {
            self.fail_render_session(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    // --- lifecycle ---

    /// Stop playback, drop pending notifications and fades, release
    /// subscriptions and unmount the backend.
    pub fn teardown(&mut self) {
        if self.playback.pause() {
            self.emit_playback_changed();
        }
        self.windows.cancel_pending();
        self.animations.clear();
        self.adapter.teardown();
        self.halted = true;
    }

    /// Replace the backend and bring a halted session back. The view is
    /// rebuilt from scratch on the next tick; positions, camera, selection
    /// and the active window all survive.
    pub fn remount(&mut self, backend: Box<dyn RenderBackend>) -> Result<(), ReplayError> {
        self.adapter.replace_backend(backend)?;
        self.halted = false;
        self.view.clear();
        self.diff.reset();
        self.animations.clear();
        self.recompute_requested = true;
        Ok(())
    }

    fn fail_render_session(&mut self, reason: String) {
        warn!("Render backend failed: {reason}; tearing down the render session");
        if self.playback.pause() {
            self.emit_playback_changed();
        }
        self.windows.cancel_pending();
        self.animations.clear();
        self.adapter.teardown();
        self.halted = true;
        self.events.emit(EngineEvent::BackendFailed { reason });
    }

    fn emit_playback_changed(&self) {
        self.events.emit(EngineEvent::PlaybackChanged { state: self.playback.state() });
    }

    // --- accessors ---

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn dataset(&self) -> &DatasetStore {
        &self.dataset
    }

    pub fn view(&self) -> &ViewGraph {
        &self.view
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    /// Explicit reset: the next refilter lays every node out afresh.
    pub fn reset_positions(&mut self) {
        self.positions.clear();
    }

    pub fn camera(&self) -> &Camera {
        self.adapter.camera()
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        self.adapter.camera_mut()
    }

    pub fn selection(&self) -> &SelectionState {
        self.adapter.selection()
    }

    pub fn backend_name(&self) -> &str {
        self.adapter.backend_name()
    }

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.events.drain()
    }

    pub fn event_receiver(&self) -> crossbeam_channel::Receiver<EngineEvent> {
        self.events.receiver()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
