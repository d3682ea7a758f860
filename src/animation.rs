/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Opacity fades for elements entering and leaving the visible graph.
//!
//! Additions insert at opacity 0 and fade in; removals fade out and detach
//! from the view only once the fade completes. The `Off` preset skips all of
//! it: inserts land at full opacity and removals detach immediately. An
//! element re-added while its fade-out is still running keeps its identity
//! and position; the pending removal is cancelled and opacity snaps to 1.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use euclid::default::Point2D;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::diff::ViewDiff;
use crate::model::{ElementId, ElementKind, GraphElement};
use crate::positions::PositionStore;
use crate::view::ViewGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPreset {
    Off,
    Fast,
    Medium,
    Slow,
    Glacial,
}

impl AnimationPreset {
    pub fn duration_ms(&self) -> u64 {
        match self {
            AnimationPreset::Off => 0,
            AnimationPreset::Fast => 200,
            AnimationPreset::Medium => 500,
            AnimationPreset::Slow => 1_000,
            AnimationPreset::Glacial => 2_000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnimationPreset::Off => "off",
            AnimationPreset::Fast => "fast",
            AnimationPreset::Medium => "medium",
            AnimationPreset::Slow => "slow",
            AnimationPreset::Glacial => "glacial",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "off" => Some(AnimationPreset::Off),
            "fast" => Some(AnimationPreset::Fast),
            "medium" => Some(AnimationPreset::Medium),
            "slow" => Some(AnimationPreset::Slow),
            "glacial" => Some(AnimationPreset::Glacial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadePhase {
    In,
    Out,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    phase: FadePhase,
    kind: ElementKind,
    started: Instant,
    duration: Duration,
    from: f32,
}

impl Fade {
    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started).as_secs_f32();
        (elapsed / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    fn opacity_at(&self, t: f32) -> f32 {
        match self.phase {
            FadePhase::In => self.from + (1.0 - self.from) * t,
            FadePhase::Out => self.from * (1.0 - t),
        }
    }
}

/// What a tick did: elements detached this tick, and whether fades remain.
#[derive(Debug, Default)]
pub struct TickReport {
    pub detached: Vec<ElementId>,
    pub animating: bool,
}

pub struct AnimationController {
    preset: AnimationPreset,
    fades: HashMap<ElementId, Fade>,
}

impl AnimationController {
    pub fn new(preset: AnimationPreset) -> Self {
        AnimationController { preset, fades: HashMap::new() }
    }

    pub fn preset(&self) -> AnimationPreset {
        self.preset
    }

    /// Change the preset for future transitions. Fades already in flight
    /// finish at the duration they started with.
    pub fn set_preset(&mut self, preset: AnimationPreset) {
        self.preset = preset;
    }

    pub fn is_idle(&self) -> bool {
        self.fades.is_empty()
    }

    /// Drop all pending fades without touching the view.
    pub fn clear(&mut self) {
        self.fades.clear();
    }

    /// Mutate the view for one diff: schedule fade-outs for removals, insert
    /// additions, cancel removals for re-added ids.
    ///
    /// Additions expect their coordinates to be in the position store
    /// already; the layout pass runs first.
    pub fn apply_diff(
        &mut self,
        diff: &ViewDiff,
        view: &mut ViewGraph,
        positions: &PositionStore,
        now: Instant,
    ) {
        let duration = Duration::from_millis(self.preset.duration_ms());

        // Removals come edges-first so endpoints outlive their edges.
        for element in &diff.removed {
            let id = element.id();
            if self.preset == AnimationPreset::Off {
                self.fades.remove(id);
                detach(view, id, element.kind());
                continue;
            }
            let from = match element.kind() {
                ElementKind::Node => view.node(id).map(|n| n.opacity),
                ElementKind::Edge => view.edge(id).map(|e| e.opacity),
            };
            let Some(from) = from else {
                self.fades.remove(id);
                continue;
            };
            self.fades.insert(
                id.clone(),
                Fade { phase: FadePhase::Out, kind: element.kind(), started: now, duration, from },
            );
        }

        // Additions come nodes-first so edges find their endpoints.
        for element in &diff.added {
            let id = element.id();
            if let Some(fade) = self.fades.get(id)
                && fade.phase == FadePhase::Out
            {
                self.fades.remove(id);
                match element.kind() {
                    ElementKind::Node => view.set_node_opacity(id, 1.0),
                    ElementKind::Edge => view.set_edge_opacity(id, 1.0),
                };
                continue;
            }

            let initial = if self.preset == AnimationPreset::Off { 1.0 } else { 0.0 };
            let inserted = match element {
                GraphElement::Node(record) => {
                    let position = positions.get(id).unwrap_or_else(|| {
                        debug!("No stored position for {id} at insert, using origin");
                        Point2D::zero()
                    });
                    view.insert_node(record, position, initial);
                    true
                },
                GraphElement::Edge(record) => view.insert_edge(record, initial).is_some(),
            };
            if inserted && self.preset != AnimationPreset::Off {
                self.fades.insert(
                    id.clone(),
                    Fade {
                        phase: FadePhase::In,
                        kind: element.kind(),
                        started: now,
                        duration,
                        from: 0.0,
                    },
                );
            }
        }
    }

    /// Advance every fade to `now`. Completed fade-outs detach their element
    /// from the view, edges before nodes.
    pub fn tick(&mut self, now: Instant, view: &mut ViewGraph) -> TickReport {
        let mut finished_out: Vec<(ElementId, ElementKind)> = Vec::new();
        let mut finished_in: Vec<(ElementId, ElementKind)> = Vec::new();

        for (id, fade) in &self.fades {
            let t = fade.progress(now);
            let opacity = fade.opacity_at(t);
            match fade.kind {
                ElementKind::Node => view.set_node_opacity(id, opacity),
                ElementKind::Edge => view.set_edge_opacity(id, opacity),
            };
            if t >= 1.0 {
                match fade.phase {
                    FadePhase::In => finished_in.push((id.clone(), fade.kind)),
                    FadePhase::Out => finished_out.push((id.clone(), fade.kind)),
                }
            }
        }

        for (id, _) in &finished_in {
            self.fades.remove(id);
        }

        finished_out.sort_by_key(|(_, kind)| match kind {
            ElementKind::Edge => 0,
            ElementKind::Node => 1,
        });
        let mut detached = Vec::with_capacity(finished_out.len());
        for (id, kind) in finished_out {
            self.fades.remove(&id);
            detach(view, &id, kind);
            detached.push(id);
        }

        TickReport { detached, animating: !self.fades.is_empty() }
    }
}

fn detach(view: &mut ViewGraph, id: &str, kind: ElementKind) {
    match kind {
        ElementKind::Node => view.remove_node(id),
        ElementKind::Edge => view.remove_edge(id),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeRecord, NodeRecord};

    fn node(id: &str) -> GraphElement {
        GraphElement::Node(NodeRecord::new(id))
    }

    fn edge(id: &str, source: &str, target: &str) -> GraphElement {
        GraphElement::Edge(EdgeRecord::new(id, source, target))
    }

    fn added(elements: Vec<GraphElement>) -> ViewDiff {
        ViewDiff { added: elements, removed: Vec::new(), unchanged: Vec::new() }
    }

    fn removed(elements: Vec<GraphElement>) -> ViewDiff {
        ViewDiff { added: Vec::new(), removed: elements, unchanged: Vec::new() }
    }

    fn positions_for(ids: &[&str]) -> PositionStore {
        let mut store = PositionStore::new();
        for (i, id) in ids.iter().enumerate() {
            store.set(*id, Point2D::new(i as f32 * 10.0, 0.0));
        }
        store
    }

    // --- preset table ---

    #[test]
    fn test_preset_durations() {
        assert_eq!(AnimationPreset::Off.duration_ms(), 0);
        assert_eq!(AnimationPreset::Fast.duration_ms(), 200);
        assert_eq!(AnimationPreset::Medium.duration_ms(), 500);
        assert_eq!(AnimationPreset::Slow.duration_ms(), 1_000);
        assert_eq!(AnimationPreset::Glacial.duration_ms(), 2_000);
    }

    #[test]
    fn test_preset_round_trips_names() {
        for preset in [
            AnimationPreset::Off,
            AnimationPreset::Fast,
            AnimationPreset::Medium,
            AnimationPreset::Slow,
            AnimationPreset::Glacial,
        ] {
            assert_eq!(AnimationPreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(AnimationPreset::from_name("warp"), None);
    }

    // --- fade in ---

    #[test]
    fn test_addition_fades_in_over_duration() {
        let mut anim = AnimationController::new(AnimationPreset::Medium);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a"]);
        let t0 = Instant::now();

        anim.apply_diff(&added(vec![node("a")]), &mut view, &positions, t0);
        assert_eq!(view.node("a").unwrap().opacity, 0.0);

        let report = anim.tick(t0 + Duration::from_millis(250), &mut view);
        let halfway = view.node("a").unwrap().opacity;
        assert!((halfway - 0.5).abs() < 0.01, "got {halfway}");
        assert!(report.animating);

        let report = anim.tick(t0 + Duration::from_millis(600), &mut view);
        assert_eq!(view.node("a").unwrap().opacity, 1.0);
        assert!(!report.animating);
        assert!(anim.is_idle());
    }

    #[test]
    fn test_off_preset_inserts_at_full_opacity() {
        let mut anim = AnimationController::new(AnimationPreset::Off);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a"]);
        anim.apply_diff(&added(vec![node("a")]), &mut view, &positions, Instant::now());
        assert_eq!(view.node("a").unwrap().opacity, 1.0);
        assert!(anim.is_idle());
    }

    // --- fade out ---

    #[test]
    fn test_removal_fades_out_then_detaches() {
        let mut anim = AnimationController::new(AnimationPreset::Fast);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a"]);
        let t0 = Instant::now();

        anim.apply_diff(&added(vec![node("a")]), &mut view, &positions, t0);
        anim.tick(t0 + Duration::from_millis(300), &mut view);

        anim.apply_diff(&removed(vec![node("a")]), &mut view, &positions, t0);
        let report = anim.tick(t0 + Duration::from_millis(100), &mut view);
        assert!(view.contains_node("a"), "still fading");
        assert!(view.node("a").unwrap().opacity < 1.0);
        assert!(report.animating);

        let report = anim.tick(t0 + Duration::from_millis(250), &mut view);
        assert!(!view.contains_node("a"));
        assert_eq!(report.detached, vec!["a".to_string()]);
    }

    #[test]
    fn test_off_preset_detaches_immediately() {
        let mut anim = AnimationController::new(AnimationPreset::Off);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a", "b"]);
        let now = Instant::now();
        anim.apply_diff(
            &added(vec![node("a"), node("b"), edge("ab", "a", "b")]),
            &mut view,
            &positions,
            now,
        );
        anim.apply_diff(&removed(vec![edge("ab", "a", "b"), node("b")]), &mut view, &positions, now);
        assert!(!view.contains_node("b"));
        assert!(!view.contains_edge("ab"));
        assert!(view.contains_node("a"));
    }

    #[test]
    fn test_finished_removals_detach_edges_before_nodes() {
        let mut anim = AnimationController::new(AnimationPreset::Fast);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a", "b"]);
        let t0 = Instant::now();
        anim.apply_diff(
            &added(vec![node("a"), node("b"), edge("ab", "a", "b")]),
            &mut view,
            &positions,
            t0,
        );
        anim.tick(t0 + Duration::from_millis(300), &mut view);

        anim.apply_diff(&removed(vec![edge("ab", "a", "b"), node("b")]), &mut view, &positions, t0);
        let report = anim.tick(t0 + Duration::from_millis(600), &mut view);
        assert_eq!(report.detached, vec!["ab".to_string(), "b".to_string()]);
    }

    // --- cancellation ---

    #[test]
    fn test_readd_during_fade_out_cancels_and_snaps() {
        let mut anim = AnimationController::new(AnimationPreset::Slow);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a"]);
        let t0 = Instant::now();

        anim.apply_diff(&added(vec![node("a")]), &mut view, &positions, t0);
        anim.tick(t0 + Duration::from_millis(1_100), &mut view);
        anim.apply_diff(&removed(vec![node("a")]), &mut view, &positions, t0);
        anim.tick(t0 + Duration::from_millis(500), &mut view);
        assert!(view.node("a").unwrap().opacity < 1.0);

        // The window swings back before the fade-out lands.
        anim.apply_diff(&added(vec![node("a")]), &mut view, &positions, t0);
        assert_eq!(view.node("a").unwrap().opacity, 1.0);
        assert!(anim.is_idle());

        let report = anim.tick(t0 + Duration::from_millis(2_000), &mut view);
        assert!(view.contains_node("a"));
        assert!(report.detached.is_empty());
    }

    #[test]
    fn test_clear_drops_pending_fades() {
        let mut anim = AnimationController::new(AnimationPreset::Medium);
        let mut view = ViewGraph::new();
        let positions = positions_for(&["a"]);
        let t0 = Instant::now();
        anim.apply_diff(&added(vec![node("a")]), &mut view, &positions, t0);
        assert!(!anim.is_idle());
        anim.clear();
        assert!(anim.is_idle());
    }
}
