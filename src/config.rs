/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Engine configuration.
//!
//! Everything tunable lives here with named defaults so hosts can persist and
//! restore a config without chasing constants through the crate. Durations
//! are plain milliseconds for serialization friendliness.

use euclid::default::Size2D;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationPreset;
use crate::layout::{ForceParams, LayoutAlgorithm};
use crate::model::{TimeBounds, TimeMs};

/// Quiet period between the last window mutation and the outgoing change
/// notification. The design range is 50-150 ms; values outside it are legal.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Fraction of the dataset bounds used for the initial window. 1.0 opens the
/// window across the whole range.
pub const DEFAULT_WINDOW_FRACTION: f64 = 1.0;

/// Base playback tick interval before the speed multiplier divides it.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Fraction of the window's own width each playback tick advances it by.
pub const DEFAULT_TICK_FRACTION: f64 = 0.1;

pub const DEFAULT_SPEED: f64 = 1.0;

pub const DEFAULT_CANVAS_WIDTH: f32 = 1_280.0;
pub const DEFAULT_CANVAS_HEIGHT: f32 = 800.0;

/// Drawn node radius, also the half-extent used when indexing for hits.
pub const DEFAULT_NODE_RADIUS: f32 = 10.0;

/// Pointer distance within which a node counts as hit.
pub const DEFAULT_PICK_RADIUS: f32 = 14.0;

/// Pointer travel in screen pixels before a press becomes a drag.
pub const DEFAULT_DRAG_THRESHOLD: f32 = 4.0;

pub const DEFAULT_ZOOM_MIN: f32 = 0.1;
pub const DEFAULT_ZOOM_MAX: f32 = 10.0;

/// 2000-01-01T00:00:00Z. Timestamps before this are treated as clock noise.
pub const DEFAULT_EARLIEST_PLAUSIBLE_MS: u64 = 946_684_800_000;

/// How far past the wall clock a timestamp may sit before it is implausible.
pub const DEFAULT_MAX_FUTURE_SKEW_MS: u64 = 366 * 24 * 3_600 * 1_000;

/// Width of the substituted window when bounds are implausible: 30 days.
pub const DEFAULT_FALLBACK_SPAN_MS: u64 = 30 * 24 * 3_600 * 1_000;

/// Plausibility thresholds for upstream timestamps.
///
/// Unreliable deployment clocks have produced datasets dated decades away;
/// rather than propagate such bounds into every widget, the controller
/// substitutes a fallback window anchored at the host wall clock. The
/// thresholds are configuration, not constants, so an installation that
/// really does hold pre-2000 data can widen them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockPolicy {
    pub earliest_plausible_ms: u64,
    pub max_future_skew_ms: u64,
    pub fallback_span_ms: u64,
}

impl Default for ClockPolicy {
    fn default() -> Self {
        ClockPolicy {
            earliest_plausible_ms: DEFAULT_EARLIEST_PLAUSIBLE_MS,
            max_future_skew_ms: DEFAULT_MAX_FUTURE_SKEW_MS,
            fallback_span_ms: DEFAULT_FALLBACK_SPAN_MS,
        }
    }
}

impl ClockPolicy {
    /// A policy that accepts any timestamps. Synthetic datasets (and the
    /// epoch-relative fixtures in this crate's tests) need this.
    pub fn permissive() -> Self {
        ClockPolicy {
            earliest_plausible_ms: 0,
            max_future_skew_ms: u64::MAX,
            fallback_span_ms: DEFAULT_FALLBACK_SPAN_MS,
        }
    }

    /// Validate candidate bounds against the wall clock `now`.
    ///
    /// Returns the bounds to use and whether the fallback was substituted.
    /// A degenerate span (min >= max) also takes the fallback so a valid
    /// window always exists inside the result.
    pub fn sanitize(&self, min: TimeMs, max: TimeMs, now: TimeMs) -> (TimeBounds, bool) {
        let latest_plausible = now.saturating_add(self.max_future_skew_ms);
        let plausible = min < max
            && min.0 >= self.earliest_plausible_ms
            && max <= latest_plausible;
        if plausible {
            (TimeBounds::new(min, max), false)
        } else {
            // A zero configured span or an epoch wall clock must not
            // collapse the substitute to min == max.
            let span = self.fallback_span_ms.max(1);
            let lo = now.saturating_sub(span);
            let fallback = TimeBounds::new(lo, lo.saturating_add(span));
            (fallback, true)
        }
    }
}

/// Tunables for the whole engine. `Default` is the shipping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub debounce_ms: u64,
    pub default_window_fraction: f64,
    pub tick_interval_ms: u64,
    pub tick_fraction: f64,
    pub speed: f64,
    pub animation: AnimationPreset,
    pub layout: LayoutAlgorithm,
    /// Seed for the force-directed layout; `None` draws one from entropy,
    /// making runs non-deterministic.
    pub layout_seed: Option<u64>,
    pub force: ForceParams,
    pub canvas: Size2D<f32>,
    pub node_radius: f32,
    pub pick_radius: f32,
    pub drag_threshold: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub clock: ClockPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            default_window_fraction: DEFAULT_WINDOW_FRACTION,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            tick_fraction: DEFAULT_TICK_FRACTION,
            speed: DEFAULT_SPEED,
            animation: AnimationPreset::Medium,
            layout: LayoutAlgorithm::ForceDirected,
            layout_seed: None,
            force: ForceParams::default(),
            canvas: Size2D::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT),
            node_radius: DEFAULT_NODE_RADIUS,
            pick_radius: DEFAULT_PICK_RADIUS,
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            zoom_min: DEFAULT_ZOOM_MIN,
            zoom_max: DEFAULT_ZOOM_MAX,
            clock: ClockPolicy::default(),
        }
    }
}
