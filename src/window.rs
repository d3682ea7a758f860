/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Time window ownership and mutation.
//!
//! Core structures:
//! - [`TimeWindow`]: the active [start, end] range, start < end, always inside
//!   the dataset bounds
//! - [`WindowPreset`]: the named durations (1h/6h/24h/7d/30d/all)
//! - [`TimeWindowController`]: the single owner of window and bounds; every
//!   mutation path (scrub, step, preset, pan, playback) goes through it
//!
//! Mutations update the window synchronously so a dragging scrubber can read
//! it each frame, while the outgoing change notification is armed as a
//! deadline and collected by [`TimeWindowController::poll`]. Scrub and pan
//! gestures debounce (trailing edge); discrete gestures arm immediately.
//! Superseded notifications coalesce: a poll reports only the latest window.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::{ClockPolicy, EngineConfig};
use crate::error::ReplayError;
use crate::model::{TimeBounds, TimeMs};

const HOUR_MS: u64 = 3_600_000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// The active [start, end] filter range. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeWindow {
    start: TimeMs,
    end: TimeMs,
}

impl TimeWindow {
    pub fn new(start: TimeMs, end: TimeMs) -> Result<Self, ReplayError> {
        if start >= end {
            return Err(ReplayError::InvalidWindow(format!(
                "start {start} must precede end {end}"
            )));
        }
        Ok(TimeWindow { start, end })
    }

    /// Window covering the whole of `bounds`.
    pub fn spanning(bounds: TimeBounds) -> Self {
        TimeWindow { start: bounds.min, end: bounds.max }
    }

    pub fn start(&self) -> TimeMs {
        self.start
    }

    pub fn end(&self) -> TimeMs {
        self.end
    }

    pub fn width_ms(&self) -> u64 {
        self.end.0 - self.start.0
    }

    /// Inclusive on both endpoints.
    pub fn contains(&self, ts: TimeMs) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Shift by `delta_ms` preserving width, clamped so the window stays
    /// inside `bounds`. Caller guarantees width <= bounds span.
    fn shifted_clamped(self, delta_ms: i64, bounds: TimeBounds) -> Self {
        let width = self.width_ms();
        let max_start = bounds.max.0 - width;
        let target = self.start.0 as i128 + delta_ms as i128;
        let start = target.clamp(bounds.min.0 as i128, max_start as i128) as u64;
        TimeWindow { start: TimeMs(start), end: TimeMs(start + width) }
    }

    /// Re-fit into new bounds, preserving width where possible. A window
    /// wider than the bounds collapses to the full span.
    fn clamped_into(self, bounds: TimeBounds) -> Self {
        let span = bounds.span_ms();
        let width = self.width_ms().min(span).max(1);
        let max_start = bounds.max.0 - width;
        let start = self.start.0.clamp(bounds.min.0, max_start);
        TimeWindow { start: TimeMs(start), end: TimeMs(start + width) }
    }

}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}]", self.start.0, self.end.0)
    }
}

/// Named window durations, anchored at the recent end of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowPreset {
    OneHour,
    SixHours,
    TwentyFourHours,
    SevenDays,
    ThirtyDays,
    All,
}

impl WindowPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "1h" => Some(WindowPreset::OneHour),
            "6h" => Some(WindowPreset::SixHours),
            "24h" => Some(WindowPreset::TwentyFourHours),
            "7d" => Some(WindowPreset::SevenDays),
            "30d" => Some(WindowPreset::ThirtyDays),
            "all" => Some(WindowPreset::All),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowPreset::OneHour => "1h",
            WindowPreset::SixHours => "6h",
            WindowPreset::TwentyFourHours => "24h",
            WindowPreset::SevenDays => "7d",
            WindowPreset::ThirtyDays => "30d",
            WindowPreset::All => "all",
        }
    }

    /// `None` means the full bounds.
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            WindowPreset::OneHour => Some(HOUR_MS),
            WindowPreset::SixHours => Some(6 * HOUR_MS),
            WindowPreset::TwentyFourHours => Some(DAY_MS),
            WindowPreset::SevenDays => Some(7 * DAY_MS),
            WindowPreset::ThirtyDays => Some(30 * DAY_MS),
            WindowPreset::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Backward,
    Forward,
}

impl StepDirection {
    fn signum(&self) -> i64 {
        match self {
            StepDirection::Backward => -1,
            StepDirection::Forward => 1,
        }
    }
}

/// Payload of an emitted window-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChange {
    pub window: TimeWindow,
    pub revision: u64,
}

/// How an applied mutation arms the outgoing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    /// Fires on the next poll. Discrete gestures and playback ticks.
    Immediate,
    /// Fires after the quiet period. Scrub and pan gestures.
    Debounced,
}

pub struct TimeWindowController {
    bounds: Option<TimeBounds>,
    window: Option<TimeWindow>,
    debounce: Duration,
    default_fraction: f64,
    clock: ClockPolicy,
    pending_deadline: Option<Instant>,
    revision: u64,
}

impl TimeWindowController {
    pub fn new(debounce_ms: u64, default_window_fraction: f64, clock: ClockPolicy) -> Self {
        TimeWindowController {
            bounds: None,
            window: None,
            debounce: Duration::from_millis(debounce_ms),
            default_fraction: default_window_fraction,
            clock,
            pending_deadline: None,
            revision: 0,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.debounce_ms, config.default_window_fraction, config.clock)
    }

    /// Install dataset bounds, sanitized against the wall clock `now_wall`.
    ///
    /// The first call initializes the window to the configured fraction of
    /// the bounds, anchored at their start; later calls clamp the existing
    /// window into the new bounds instead of resetting it.
    pub fn set_bounds(&mut self, min: TimeMs, max: TimeMs, now_wall: TimeMs, now: Instant) {
        let (bounds, substituted) = self.clock.sanitize(min, max, now_wall);
        if substituted {
            warn!(
                "Implausible dataset bounds [{}..{}] replaced by fallback [{}..{}]",
                min.0, max.0, bounds.min.0, bounds.max.0
            );
        }
        self.bounds = Some(bounds);

        let window = match self.window {
            None => initial_window(bounds, self.default_fraction),
            Some(current) => current.clamped_into(bounds),
        };
        self.apply(window, Arm::Immediate, now);
    }

    /// Set the window explicitly. Invalid requests (start >= end, outside
    /// bounds, no bounds yet) are rejected and the prior window is retained.
    /// The update is visible synchronously; the notification debounces.
    pub fn set_window(&mut self, start: TimeMs, end: TimeMs, now: Instant) -> bool {
        let Some(bounds) = self.bounds else {
            debug!("Rejected window {start}..{end}: no bounds installed");
            return false;
        };
        if start >= end || start < bounds.min || end > bounds.max {
            debug!(
                "Rejected window [{}..{}] outside bounds [{}..{}]",
                start.0, end.0, bounds.min.0, bounds.max.0
            );
            return false;
        }
        self.apply(TimeWindow { start, end }, Arm::Debounced, now);
        true
    }

    /// Shift the window by `fraction` of its own width. Returns false when
    /// already pinned at the relevant bound or the fraction is unusable.
    pub fn step(&mut self, direction: StepDirection, fraction: f64, now: Instant) -> bool {
        let (Some(bounds), Some(window)) = (self.bounds, self.window) else {
            return false;
        };
        if !fraction.is_finite() || fraction <= 0.0 {
            return false;
        }
        let delta = (window.width_ms() as f64 * fraction).round() as i64 * direction.signum();
        let candidate = window.shifted_clamped(delta, bounds);
        if candidate == window {
            return false;
        }
        self.apply(candidate, Arm::Immediate, now);
        true
    }

    /// Apply a named duration ending at the later of bound-max or the wall
    /// clock, clamped into bounds.
    pub fn apply_preset(&mut self, preset: WindowPreset, now_wall: TimeMs, now: Instant) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        let window = match preset.duration_ms() {
            None => TimeWindow::spanning(bounds),
            Some(duration) => {
                // The later of bound-max or now, clamped into bounds, then
                // the duration spans backwards from it.
                let anchor_end = bounds.clamp(bounds.max.max(now_wall));
                let start = bounds.clamp(anchor_end.saturating_sub(duration));
                TimeWindow { start, end: anchor_end }
            },
        };
        self.apply(window, Arm::Immediate, now);
        true
    }

    /// Pan the window by `delta_ratio` of the bounds span, width unchanged.
    /// Part of a drag gesture, so the notification debounces.
    pub fn center_drag(&mut self, delta_ratio: f64, now: Instant) -> bool {
        let (Some(bounds), Some(window)) = (self.bounds, self.window) else {
            return false;
        };
        if !delta_ratio.is_finite() || delta_ratio == 0.0 {
            return false;
        }
        let delta = (bounds.span_ms() as f64 * delta_ratio).round() as i64;
        let candidate = window.shifted_clamped(delta, bounds);
        if candidate == window {
            return false;
        }
        self.apply(candidate, Arm::Debounced, now);
        true
    }

    /// Collect the pending notification once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<WindowChange> {
        let deadline = self.pending_deadline?;
        if now < deadline {
            return None;
        }
        self.pending_deadline = None;
        let window = self.window?;
        Some(WindowChange { window, revision: self.revision })
    }

    /// Drop the pending notification without emitting it. Teardown path.
    pub fn cancel_pending(&mut self) {
        self.pending_deadline = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending_deadline.is_some()
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.window
    }

    pub fn bounds(&self) -> Option<TimeBounds> {
        self.bounds
    }

    /// Monotonic count of applied window mutations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn apply(&mut self, window: TimeWindow, arm: Arm, now: Instant) {
        if self.window == Some(window) {
            return;
        }
        self.window = Some(window);
        self.revision = self.revision.saturating_add(1);
        let deadline = match arm {
            Arm::Immediate => now,
            Arm::Debounced => now + self.debounce,
        };
        self.pending_deadline = Some(deadline);
    }
}

fn initial_window(bounds: TimeBounds, fraction: f64) -> TimeWindow {
    let fraction = if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
        fraction
    } else {
        1.0
    };
    let span = bounds.span_ms();
    let width = ((span as f64 * fraction).round() as u64).clamp(1, span);
    TimeWindow { start: bounds.min, end: bounds.min.saturating_add(width) }
}
