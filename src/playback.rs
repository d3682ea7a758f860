/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Automatic window advancement.
//!
//! A two-state clock: STOPPED and PLAYING. While playing, every elapsed
//! interval advances the window forward by a fixed fraction of its own
//! width through the time window controller. The controller clamps at the
//! dataset bound; the tick after the clamp finds nothing left to move and
//! flips the clock back to STOPPED, so the window never overshoots.
//!
//! The clock never sleeps or spawns timers. The host pumps it with the
//! current `Instant` and the clock decides whether a tick is due, which
//! keeps it deterministic under test.

use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::window::{StepDirection, TimeWindowController};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    Stopped,
    Playing,
}

/// Snapshot of the clock for host display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub speed: f64,
    pub tick_interval_ms: u64,
}

/// What one pump of the clock did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing, or the next tick is not due yet.
    Idle,
    /// The window advanced; still playing.
    Advanced,
    /// Nothing left to advance; the clock stopped itself.
    Completed,
}

pub struct PlaybackClock {
    phase: PlaybackPhase,
    speed: f64,
    tick_interval_ms: u64,
    tick_fraction: f64,
    next_tick: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(tick_interval_ms: u64, tick_fraction: f64, speed: f64) -> Self {
        PlaybackClock {
            phase: PlaybackPhase::Stopped,
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
            tick_interval_ms: tick_interval_ms.max(1),
            tick_fraction,
            next_tick: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.tick_interval_ms, config.tick_fraction, config.speed)
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            phase: self.phase,
            speed: self.speed,
            tick_interval_ms: self.tick_interval_ms,
        }
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Start playing. A no-op returning false when already playing.
    pub fn play(&mut self, now: Instant) -> bool {
        if self.phase == PlaybackPhase::Playing {
            return false;
        }
        self.phase = PlaybackPhase::Playing;
        self.next_tick = Some(now + self.effective_interval());
        debug!("Playback started, interval {:?}", self.effective_interval());
        true
    }

    /// Stop playing and cancel the pending tick. Returns false when already
    /// stopped.
    pub fn pause(&mut self) -> bool {
        if self.phase == PlaybackPhase::Stopped {
            return false;
        }
        self.phase = PlaybackPhase::Stopped;
        self.next_tick = None;
        debug!("Playback paused");
        true
    }

    /// Change the speed multiplier. Rejects non-positive or non-finite
    /// values. While playing, the pending tick re-anchors at `now` with the
    /// new interval.
    pub fn set_speed(&mut self, speed: f64, now: Instant) -> bool {
        if !speed.is_finite() || speed <= 0.0 {
            return false;
        }
        self.speed = speed;
        if self.phase == PlaybackPhase::Playing {
            self.next_tick = Some(now + self.effective_interval());
        }
        true
    }

    pub fn set_tick_interval_ms(&mut self, interval_ms: u64, now: Instant) -> bool {
        if interval_ms == 0 {
            return false;
        }
        self.tick_interval_ms = interval_ms;
        if self.phase == PlaybackPhase::Playing {
            self.next_tick = Some(now + self.effective_interval());
        }
        true
    }

    pub fn tick_due(&self, now: Instant) -> bool {
        matches!(self.next_tick, Some(deadline) if now >= deadline)
    }

    /// Pump the clock. At most one window advance per call; a late host
    /// catches up one interval at a time rather than bursting.
    pub fn advance(&mut self, controller: &mut TimeWindowController, now: Instant) -> TickOutcome {
        if self.phase != PlaybackPhase::Playing || !self.tick_due(now) {
            return TickOutcome::Idle;
        }
        if controller.step(StepDirection::Forward, self.tick_fraction, now) {
            self.next_tick = Some(now + self.effective_interval());
            TickOutcome::Advanced
        } else {
            self.pause();
            debug!("Playback reached the dataset bound and stopped");
            TickOutcome::Completed
        }
    }

    fn effective_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_ms as f64 / 1_000.0 / self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClockPolicy;
    use crate::model::TimeMs;

    fn controller_with_bounds(min: u64, max: u64, now: Instant) -> TimeWindowController {
        let mut controller = TimeWindowController::new(0, 1.0, ClockPolicy::permissive());
        controller.set_bounds(TimeMs(min), TimeMs(max), TimeMs(max), now);
        controller
    }

    fn window_of(controller: &TimeWindowController) -> (u64, u64) {
        let w = controller.window().unwrap();
        (w.start().0, w.end().0)
    }

    #[test]
    fn test_first_tick_advances_by_fraction_of_width() {
        let t0 = Instant::now();
        let mut controller = controller_with_bounds(0, 1_000, t0);
        assert!(controller.set_window(TimeMs(0), TimeMs(100), t0));
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);

        assert!(clock.play(t0));
        assert_eq!(clock.advance(&mut controller, t0), TickOutcome::Idle, "not due yet");

        let t1 = t0 + Duration::from_millis(1_000);
        assert_eq!(clock.advance(&mut controller, t1), TickOutcome::Advanced);
        assert_eq!(window_of(&controller), (10, 110));
    }

    #[test]
    fn test_playback_clamps_at_bound_and_stops() {
        let t0 = Instant::now();
        let mut controller = controller_with_bounds(0, 1_000, t0);
        assert!(controller.set_window(TimeMs(0), TimeMs(100), t0));
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);
        clock.play(t0);

        let mut now = t0;
        let mut guard = 0;
        while clock.is_playing() {
            now += Duration::from_millis(1_000);
            clock.advance(&mut controller, now);
            guard += 1;
            assert!(guard < 200, "playback never stopped");
        }
        assert_eq!(window_of(&controller), (900, 1_000));
        assert_eq!(clock.phase(), PlaybackPhase::Stopped);
        assert!(clock.next_tick().is_none());
    }

    #[test]
    fn test_full_span_window_stops_on_first_tick() {
        let t0 = Instant::now();
        let mut controller = controller_with_bounds(0, 1_000, t0);
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);
        clock.play(t0);
        let outcome = clock.advance(&mut controller, t0 + Duration::from_millis(1_000));
        assert_eq!(outcome, TickOutcome::Completed);
        assert_eq!(window_of(&controller), (0, 1_000));
    }

    #[test]
    fn test_play_while_playing_is_noop() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);
        assert!(clock.play(t0));
        let scheduled = clock.next_tick();
        assert!(!clock.play(t0 + Duration::from_millis(400)));
        assert_eq!(clock.next_tick(), scheduled, "pending tick must not re-anchor");
    }

    #[test]
    fn test_pause_cancels_pending_tick() {
        let t0 = Instant::now();
        let mut controller = controller_with_bounds(0, 1_000, t0);
        controller.set_window(TimeMs(0), TimeMs(100), t0);
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);
        clock.play(t0);
        assert!(clock.pause());
        assert!(!clock.pause());
        assert!(clock.next_tick().is_none());

        let later = t0 + Duration::from_millis(5_000);
        assert_eq!(clock.advance(&mut controller, later), TickOutcome::Idle);
        assert_eq!(window_of(&controller), (0, 100));
    }

    #[test]
    fn test_speed_divides_interval() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(1_000, 0.1, 2.0);
        clock.play(t0);
        assert_eq!(clock.next_tick(), Some(t0 + Duration::from_millis(500)));

        assert!(clock.set_speed(4.0, t0));
        assert_eq!(clock.next_tick(), Some(t0 + Duration::from_millis(250)));
    }

    #[test]
    fn test_set_speed_rejects_bad_values() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);
        assert!(!clock.set_speed(0.0, t0));
        assert!(!clock.set_speed(-1.0, t0));
        assert!(!clock.set_speed(f64::NAN, t0));
        assert_eq!(clock.state().speed, 1.0);
    }

    #[test]
    fn test_late_pump_advances_once_per_call() {
        let t0 = Instant::now();
        let mut controller = controller_with_bounds(0, 1_000, t0);
        controller.set_window(TimeMs(0), TimeMs(100), t0);
        let mut clock = PlaybackClock::new(1_000, 0.1, 1.0);
        clock.play(t0);

        // Host wakes up 3.5 intervals late; only one step happens.
        let late = t0 + Duration::from_millis(3_500);
        assert_eq!(clock.advance(&mut controller, late), TickOutcome::Advanced);
        assert_eq!(window_of(&controller), (10, 110));
        // Next tick re-anchors off the late pump.
        assert_eq!(clock.next_tick(), Some(late + Duration::from_millis(1_000)));
    }
}
