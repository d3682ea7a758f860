/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Engine-to-host notifications.
//!
//! Events flow through an unbounded channel owned by the engine instance,
//! not a global. Hosts either drain synchronously after pumping the engine
//! or clone the receiver onto their own event loop.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::model::TimeBounds;
use crate::playback::PlaybackState;
use crate::window::TimeWindow;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Dataset bounds computed; fired exactly once per load. Range-display
    /// widgets initialize from this.
    RangeComputed { bounds: TimeBounds },
    /// A load finished, with its accepted and dropped element counts.
    Loaded { loaded: usize, dropped: usize },
    /// The active window changed. Debounced mutations coalesce into the
    /// latest state.
    WindowChanged { window: TimeWindow, revision: u64 },
    /// The playback clock started, stopped, or changed speed.
    PlaybackChanged { state: PlaybackState },
    /// The upstream collaborator reported it could not deliver data.
    FetchFailed { reason: String },
    /// The drawing backend failed; the render session is over until a
    /// remount.
    BackendFailed { reason: String },
}

pub struct EventHub {
    tx: Sender<EngineEvent>,
    rx: Receiver<EngineEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        EventHub { tx, rx }
    }

    pub fn emit(&self, event: EngineEvent) {
        // Send only fails when every receiver is gone; we hold one.
        let _ = self.tx.send(event);
    }

    /// Everything emitted since the last drain, in emission order.
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.rx.try_iter().collect()
    }

    /// A receiver the host can move onto its own loop.
    pub fn receiver(&self) -> Receiver<EngineEvent> {
        self.rx.clone()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
