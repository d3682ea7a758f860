/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Temporal graph view engine.
//!
//! Holds a timestamped node/edge dataset in memory, filters it by an active
//! time window, diffs successive views, animates elements in and out, keeps
//! manually-dragged node positions across window changes, and replays the
//! data by advancing the window on a clock. Drawing goes through a
//! swappable backend; interaction (hover, click, drag, pan/zoom) comes back
//! through a typed callback contract.
//!
//! Core structures:
//! - [`engine::ReplayEngine`]: the context object hosts own and pump
//! - [`dataset::DatasetStore`]: the loaded element set and its time bounds
//! - [`window::TimeWindowController`]: the active window, its mutations and
//!   debounced change notifications
//! - [`diff::DiffEngine`]: added/removed/unchanged between views
//! - [`positions::PositionStore`]: persisted manual coordinates
//! - [`layout::LayoutEngine`]: placement for nodes without a coordinate
//! - [`animation::AnimationController`]: fade in/out transitions
//! - [`render::RendererAdapter`]: backend seam plus pointer interaction
//! - [`playback::PlaybackClock`]: ticked window advancement
//!
//! Everything is single-threaded and event-driven: hosts call
//! [`engine::ReplayEngine::tick`] from their frame loop and drain
//! [`events::EngineEvent`]s afterwards.

pub mod animation;
pub mod config;
pub mod dataset;
pub mod diff;
pub mod engine;
pub mod error;
pub mod events;
pub mod glyphs;
pub mod layout;
pub mod model;
pub mod playback;
pub mod positions;
pub mod render;
pub mod view;
pub mod window;

pub use animation::AnimationPreset;
pub use config::{ClockPolicy, EngineConfig};
pub use dataset::LoadReport;
pub use engine::ReplayEngine;
pub use error::ReplayError;
pub use events::EngineEvent;
pub use layout::{LayoutAlgorithm, LayoutResolution};
pub use model::{GraphElement, TimeBounds, TimeMs};
pub use playback::{PlaybackPhase, PlaybackState};
pub use render::{RenderBackend, headless::HeadlessBackend};
pub use window::{StepDirection, TimeWindow, WindowPreset};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
