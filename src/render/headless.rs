/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A backend that draws nothing.
//!
//! Records every scene it is handed so hosts without a surface (tests,
//! servers, benchmarks) can still run the full pipeline and inspect what
//! would have been drawn.

use log::debug;

use crate::error::ReplayError;

use super::RenderBackend;
use super::scene::ScenePacket;

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    mounted: bool,
    frames: u64,
    refreshes: u64,
    last_scene: Option<ScenePacket>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scenes applied since mount.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn last_scene(&self) -> Option<&ScenePacket> {
        self.last_scene.as_ref()
    }
}

impl RenderBackend for HeadlessBackend {
    fn mount(&mut self) -> Result<(), ReplayError> {
        self.mounted = true;
        debug!("Headless backend mounted");
        Ok(())
    }

    fn apply(&mut self, scene: &ScenePacket) -> Result<(), ReplayError> {
        if !self.mounted {
            return Err(ReplayError::RenderBackend("apply on unmounted backend".to_string()));
        }
        self.frames += 1;
        self.last_scene = Some(scene.clone());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), ReplayError> {
        if !self.mounted {
            return Err(ReplayError::RenderBackend("refresh on unmounted backend".to_string()));
        }
        self.refreshes += 1;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
        self.last_scene = None;
    }

    fn name(&self) -> &str {
        "headless"
    }
}
