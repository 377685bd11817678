//! GPU-free backend and viewport.
//!
//! Both record what the render loop asked of them so tests (and offscreen
//! hosts) can inspect resource lifetimes and frame scheduling.

use super::camera::CameraView;
use super::lifecycle::{FrameToken, Viewport};
use super::{RenderBackend, RenderError};
use crate::scene::{Rgb, Scene, SurfaceId};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    size: (u32, u32),
    resident: BTreeSet<SurfaceId>,
    released: Vec<SurfaceId>,
    lights_resident: bool,
    lights_released: bool,
    draws: u64,
    dropped_frames: u32,
    last_colors: Vec<(SurfaceId, Rgb, f32)>,
    last_camera: Option<CameraView>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw calls received, presented or not.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Makes the next `count` draws skip presenting, the way a lost or
    /// timed-out swapchain does.
    pub fn drop_next_frames(&mut self, count: u32) {
        self.dropped_frames = count;
    }

    pub fn resident_surfaces(&self) -> &BTreeSet<SurfaceId> {
        &self.resident
    }

    pub fn released_surfaces(&self) -> &[SurfaceId] {
        &self.released
    }

    pub fn lights_resident(&self) -> bool {
        self.lights_resident
    }

    pub fn lights_released(&self) -> bool {
        self.lights_released
    }

    /// Surface colors and opacities as of the last draw.
    pub fn last_colors(&self) -> &[(SurfaceId, Rgb, f32)] {
        &self.last_colors
    }

    pub fn last_camera(&self) -> Option<&CameraView> {
        self.last_camera.as_ref()
    }
}

impl RenderBackend for HeadlessBackend {
    fn prepare(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.resident.extend(scene.surfaces().iter().map(|s| s.id));
        self.lights_resident = true;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn buffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, scene: &Scene, camera: &CameraView) -> Result<bool, RenderError> {
        self.draws += 1;
        if self.dropped_frames > 0 {
            self.dropped_frames -= 1;
            return Ok(false);
        }
        self.last_colors = scene
            .surfaces()
            .iter()
            .map(|s| (s.id, s.color, s.opacity))
            .collect();
        self.last_camera = Some(*camera);
        Ok(true)
    }

    fn release_surface(&mut self, id: SurfaceId) {
        if self.resident.remove(&id) {
            self.released.push(id);
        }
    }

    fn release_lights(&mut self) {
        if self.lights_resident {
            self.lights_resident = false;
            self.lights_released = true;
        }
    }
}

/// Scripted drawing surface with a manual frame clock.
#[derive(Debug, Default)]
pub struct HeadlessViewport {
    size: Option<(u32, u32)>,
    listening: bool,
    next_token: u64,
    requested: Vec<FrameToken>,
    cancelled: Vec<FrameToken>,
}

impl HeadlessViewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            ..Self::default()
        }
    }

    /// A viewport with no drawing surface attached.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = Some((width, height));
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn requested(&self) -> &[FrameToken] {
        &self.requested
    }

    pub fn cancelled(&self) -> &[FrameToken] {
        &self.cancelled
    }
}

impl Viewport for HeadlessViewport {
    fn pixel_size(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn request_frame(&mut self) -> FrameToken {
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.requested.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.cancelled.push(token);
    }

    fn attach_listeners(&mut self) {
        self.listening = true;
    }

    fn detach_listeners(&mut self) {
        self.listening = false;
    }
}
