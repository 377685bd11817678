pub mod camera;
mod egui_overlay;
mod gpu;
pub mod headless;
pub mod lifecycle;
pub mod pick;

pub use camera::{CameraController, CameraSettings, CameraView};
pub use egui_overlay::EguiFrameOutput;
pub use gpu::WgpuBackend;
pub use headless::{HeadlessBackend, HeadlessViewport};
pub use lifecycle::{FrameToken, LoopState, MaterialChange, RenderLoopManager, Viewport, ViewerProps};
pub use pick::{PickHit, Ray};

use crate::scene::{BuildError, Scene, SurfaceId};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no drawing surface with a non-zero size is available")]
    NoDrawingSurface,
    #[error("no compatible GPU adapter found")]
    AdapterUnavailable,
    #[error("failed to create wgpu surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to create wgpu device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface texture unavailable: {0}")]
    Surface(wgpu::SurfaceError),
    #[error("scene has {count} surfaces, renderer supports {max}")]
    TooManySurfaces { count: usize, max: usize },
    #[error("render loop cannot initialize from state {0:?}")]
    InvalidState(LoopState),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Draw target for a [`RenderLoopManager`].
///
/// A backend owns every GPU-side resource created for a scene. Surface colors
/// and light values are read from the scene on every draw, so repaints need no
/// re-upload.
pub trait RenderBackend {
    /// Uploads resources for every surface and light not yet resident.
    fn prepare(&mut self, scene: &Scene) -> Result<(), RenderError>;

    /// Resizes the draw buffers. Callers never pass a zero dimension.
    fn resize(&mut self, width: u32, height: u32);

    fn buffer_size(&self) -> (u32, u32);

    /// Renders and presents one frame. Returns `false` when the frame was
    /// dropped without presenting, e.g. while the surface is being rebuilt.
    fn draw(&mut self, scene: &Scene, camera: &CameraView) -> Result<bool, RenderError>;

    fn release_surface(&mut self, id: SurfaceId);

    fn release_lights(&mut self);
}
