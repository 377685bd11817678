//! Mount-to-unmount lifecycle of one viewer.
//!
//! A [`RenderLoopManager`] owns the scene, camera, material bindings and the
//! backend resources created for them. It moves through
//! `Uninitialized -> Initializing -> Running -> Disposed` exactly once and
//! keeps at most one frame request outstanding with its [`Viewport`].

use super::camera::{CameraController, CameraSettings};
use super::pick::{self, PickHit};
use super::{RenderBackend, RenderError};
use crate::materials::{MaterialBindings, MaterialCatalog, MaterialId, SelectionTable};
use crate::scene::{self, lighting, CategoryTag, Dimensions, LightingState, RoomType, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Initializing,
    Running,
    /// Terminal.
    Disposed,
}

/// Handle for one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// The drawing surface a manager is mounted on.
pub trait Viewport {
    /// Current size in physical pixels, `None` when no surface is attached.
    fn pixel_size(&self) -> Option<(u32, u32)>;

    /// Schedules a callback for the next display refresh.
    fn request_frame(&mut self) -> FrameToken;

    fn cancel_frame(&mut self, token: FrameToken);

    /// Starts routing pointer and resize events to the manager.
    fn attach_listeners(&mut self);

    fn detach_listeners(&mut self);
}

/// Everything the host supplies when mounting a viewer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewerProps {
    pub room_type: RoomType,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub catalog: MaterialCatalog,
    #[serde(default)]
    pub selections: SelectionTable,
}

/// Reported to the host after a click cycled a category's material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialChange {
    pub category: CategoryTag,
    pub material_id: MaterialId,
    /// Human-readable name of the picked surface.
    pub label: String,
}

/// State that exists only between a successful initialize and dispose.
struct Mounted {
    scene: Scene,
    camera: CameraController,
    bindings: MaterialBindings,
}

pub struct RenderLoopManager<B: RenderBackend, V: Viewport> {
    state: LoopState,
    backend: B,
    viewport: V,
    settings: CameraSettings,
    mounted: Option<Mounted>,
    catalog: MaterialCatalog,
    lighting: LightingState,
    pending_frame: Option<FrameToken>,
    selected_label: Option<String>,
    frames_drawn: u64,
}

impl<B: RenderBackend, V: Viewport> RenderLoopManager<B, V> {
    pub fn new(backend: B, viewport: V, settings: CameraSettings) -> Self {
        Self {
            state: LoopState::Uninitialized,
            backend,
            viewport,
            settings,
            mounted: None,
            catalog: MaterialCatalog::default(),
            lighting: LightingState::default(),
            pending_frame: None,
            selected_label: None,
            frames_drawn: 0,
        }
    }

    /// Builds the scene, draws it once and starts the frame loop.
    ///
    /// On failure the manager returns to `Uninitialized` with nothing left
    /// resident on the backend.
    pub fn initialize(&mut self, props: ViewerProps, lighting: LightingState) -> Result<(), RenderError> {
        if self.state != LoopState::Uninitialized {
            return Err(RenderError::InvalidState(self.state));
        }
        self.transition(LoopState::Initializing);

        if let Err(err) = self.mount(props, lighting) {
            log::error!("viewer initialization failed: {err}");
            self.release_resources();
            self.mounted = None;
            self.transition(LoopState::Uninitialized);
            return Err(err);
        }

        self.viewport.attach_listeners();
        self.transition(LoopState::Running);
        self.schedule_frame();
        Ok(())
    }

    fn mount(&mut self, props: ViewerProps, lighting: LightingState) -> Result<(), RenderError> {
        let (width, height) = self
            .viewport
            .pixel_size()
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or(RenderError::NoDrawingSurface)?;

        let mut scene = scene::build(props.room_type, props.dimensions)?;
        lighting::apply_state(&mut scene, lighting);
        let bindings = MaterialBindings::new(&mut scene, &props.catalog, &props.selections);
        let camera = CameraController::for_room(props.dimensions, self.settings);

        self.catalog = props.catalog;
        self.lighting = lighting;
        let mounted = self.mounted.insert(Mounted {
            scene,
            camera,
            bindings,
        });

        self.backend.resize(width, height);
        self.backend.prepare(&mounted.scene)?;
        if self.backend.draw(&mounted.scene, &mounted.camera.view())? {
            self.frames_drawn += 1;
        }
        Ok(())
    }

    /// Runs one scheduled frame. Returns whether a frame was presented.
    ///
    /// A frame only draws while `Running` and when a request is outstanding;
    /// stray refresh callbacks are ignored.
    pub fn frame(&mut self) -> Result<bool, RenderError> {
        if self.state != LoopState::Running || self.pending_frame.take().is_none() {
            return Ok(false);
        }
        let Some(mounted) = self.mounted.as_ref() else {
            return Ok(false);
        };
        let result = self.backend.draw(&mounted.scene, &mounted.camera.view());
        self.schedule_frame();
        let presented = result?;
        if presented {
            self.frames_drawn += 1;
        }
        Ok(presented)
    }

    /// Makes sure a frame is scheduled. Never issues a second request.
    pub fn request_redraw(&mut self) {
        if self.state == LoopState::Running {
            self.schedule_frame();
        }
    }

    fn schedule_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.viewport.request_frame());
        }
    }

    /// Re-reads the viewport size and resizes the draw buffers. Zero-area
    /// sizes keep the previous buffers. Returns whether a resize happened.
    pub fn resize(&mut self) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        match self.viewport.pixel_size() {
            Some((width, height)) if width > 0 && height > 0 => {
                if self.backend.buffer_size() == (width, height) {
                    return false;
                }
                self.backend.resize(width, height);
                log::debug!("viewport resized to {width}x{height}");
                self.request_redraw();
                true
            }
            other => {
                log::debug!("ignoring zero-area resize {other:?}");
                false
            }
        }
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        if let Some(mounted) = self.running_mut() {
            mounted.camera.begin_drag(x, y);
        }
    }

    pub fn drag(&mut self, x: f32, y: f32) {
        let moved = self
            .running_mut()
            .is_some_and(|mounted| mounted.camera.drag(x, y));
        if moved {
            self.request_redraw();
        }
    }

    pub fn end_drag(&mut self) {
        if let Some(mounted) = self.running_mut() {
            mounted.camera.end_drag();
        }
    }

    pub fn zoom(&mut self, delta_y: f32) {
        if let Some(mounted) = self.running_mut() {
            mounted.camera.zoom(delta_y);
            self.request_redraw();
        }
    }

    pub fn reset_camera(&mut self) {
        if let Some(mounted) = self.running_mut() {
            mounted.camera.reset();
            self.request_redraw();
        }
    }

    /// Picks under the pointer and cycles the hit surface's category.
    ///
    /// The selected-element label follows every click: it names the picked
    /// surface on a hit and is cleared on a miss.
    pub fn click(&mut self, x: f32, y: f32) -> Option<MaterialChange> {
        let viewport = self.backend.buffer_size();
        let mounted = self.mounted.as_mut().filter(|_| self.state == LoopState::Running)?;

        let Some(PickHit { surface, .. }) =
            pick::pick(x, y, &mounted.camera.view(), viewport, &mounted.scene)
        else {
            self.selected_label = None;
            return None;
        };
        let picked = mounted.scene.surface(surface)?;
        let label = picked.label.clone();
        let category = picked.category.clone()?;
        log::debug!("picked {label} ({category})");
        self.selected_label = Some(label.clone());

        let next = mounted
            .bindings
            .cycle(&mut mounted.scene, &self.catalog, &category);
        self.request_redraw();

        let Some(material_id) = next else {
            log::debug!("category {category} has no materials; nothing to cycle");
            return None;
        };
        Some(MaterialChange {
            category,
            material_id,
            label,
        })
    }

    /// Applies selections handed back by the host.
    pub fn update_selection(&mut self, selections: &SelectionTable) {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted
                .bindings
                .update(&mut mounted.scene, &self.catalog, selections);
            self.request_redraw();
        }
    }

    pub fn set_lighting(&mut self, state: LightingState) {
        self.lighting = state;
        if let Some(mounted) = self.mounted.as_mut() {
            lighting::apply_state(&mut mounted.scene, state);
            self.request_redraw();
        }
    }

    /// Swaps the host catalog and re-resolves every current binding against it.
    pub fn set_catalog(&mut self, catalog: MaterialCatalog) {
        self.catalog = catalog;
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.bindings.apply_all(&mut mounted.scene, &self.catalog);
            self.request_redraw();
        }
    }

    /// Tears the viewer down: cancels the scheduled frame, stops listening,
    /// then releases every surface and light on the backend. Safe to call
    /// more than once.
    pub fn dispose(&mut self) {
        if self.state == LoopState::Disposed {
            return;
        }
        if let Some(token) = self.pending_frame.take() {
            self.viewport.cancel_frame(token);
        }
        if self.state == LoopState::Running {
            self.viewport.detach_listeners();
        }
        self.release_resources();
        self.mounted = None;
        self.selected_label = None;
        self.transition(LoopState::Disposed);
    }

    fn release_resources(&mut self) {
        if let Some(mounted) = self.mounted.as_ref() {
            for surface in mounted.scene.surfaces() {
                self.backend.release_surface(surface.id);
            }
            self.backend.release_lights();
        }
    }

    fn running_mut(&mut self) -> Option<&mut Mounted> {
        if self.state == LoopState::Running {
            self.mounted.as_mut()
        } else {
            None
        }
    }

    fn transition(&mut self, next: LoopState) {
        log::info!("render loop: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.mounted.as_ref().map(|m| &m.scene)
    }

    pub fn camera(&self) -> Option<&CameraController> {
        self.mounted.as_ref().map(|m| &m.camera)
    }

    pub fn selections(&self) -> Option<&SelectionTable> {
        self.mounted.as_ref().map(|m| m.bindings.table())
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn lighting(&self) -> LightingState {
        self.lighting
    }

    pub fn selected_element_label(&self) -> Option<&str> {
        self.selected_label.as_deref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending_frame
    }

    pub fn aspect(&self) -> f32 {
        let (w, h) = self.backend.buffer_size();
        w as f32 / h.max(1) as f32
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }
}

impl<B: RenderBackend, V: Viewport> Drop for RenderLoopManager<B, V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;
    use crate::render::headless::{HeadlessBackend, HeadlessViewport};
    use crate::scene::{BuildError, Light, Rgb};

    type Manager = RenderLoopManager<HeadlessBackend, HeadlessViewport>;

    fn material(id: u64, category: CategoryTag, hex: &str) -> Material {
        Material {
            id: MaterialId(id),
            category,
            color: Rgb::from_hex(hex).unwrap(),
            price_per_area: 10.0,
            description: String::new(),
        }
    }

    fn kitchen_props() -> ViewerProps {
        ViewerProps {
            room_type: RoomType::Kitchen,
            dimensions: Dimensions::new(14.0, 12.0, 9.0),
            catalog: MaterialCatalog::new(vec![
                material(7, CategoryTag::Cabinets, "#402010"),
                material(8, CategoryTag::Cabinets, "#804020"),
                material(9, CategoryTag::Cabinets, "#c06030"),
                material(20, CategoryTag::Paint, "#eeeeee"),
                material(21, CategoryTag::Paint, "#336699"),
            ]),
            selections: [
                (CategoryTag::Cabinets, MaterialId(7)),
                (CategoryTag::Paint, MaterialId(20)),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn running(width: u32, height: u32) -> Manager {
        let mut manager = Manager::new(
            HeadlessBackend::new(),
            HeadlessViewport::new(width, height),
            CameraSettings::default(),
        );
        manager
            .initialize(kitchen_props(), LightingState::default())
            .unwrap();
        manager
    }

    /// Pixel where the island's center projects with the current camera.
    fn island_pixel(manager: &Manager) -> (f32, f32) {
        let scene = manager.scene().unwrap();
        let island = scene
            .surfaces()
            .iter()
            .find(|s| s.label == "Kitchen Island")
            .unwrap();
        let (w, h) = manager.backend().buffer_size();
        let clip = manager.camera().unwrap().view().view_proj(w as f32, h as f32)
            * island.transform.translation.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        ((ndc.x + 1.0) * 0.5 * w as f32, (1.0 - ndc.y) * 0.5 * h as f32)
    }

    #[test]
    fn initialize_draws_once_and_schedules_next_frame() {
        let manager = running(800, 600);
        assert_eq!(manager.state(), LoopState::Running);
        assert_eq!(manager.frames_drawn(), 1);
        assert_eq!(manager.backend().draws(), 1);
        assert!(manager.pending_frame().is_some());
        assert_eq!(manager.viewport().requested().len(), 1);
        assert!(manager.viewport().is_listening());
        assert_eq!(manager.backend().resident_surfaces().len(), 10);
        assert!(manager.backend().lights_resident());
        assert_eq!(manager.backend().buffer_size(), (800, 600));
    }

    #[test]
    fn dropped_frames_are_not_counted() {
        let mut manager = running(800, 600);
        manager.backend_mut().drop_next_frames(2);

        assert!(!manager.frame().unwrap());
        assert!(!manager.frame().unwrap());
        assert_eq!(manager.frames_drawn(), 1);
        // the loop keeps going while the surface recovers
        assert!(manager.pending_frame().is_some());

        assert!(manager.frame().unwrap());
        assert_eq!(manager.frames_drawn(), 2);
        assert_eq!(manager.backend().draws(), 4);
    }

    #[test]
    fn orbit_drag_reaches_the_next_frame() {
        let mut manager = running(800, 600);
        let before = manager.backend().last_camera().unwrap().eye;

        manager.begin_drag(400.0, 300.0);
        manager.drag(460.0, 280.0);
        manager.end_drag();
        assert!(manager.frame().unwrap());

        let after = manager.backend().last_camera().unwrap().eye;
        assert!((after - before).length() > 1e-3);
        assert_eq!(after, manager.camera().unwrap().position());
    }

    #[test]
    fn frames_keep_exactly_one_request_in_flight() {
        let mut manager = running(800, 600);
        for _ in 0..5 {
            manager.request_redraw();
            manager.request_redraw();
            assert!(manager.frame().unwrap());
        }
        assert_eq!(manager.frames_drawn(), 6);
        // the init request plus one per frame
        assert_eq!(manager.viewport().requested().len(), 6);
        assert!(manager.pending_frame().is_some());
    }

    #[test]
    fn clicking_the_island_cycles_cabinets() {
        let mut manager = running(800, 600);
        let (x, y) = island_pixel(&manager);

        let picks: Vec<MaterialId> = (0..3)
            .map(|_| manager.click(x, y).unwrap().material_id)
            .collect();
        assert_eq!(picks, vec![MaterialId(8), MaterialId(9), MaterialId(7)]);
        assert_eq!(manager.selected_element_label(), Some("Kitchen Island"));

        let change = manager.click(x, y).unwrap();
        assert_eq!(change.category, CategoryTag::Cabinets);
        assert_eq!(change.label, "Kitchen Island");

        // both cabinet surfaces carry the new color
        let color = Rgb::from_hex("#804020").unwrap();
        let scene = manager.scene().unwrap();
        let cabinets: Vec<_> = scene.surfaces_in(&CategoryTag::Cabinets).collect();
        assert_eq!(cabinets.len(), 2);
        assert!(cabinets.iter().all(|s| s.color == color));
    }

    #[test]
    fn missed_click_clears_the_label() {
        let mut manager = running(800, 600);
        let (x, y) = island_pixel(&manager);
        manager.click(x, y);
        assert!(manager.selected_element_label().is_some());

        // far away, the top-left corner looks over the room
        manager.zoom(10_000.0);
        assert_eq!(manager.click(0.0, 0.0), None);
        assert_eq!(manager.selected_element_label(), None);
    }

    #[test]
    fn host_selection_update_repaints() {
        let mut manager = running(800, 600);
        let selections: SelectionTable = [(CategoryTag::Paint, MaterialId(21))].into_iter().collect();
        manager.update_selection(&selections);
        assert!(manager.frame().unwrap());

        let blue = Rgb::from_hex("#336699").unwrap();
        let scene = manager.scene().unwrap();
        for (id, color, _) in manager.backend().last_colors() {
            let surface = scene.surface(*id).unwrap();
            if surface.category == Some(CategoryTag::Paint) {
                assert_eq!(*color, blue);
            } else {
                assert_ne!(*color, blue);
            }
        }
    }

    #[test]
    fn resize_keeps_aspect_and_buffer() {
        let mut manager = running(800, 600);
        assert!((manager.aspect() - 4.0 / 3.0).abs() < 1e-6);

        manager.viewport_mut().set_size(400, 300);
        assert!(manager.resize());
        assert_eq!(manager.backend().buffer_size(), (400, 300));
        assert!((manager.aspect() - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(manager.scene().unwrap().surfaces().len(), 10);

        manager.viewport_mut().set_size(0, 300);
        assert!(!manager.resize());
        assert_eq!(manager.backend().buffer_size(), (400, 300));
    }

    #[test]
    fn no_frames_after_dispose() {
        let mut manager = running(800, 600);
        let pending = manager.pending_frame().unwrap();
        manager.dispose();

        assert_eq!(manager.state(), LoopState::Disposed);
        assert_eq!(manager.viewport().cancelled(), &[pending]);
        assert!(!manager.viewport().is_listening());
        assert!(manager.backend().resident_surfaces().is_empty());
        assert_eq!(manager.backend().released_surfaces().len(), 10);
        assert!(manager.backend().lights_released());

        let drawn = manager.backend().draws();
        manager.request_redraw();
        assert!(!manager.frame().unwrap());
        manager.zoom(50.0);
        assert_eq!(manager.click(400.0, 300.0), None);
        assert_eq!(manager.backend().draws(), drawn);
        assert_eq!(manager.viewport().requested().len(), 1);
    }

    #[test]
    fn dispose_twice_is_silent() {
        let mut manager = running(800, 600);
        manager.dispose();
        manager.dispose();
        assert_eq!(manager.state(), LoopState::Disposed);
        assert_eq!(manager.viewport().cancelled().len(), 1);
        assert_eq!(manager.backend().released_surfaces().len(), 10);
    }

    #[test]
    fn missing_drawing_surface_is_fatal() {
        for viewport in [HeadlessViewport::detached(), HeadlessViewport::new(0, 0)] {
            let mut manager = Manager::new(HeadlessBackend::new(), viewport, CameraSettings::default());
            let err = manager
                .initialize(kitchen_props(), LightingState::default())
                .unwrap_err();
            assert!(matches!(err, RenderError::NoDrawingSurface));
            assert_eq!(manager.state(), LoopState::Uninitialized);
            assert_eq!(manager.backend().draws(), 0);
            assert!(!manager.viewport().is_listening());
            assert!(manager.viewport().requested().is_empty());
        }
    }

    #[test]
    fn invalid_dimensions_surface_from_initialize() {
        let mut manager = Manager::new(
            HeadlessBackend::new(),
            HeadlessViewport::new(800, 600),
            CameraSettings::default(),
        );
        let mut props = kitchen_props();
        props.dimensions = Dimensions::new(14.0, 0.0, 9.0);
        let err = manager.initialize(props, LightingState::default()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Build(BuildError::InvalidDimensions { .. })
        ));
        assert!(manager.scene().is_none());
    }

    #[test]
    fn initialize_only_once() {
        let mut manager = running(800, 600);
        let err = manager
            .initialize(kitchen_props(), LightingState::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidState(LoopState::Running)));

        manager.dispose();
        let err = manager
            .initialize(kitchen_props(), LightingState::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidState(LoopState::Disposed)));
    }

    #[test]
    fn lighting_changes_apply_to_the_live_scene() {
        let mut manager = running(800, 600);
        manager.set_lighting(LightingState {
            is_day: false,
            intensity: 0.5,
        });
        let ambient = manager
            .scene()
            .unwrap()
            .lights()
            .iter()
            .find_map(|l| match l {
                Light::Ambient { intensity, .. } => Some(*intensity),
                _ => None,
            });
        assert_eq!(ambient, Some(lighting::NIGHT_AMBIENT));
    }

    #[test]
    fn catalog_swap_drops_vanished_bindings() {
        let mut manager = running(800, 600);
        let props = kitchen_props();
        let only_paint = MaterialCatalog::new(
            props
                .catalog
                .iter()
                .filter(|m| m.category == CategoryTag::Paint)
                .cloned()
                .collect(),
        );
        manager.set_catalog(only_paint);
        let selections = manager.selections().unwrap();
        assert_eq!(selections.get(&CategoryTag::Cabinets), None);
        assert_eq!(selections.get(&CategoryTag::Paint), Some(MaterialId(20)));
    }
}
