mod egui_host;
mod input;
pub mod session;
mod timing;
mod viewport;

use crate::materials::estimate_costs;
use crate::render::{RenderError, RenderLoopManager, WgpuBackend};
use crate::scene::{LightingState, RoomType};
use crate::ui::{UiActions, UiSnapshot, UiState};
use egui_host::EguiHost;
use input::{key_action, wheel_delta_y, KeyAction, PointerRelease, PointerState};
use session::{load_session_from_file, save_session_to_file, HostSession, SessionError};
use timing::FrameTiming;
use viewport::WindowViewport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

type Viewer = RenderLoopManager<WgpuBackend, WindowViewport>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to load session: {0}")]
    Session(#[from] SessionError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

pub struct App {
    session: HostSession,
    session_path: Option<PathBuf>,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer>,
    egui: Option<EguiHost>,
    ui: UiState,
    pointer: PointerState,
    timing: FrameTiming,
    status: Option<String>,
}

impl App {
    fn new(session: HostSession, session_path: Option<PathBuf>) -> Self {
        let title = window_title(&session);
        Self {
            session,
            session_path,
            window: None,
            viewer: None,
            egui: None,
            ui: UiState::new(),
            pointer: PointerState::default(),
            timing: FrameTiming::new(title),
            status: None,
        }
    }

    /// Creates the GPU backend for `window` and mounts the current session on it.
    fn mount_viewer(&mut self, window: Arc<Window>) -> Result<(), RenderError> {
        // tear the old viewer down before a new surface claims the window
        if let Some(mut old) = self.viewer.take() {
            old.dispose();
        }

        let backend = pollster::block_on(WgpuBackend::new(
            window.clone(),
            self.session.config.clear_color,
        ))?;
        let mut viewer = RenderLoopManager::new(
            backend,
            WindowViewport::new(window.clone()),
            self.session.config.camera,
        );
        viewer.initialize(self.session.props(), self.session.lighting)?;

        let title = window_title(&self.session);
        window.set_title(&title);
        self.timing.set_base_title(title);
        self.viewer = Some(viewer);
        Ok(())
    }

    fn persist_session(&mut self) {
        let Some(path) = self.session_path.as_ref() else {
            return;
        };
        if let Err(err) = save_session_to_file(&self.session, path) {
            log::warn!("failed to save session to {}: {err}", path.display());
            self.status = Some(format!("Could not save session: {err}"));
        }
    }

    fn handle_click(&mut self, x: f32, y: f32) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        let Some(change) = viewer.click(x, y) else {
            return;
        };
        log::info!(
            "{}: {} -> material {}",
            change.label,
            change.category,
            change.material_id
        );
        self.session.apply_change(&change);
        viewer.update_selection(&self.session.selections);
        self.persist_session();
    }

    fn set_lighting(&mut self, lighting: LightingState) {
        self.session.lighting = lighting;
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.set_lighting(lighting);
        }
        self.persist_session();
    }

    fn open_session_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Room session", &["json"])
            .pick_file()
        else {
            return;
        };
        let session = match load_session_from_file(&path) {
            Ok(session) => session,
            Err(err) => {
                log::error!("failed to open {}: {err}", path.display());
                self.status = Some(format!("Could not open {}: {err}", path.display()));
                return;
            }
        };
        log::info!("opened session {}", path.display());
        self.session = session;
        self.session_path = Some(path);
        self.status = None;

        if let Some(window) = self.window.clone() {
            if let Err(err) = self.mount_viewer(window) {
                log::error!("failed to mount session: {err}");
                self.status = Some(format!("Could not show room: {err}"));
            }
        }
    }

    fn apply_ui_actions(&mut self, actions: UiActions) {
        if let Some(lighting) = actions.lighting {
            self.set_lighting(lighting);
        }
        if actions.reset_camera {
            if let Some(viewer) = self.viewer.as_mut() {
                viewer.reset_camera();
            }
        }
        if let Some((category, id)) = actions.select {
            self.session.selections.set(category, id);
            if let Some(viewer) = self.viewer.as_mut() {
                viewer.update_selection(&self.session.selections);
            }
            self.persist_session();
        }
        if actions.open_session {
            self.open_session_dialog();
        }
    }

    fn redraw(&mut self) {
        let frame_start = Instant::now();
        let Some(window) = self.window.clone() else {
            return;
        };

        let mut actions = UiActions::default();
        if let (Some(viewer), Some(egui)) = (self.viewer.as_mut(), self.egui.as_mut()) {
            let (frame, panel_actions) = {
                let costs = match (viewer.scene(), viewer.selections()) {
                    (Some(scene), Some(selections)) => {
                        estimate_costs(scene, viewer.catalog(), selections)
                    }
                    _ => Vec::new(),
                };
                let session_name = self
                    .session_path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "demo".to_string());
                let snapshot = UiSnapshot {
                    room_type: self.session.room_type,
                    lighting: viewer.lighting(),
                    selected_label: viewer.selected_element_label(),
                    catalog: viewer.catalog(),
                    costs: &costs,
                    session_name: &session_name,
                    status: self.status.as_deref(),
                };
                egui.show_panel(&window, &mut self.ui, &snapshot)
            };
            viewer.backend_mut().set_overlay(frame);
            actions = panel_actions;
        }

        if let Some(viewer) = self.viewer.as_mut() {
            if let Err(err) = viewer.frame() {
                log::error!("frame failed: {err}");
            }
        }

        if !actions.is_empty() {
            self.apply_ui_actions(actions);
        }

        self.timing
            .set_render_ms(frame_start.elapsed().as_secs_f32() * 1000.0);
        self.timing.update(&window, Instant::now());
    }

    fn listening(&self) -> bool {
        self.viewer
            .as_ref()
            .is_some_and(|viewer| viewer.viewport().is_listening())
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.dispose();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(window_title(&self.session))
            .with_inner_size(PhysicalSize::new(1280u32, 720u32))
            .with_resizable(true);
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        self.egui = Some(EguiHost::new(&window));
        self.window = Some(window.clone());
        if let Err(err) = self.mount_viewer(window) {
            log::error!("failed to start viewer: {err}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let captured = match (self.egui.as_mut(), self.window.as_ref()) {
            (Some(egui), Some(window)) => egui.captures(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                if captured || event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match key_action(event.physical_key) {
                    Some(KeyAction::Quit) => self.quit(event_loop),
                    Some(KeyAction::ResetCamera) => {
                        if let Some(viewer) = self.viewer.as_mut() {
                            viewer.reset_camera();
                        }
                    }
                    Some(KeyAction::ToggleDayNight) => {
                        let mut lighting = self.session.lighting;
                        lighting.is_day = !lighting.is_day;
                        self.set_lighting(lighting);
                    }
                    Some(KeyAction::TogglePanel) => self.ui.toggle_panel(),
                    None => {}
                }
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if !self.listening() {
                    return;
                }
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.resize();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let dragging = self.pointer.moved(position.x as f32, position.y as f32);
                if let (Some((x, y)), true) = (dragging, self.listening()) {
                    if let Some(viewer) = self.viewer.as_mut() {
                        viewer.drag(x, y);
                    }
                }
            }
            WindowEvent::CursorLeft { .. } => self.pointer.left(),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if captured || !self.listening() {
                        return;
                    }
                    if let Some((x, y)) = self.pointer.pressed() {
                        if let Some(viewer) = self.viewer.as_mut() {
                            viewer.begin_drag(x, y);
                        }
                    }
                }
                ElementState::Released => {
                    let release = self.pointer.released(self.session.config.click_slop_px);
                    if let Some(viewer) = self.viewer.as_mut() {
                        viewer.end_drag();
                    }
                    if let Some(PointerRelease::Click { x, y }) = release {
                        self.handle_click(x, y);
                    }
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                if captured || !self.listening() {
                    return;
                }
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.zoom(wheel_delta_y(delta));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn window_title(session: &HostSession) -> String {
    format!("roomviz - {}", session.room_type.as_str())
}

/// Picks the session from the first CLI argument: a `.json` path is loaded,
/// a room type name selects a built-in demo, nothing means the demo kitchen.
fn session_from_args() -> Result<(HostSession, Option<PathBuf>), SessionError> {
    let Some(arg) = std::env::args_os().nth(1) else {
        return Ok((HostSession::demo(RoomType::Kitchen), None));
    };
    let path = PathBuf::from(&arg);
    if path.extension().is_some_and(|ext| ext == "json") {
        let session = load_session_from_file(&path)?;
        log::info!("loaded session {}", path.display());
        return Ok((session, Some(path)));
    }
    let room_type = match arg.to_string_lossy().to_ascii_lowercase().as_str() {
        "kitchen" => RoomType::Kitchen,
        "bathroom" => RoomType::Bathroom,
        _ => RoomType::Other,
    };
    Ok((HostSession::demo(room_type), None))
}

pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let (session, session_path) = session_from_args()?;
    log::info!(
        "roomviz: {} room {}x{}x{}",
        session.room_type.as_str(),
        session.dimensions.length,
        session.dimensions.width,
        session.dimensions.height
    );
    log::info!("   drag to orbit, wheel to zoom, click to cycle materials; R reset, N day/night, H panel, Esc quit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(session, session_path);
    event_loop.run_app(&mut app)?;

    log::info!("goodbye");
    Ok(())
}
