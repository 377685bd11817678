use crate::render::EguiFrameOutput;
use crate::ui::{UiActions, UiSnapshot, UiState};
use egui_winit::winit::event::WindowEvent;
use winit::window::Window;

/// Feeds winit input to egui and runs the room panel once per redraw.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        context.set_visuals(egui::Visuals::dark());
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            window.theme(),
            None,
        );
        Self {
            context,
            winit_state,
        }
    }

    /// Passes `event` to egui. Returns true when the viewer should not act on
    /// it: keys while a text field has focus, pointer input over the panel.
    pub fn captures(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let consumed = self.winit_state.on_window_event(window, event).consumed;
        match event {
            WindowEvent::KeyboardInput { .. } => consumed || self.context.wants_keyboard_input(),
            WindowEvent::MouseInput { .. } | WindowEvent::MouseWheel { .. } => {
                consumed
                    || self.context.wants_pointer_input()
                    || self.context.is_pointer_over_area()
            }
            _ => false,
        }
    }

    /// Runs the panel against `snapshot` and tessellates the result for the
    /// GPU overlay.
    pub fn show_panel(
        &mut self,
        window: &Window,
        ui: &mut UiState,
        snapshot: &UiSnapshot<'_>,
    ) -> (EguiFrameOutput, UiActions) {
        let mut actions = UiActions::default();
        let raw_input = self.winit_state.take_egui_input(window);
        let output = self.context.run(raw_input, |ctx| actions = ui.show(ctx, snapshot));
        self.winit_state
            .handle_platform_output(window, output.platform_output);

        let pixels_per_point = self.context.pixels_per_point();
        let size = window.inner_size();
        let frame = EguiFrameOutput {
            clipped_primitives: self.context.tessellate(output.shapes, pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point,
            screen_size_px: [size.width.max(1), size.height.max(1)],
        };
        (frame, actions)
    }
}
