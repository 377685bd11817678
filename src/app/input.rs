use winit::event::MouseScrollDelta;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixels of zoom per wheel line.
const LINE_DELTA_PX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ResetCamera,
    ToggleDayNight,
    TogglePanel,
    Quit,
}

pub fn key_action(key: PhysicalKey) -> Option<KeyAction> {
    match key {
        PhysicalKey::Code(KeyCode::KeyR) => Some(KeyAction::ResetCamera),
        PhysicalKey::Code(KeyCode::KeyN) => Some(KeyAction::ToggleDayNight),
        PhysicalKey::Code(KeyCode::KeyH) => Some(KeyAction::TogglePanel),
        PhysicalKey::Code(KeyCode::Escape) => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Wheel delta in the DOM convention: positive zooms out.
pub fn wheel_delta_y(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_DELTA_PX,
        MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerRelease {
    /// Pointer barely moved between press and release.
    Click { x: f32, y: f32 },
    DragEnd,
}

/// Tells a click from an orbit drag on the primary button.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerState {
    cursor: Option<(f32, f32)>,
    press: Option<(f32, f32)>,
    travelled: f32,
}

impl PointerState {
    /// Returns the new position while the button is held.
    pub fn moved(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        if let (Some((lx, ly)), true) = (self.cursor, self.press.is_some()) {
            self.travelled += ((x - lx).powi(2) + (y - ly).powi(2)).sqrt();
        }
        self.cursor = Some((x, y));
        self.press.map(|_| (x, y))
    }

    pub fn pressed(&mut self) -> Option<(f32, f32)> {
        let at = self.cursor?;
        self.press = Some(at);
        self.travelled = 0.0;
        Some(at)
    }

    pub fn released(&mut self, click_slop_px: f32) -> Option<PointerRelease> {
        let (x, y) = self.press.take()?;
        if self.travelled <= click_slop_px {
            Some(PointerRelease::Click { x, y })
        } else {
            Some(PointerRelease::DragEnd)
        }
    }

    pub fn left(&mut self) {
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_wiggle_is_a_click() {
        let mut pointer = PointerState::default();
        pointer.moved(100.0, 100.0);
        assert_eq!(pointer.pressed(), Some((100.0, 100.0)));
        pointer.moved(101.0, 101.0);
        pointer.moved(100.0, 100.0);
        assert_eq!(
            pointer.released(4.0),
            Some(PointerRelease::Click { x: 100.0, y: 100.0 })
        );
    }

    #[test]
    fn long_travel_is_a_drag() {
        let mut pointer = PointerState::default();
        pointer.moved(0.0, 0.0);
        pointer.pressed();
        assert_eq!(pointer.moved(30.0, 0.0), Some((30.0, 0.0)));
        assert_eq!(pointer.released(4.0), Some(PointerRelease::DragEnd));
        assert_eq!(pointer.moved(40.0, 0.0), None);
    }

    #[test]
    fn press_without_cursor_is_ignored() {
        let mut pointer = PointerState::default();
        assert_eq!(pointer.pressed(), None);
        assert_eq!(pointer.released(4.0), None);
    }

    #[test]
    fn wheel_lines_scale_to_pixels() {
        assert_eq!(wheel_delta_y(MouseScrollDelta::LineDelta(0.0, -1.0)), 100.0);
        assert_eq!(key_action(PhysicalKey::Code(KeyCode::KeyN)), Some(KeyAction::ToggleDayNight));
        assert_eq!(key_action(PhysicalKey::Code(KeyCode::KeyQ)), None);
    }
}
