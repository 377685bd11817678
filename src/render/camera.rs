use crate::scene::Dimensions;
use glam::{Mat4, Vec3};
use std::f32::consts::PI;

/// Orbit tuning. Loaded from the session file's `config.camera` block.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    /// Distance units per wheel delta unit.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Keeps the polar angle away from the poles.
    pub polar_epsilon: f32,
    /// Lowest eye height above the floor.
    pub min_height: f32,
    pub default_azimuth: f32,
    pub default_polar: f32,
    pub default_distance: f32,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_speed: 0.01,
            min_distance: 2.0,
            max_distance: 20.0,
            polar_epsilon: 0.05,
            min_height: 0.5,
            default_azimuth: 0.0,
            default_polar: 1.15,
            default_distance: 8.0,
            fov_y_deg: 50.0,
            near: 0.1,
            far: 200.0,
        }
    }
}

/// Snapshot used for drawing and picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl CameraView {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn proj(&self, width: f32, height: f32) -> Mat4 {
        let aspect = width / height.max(1.0);
        Mat4::perspective_rh(self.fov_y, aspect, self.znear, self.zfar)
    }

    pub fn view_proj(&self, width: f32, height: f32) -> Mat4 {
        self.proj(width, height) * self.view()
    }
}

/// Spherical orbit around a fixed target.
///
/// Azimuth is measured around +Y starting at +Z, polar from +Y downward.
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    azimuth: f32,
    polar: f32,
    distance: f32,
    target: Vec3,
    position: Vec3,
    drag_anchor: Option<(f32, f32)>,
    settings: CameraSettings,
}

impl CameraController {
    pub fn new(target: Vec3, settings: CameraSettings) -> Self {
        let mut camera = Self {
            azimuth: settings.default_azimuth,
            polar: settings.default_polar,
            distance: settings.default_distance,
            target,
            position: target,
            drag_anchor: None,
            settings,
        };
        camera.reset();
        camera
    }

    /// Orbits the room center at half height.
    pub fn for_room(dimensions: Dimensions, settings: CameraSettings) -> Self {
        Self::new(Vec3::new(0.0, dimensions.height * 0.5, 0.0), settings)
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.drag_anchor = Some((x, y));
    }

    /// Applies the pointer delta since the last drag event. Returns false when
    /// no drag is in progress.
    pub fn drag(&mut self, x: f32, y: f32) -> bool {
        let Some((last_x, last_y)) = self.drag_anchor else {
            return false;
        };
        let k = self.settings.rotate_speed;
        self.azimuth -= (x - last_x) * k;
        self.polar += (y - last_y) * k;
        self.drag_anchor = Some((x, y));
        self.update_position();
        true
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn zoom(&mut self, delta_y: f32) {
        if !delta_y.is_finite() {
            return;
        }
        let s = &self.settings;
        self.distance = (self.distance + delta_y * s.zoom_speed).clamp(s.min_distance, s.max_distance);
        self.update_position();
    }

    pub fn reset(&mut self) {
        let s = &self.settings;
        self.azimuth = s.default_azimuth;
        self.polar = s.default_polar;
        self.distance = s.default_distance.clamp(s.min_distance, s.max_distance);
        self.drag_anchor = None;
        self.update_position();
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            eye: self.position,
            target: self.target,
            up: Vec3::Y,
            fov_y: self.settings.fov_y_deg.to_radians(),
            znear: self.settings.near,
            zfar: self.settings.far,
        }
    }

    fn update_position(&mut self) {
        self.polar = self.clamped_polar(self.polar);
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.position = self.target + self.distance * Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a);
    }

    /// Polar stays in `[eps, PI - eps]` and low enough that the eye keeps
    /// `min_height` above the floor.
    fn clamped_polar(&self, polar: f32) -> f32 {
        let eps = self.settings.polar_epsilon;
        let polar = if polar.is_finite() { polar } else { self.settings.default_polar };
        let ratio = (self.settings.min_height - self.target.y) / self.distance;
        let height_limit = ratio.clamp(-1.0, 1.0).acos();
        polar.clamp(eps, PI - eps).min(height_limit).max(eps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_camera() -> CameraController {
        CameraController::for_room(Dimensions::new(14.0, 12.0, 9.0), CameraSettings::default())
    }

    fn assert_within_limits(camera: &CameraController) {
        let s = camera.settings();
        assert!(camera.polar() >= s.polar_epsilon - 1e-6);
        assert!(camera.polar() <= PI - s.polar_epsilon + 1e-6);
        assert!(camera.distance() >= s.min_distance && camera.distance() <= s.max_distance);
        assert!(camera.position().y >= s.min_height - 1e-4);
        let radius = (camera.position() - camera.target()).length();
        assert!((radius - camera.distance()).abs() < 1e-3);
    }

    #[test]
    fn clamps_hold_for_any_input_sequence() {
        let mut camera = room_camera();
        let mut seed: u32 = 0x2545_f491;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % 2001) as f32 - 1000.0
        };

        camera.begin_drag(0.0, 0.0);
        for step in 0..500 {
            if step % 3 == 0 {
                camera.zoom(next());
            } else {
                camera.drag(next(), next());
            }
            assert_within_limits(&camera);
        }
    }

    #[test]
    fn wheel_zoom_adds_scaled_delta() {
        let mut camera = room_camera();
        assert_eq!(camera.distance(), 8.0);
        camera.zoom(120.0);
        assert!((camera.distance() - 9.2).abs() < 1e-5);
        camera.zoom(10_000.0);
        assert_eq!(camera.distance(), 20.0);
        camera.zoom(-10_000.0);
        assert_eq!(camera.distance(), 2.0);
    }

    #[test]
    fn drag_moves_azimuth_and_polar() {
        let mut camera = room_camera();
        camera.begin_drag(100.0, 100.0);
        assert!(camera.drag(120.0, 90.0));
        assert!((camera.azimuth() - (-20.0 * 0.005)).abs() < 1e-6);
        assert!((camera.polar() - (1.15 - 10.0 * 0.005)).abs() < 1e-6);

        // the reference point follows the pointer
        assert!(camera.drag(120.0, 90.0));
        assert!((camera.azimuth() - (-0.1)).abs() < 1e-6);
    }

    #[test]
    fn drag_without_begin_is_ignored() {
        let mut camera = room_camera();
        let before = camera.position();
        assert!(!camera.drag(500.0, 500.0));
        assert_eq!(camera.position(), before);

        camera.begin_drag(0.0, 0.0);
        camera.end_drag();
        assert!(!camera.drag(50.0, 50.0));
        assert_eq!(camera.position(), before);
    }

    #[test]
    fn eye_never_dips_below_min_height() {
        let mut camera = room_camera();
        camera.zoom(1_000.0);
        camera.begin_drag(0.0, 0.0);
        camera.drag(0.0, 5_000.0);
        assert!(camera.position().y >= camera.settings().min_height - 1e-4);
        assert!(camera.polar() < PI - camera.settings().polar_epsilon);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut camera = room_camera();
        let home = camera.position();
        camera.begin_drag(0.0, 0.0);
        camera.drag(300.0, -200.0);
        camera.zoom(500.0);
        camera.reset();
        assert_eq!(camera.azimuth(), 0.0);
        assert_eq!(camera.polar(), 1.15);
        assert_eq!(camera.distance(), 8.0);
        assert!((camera.position() - home).length() < 1e-5);
        assert!(!camera.is_dragging());
    }

    #[test]
    fn default_view_looks_into_the_room_from_the_front() {
        let view = room_camera().view();
        assert!(view.eye.z > 0.0);
        assert!((view.target - Vec3::new(0.0, 4.5, 0.0)).length() < 1e-6);
        assert!(view.view_proj(800.0, 600.0).is_finite());
    }
}
