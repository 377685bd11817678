use super::{Light, Rgb, Scene};
use glam::Vec3;

pub const DAY_AMBIENT: f32 = 0.4;
pub const NIGHT_AMBIENT: f32 = 0.2;
/// Sun strength at night relative to the intensity control.
pub const NIGHT_SUN_FACTOR: f32 = 0.3;
pub const MIN_INTENSITY: f32 = 0.1;
pub const MAX_INTENSITY: f32 = 1.0;

const DAY_SUN: Rgb = Rgb::WHITE;
const NIGHT_SUN: Rgb = Rgb::new(0.6, 0.7, 1.0);
const CEILING_LIGHT: Rgb = Rgb::new(1.0, 0.92, 0.8);
const ACCENT_LIGHT: Rgb = Rgb::new(1.0, 0.85, 0.7);
const CEILING_INTENSITY: f32 = 0.6;
const ACCENT_INTENSITY: f32 = 0.35;

/// Host-facing lighting control.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LightingState {
    pub is_day: bool,
    pub intensity: f32,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            is_day: true,
            intensity: 0.8,
        }
    }
}

pub fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        return MIN_INTENSITY;
    }
    intensity.clamp(MIN_INTENSITY, MAX_INTENSITY)
}

/// Replaces the scene's light list. Calling it twice with the same inputs
/// leaves the same lights.
pub fn apply(scene: &mut Scene, is_day: bool, intensity: f32) {
    let intensity = clamp_intensity(intensity);
    let d = scene.dimensions();
    let range = d.max_extent() * 1.5;

    let (ambient, sun_color, sun_intensity) = if is_day {
        (DAY_AMBIENT, DAY_SUN, intensity)
    } else {
        (NIGHT_AMBIENT, NIGHT_SUN, intensity * NIGHT_SUN_FACTOR)
    };

    scene.set_lights(vec![
        Light::Ambient {
            color: Rgb::WHITE,
            intensity: ambient,
        },
        Light::Directional {
            color: sun_color,
            intensity: sun_intensity,
            direction: Vec3::new(-0.5, -1.0, -0.3).normalize(),
        },
        Light::Point {
            color: CEILING_LIGHT,
            intensity: CEILING_INTENSITY,
            position: Vec3::new(0.0, d.height * 0.95, 0.0),
            range,
        },
        Light::Point {
            color: ACCENT_LIGHT,
            intensity: ACCENT_INTENSITY,
            position: Vec3::new(d.length * 0.4, d.height * 0.75, -d.width * 0.4),
            range,
        },
    ]);
    log::debug!(
        "lighting applied: {} at intensity {:.2}",
        if is_day { "day" } else { "night" },
        intensity
    );
}

pub fn apply_state(scene: &mut Scene, state: LightingState) {
    apply(scene, state.is_day, state.intensity);
}
