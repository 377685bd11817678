use crate::render::CameraSettings;
use crate::scene::Rgb;

/// Viewer tuning, embedded as the optional `config` block of a session file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraSettings,
    pub clear_color: Rgb,
    /// Pointer travel, in pixels, below which a press-release counts as a click.
    pub click_slop_px: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            clear_color: Rgb::new(0.1, 0.1, 0.2),
            click_slop_px: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r##"{"camera": {"max_distance": 30.0}, "clear_color": "#000000"}"##).unwrap();
        assert_eq!(config.camera.max_distance, 30.0);
        assert_eq!(config.camera.zoom_speed, CameraSettings::default().zoom_speed);
        assert_eq!(config.clear_color, Rgb::new(0.0, 0.0, 0.0));
        assert_eq!(config.click_slop_px, 4.0);
    }
}
