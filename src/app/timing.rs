use std::time::{Duration, Instant};
use winit::window::Window;

/// Frame cadence and render cost, reported in the window title twice a second.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_report_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_report_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_base_title(&mut self, base_title: String) {
        self.base_title = base_title;
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Counts one presented frame. Returns the title to show when a report is due.
    pub fn tick(&mut self, now: Instant) -> Option<String> {
        let dt = match self.last_frame_time {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::from_millis(16),
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt.as_secs_f32();

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_report_time);
        if elapsed.as_secs_f32() < 0.5 {
            return None;
        }
        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.last_report_time = now;
        Some(format!(
            "{} - {:.1} fps (render {:.2} ms)",
            self.base_title, fps, self.render_ms
        ))
    }

    pub fn update(&mut self, window: &Window, now: Instant) {
        if let Some(title) = self.tick(now) {
            window.set_title(&title);
        }
    }
}
