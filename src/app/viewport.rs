use crate::render::{FrameToken, Viewport};
use std::sync::Arc;
use winit::window::Window;

/// winit window as a render-loop viewport. Frame requests map to
/// `request_redraw`; a cancelled token makes the next redraw a no-op.
pub struct WindowViewport {
    window: Arc<Window>,
    next_token: u64,
    listening: bool,
}

impl WindowViewport {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_token: 0,
            listening: false,
        }
    }

    /// Whether pointer and resize events should reach the viewer.
    pub fn is_listening(&self) -> bool {
        self.listening
    }
}

impl Viewport for WindowViewport {
    fn pixel_size(&self) -> Option<(u32, u32)> {
        let size = self.window.inner_size();
        Some((size.width, size.height))
    }

    fn request_frame(&mut self) -> FrameToken {
        self.next_token += 1;
        self.window.request_redraw();
        FrameToken(self.next_token)
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        // winit has no way to revoke a redraw request; the manager drops the
        // token so the callback draws nothing
        log::debug!("cancelled frame {}", token.0);
    }

    fn attach_listeners(&mut self) {
        self.listening = true;
    }

    fn detach_listeners(&mut self) {
        self.listening = false;
    }
}
