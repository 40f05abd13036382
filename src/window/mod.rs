use log::info;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// The game's platform window plus its viewport and position.
///
/// Created through [`Platform::create_window`](crate::events::Platform::create_window).
/// Dropping it destroys the window.
pub struct GameWindow {
    window: Window,
    fullscreen: bool,
    viewport: (u32, u32),
    position: (i32, i32),
}

impl GameWindow {
    pub(crate) fn new(window: Window, fullscreen: bool) -> Self {
        let size = if fullscreen {
            // Fullscreen takes the monitor's mode size, which can lag behind
            // inner_size until the transition finishes.
            window
                .current_monitor()
                .map(|monitor| monitor.size())
                .unwrap_or_else(|| window.inner_size())
        } else {
            window.inner_size()
        };

        let mut game_window = Self {
            window,
            fullscreen,
            viewport: viewport_of(size),
            position: (0, 0),
        };
        game_window.refresh_position();
        info!(
            target: "window",
            "Window ready: {}x{} at {:?}, fullscreen: {}",
            game_window.viewport.0,
            game_window.viewport.1,
            game_window.position,
            fullscreen
        );
        game_window
    }

    /// Drawable size in physical pixels.
    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Top-left corner of the window on the desktop. `(0, 0)` where the
    /// platform cannot report it.
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Records a new drawable size, e.g. from an `Event::Resized`.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    /// Re-reads size and position from the platform.
    pub fn refresh(&mut self) {
        self.viewport = viewport_of(self.window.inner_size());
        self.refresh_position();
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// The underlying winit window, for surface creation.
    #[must_use]
    pub fn raw(&self) -> &Window {
        &self.window
    }

    fn refresh_position(&mut self) {
        self.position = self
            .window
            .outer_position()
            .map(|p| (p.x, p.y))
            .unwrap_or((0, 0));
    }
}

fn viewport_of(size: PhysicalSize<u32>) -> (u32, u32) {
    (size.width.max(1), size.height.max(1))
}
