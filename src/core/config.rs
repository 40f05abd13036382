//! Window and sample application settings

use crate::math::Vec4;

/// How the game window is created.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Borderless fullscreen on the current monitor. The monitor's size
    /// replaces `width`/`height`.
    pub fullscreen: bool,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Game".to_string(),
            width: 1280,
            height: 720,
            fullscreen: true,
            resizable: true,
        }
    }
}

impl WindowConfig {
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }
}

/// Settings for the moving-square sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub window: WindowConfig,
    /// Half the side length of the square, in pixels.
    pub square_half_extent: f32,
    /// Pixels per millisecond while a movement key is held.
    pub square_speed: f32,
    pub square_color: Vec4,
    pub clear_color: Vec4,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            square_half_extent: 10.0,
            square_speed: 0.5,
            square_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_square_speed(mut self, speed: f32) -> Self {
        self.square_speed = speed;
        self
    }

    #[must_use]
    pub fn with_square_color(mut self, color: Vec4) -> Self {
        self.square_color = color;
        self
    }
}
