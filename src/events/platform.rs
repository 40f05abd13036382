//! winit-backed event source and window factory
//!
//! winit normally owns the main loop. Here the loop is pumped with a zero
//! timeout once per poll cycle, so the application keeps its own
//! poll → update → render loop and events are pulled like any other
//! [`EventSource`].

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use super::{Event, EventSource};
use crate::core::{ConstructionError, WindowConfig};
use crate::window::GameWindow;

// The window is usually created on the first pump; a few more cover
// platforms that deliver `resumed` late.
const WINDOW_CREATION_PUMPS: usize = 16;

/// Owns the platform event loop and translates its events.
pub struct Platform {
    event_loop: EventLoop<()>,
    pending: VecDeque<Event>,
    pumped: bool,
    exited: bool,
}

impl Platform {
    pub fn new() -> Result<Self, ConstructionError> {
        let event_loop =
            EventLoop::new().map_err(|e| ConstructionError::EventLoop(e.to_string()))?;
        info!(target: "platform", "Event loop created");
        Ok(Self {
            event_loop,
            pending: VecDeque::new(),
            pumped: false,
            exited: false,
        })
    }

    /// Creates a window described by `config`.
    ///
    /// Events that arrive while waiting for the window are kept and returned
    /// by later polls.
    pub fn create_window(
        &mut self,
        config: &WindowConfig,
    ) -> Result<GameWindow, ConstructionError> {
        let mut attributes = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);
        if config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let mut handler = PumpHandler::new(&mut self.pending);
        handler.window_request = Some(attributes);

        for _ in 0..WINDOW_CREATION_PUMPS {
            let status = self
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut handler);
            if let Some(created) = handler.created.take() {
                let window = created.map_err(ConstructionError::Window)?;
                return Ok(GameWindow::new(window, config.fullscreen));
            }
            if let PumpStatus::Exit(code) = status {
                self.exited = true;
                return Err(ConstructionError::Window(format!(
                    "event loop exited with code {code} before the window was created"
                )));
            }
        }

        Err(ConstructionError::Window(
            "platform never became ready to create a window".to_string(),
        ))
    }

    /// Whether the platform loop has shut down.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    fn pump(&mut self) {
        if self.exited {
            return;
        }
        let mut handler = PumpHandler::new(&mut self.pending);
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut handler);
        if let PumpStatus::Exit(code) = status {
            info!(target: "platform", "Event loop exited with code {}", code);
            self.exited = true;
            self.pending.push_back(Event::Quit);
        }
    }
}

impl EventSource for Platform {
    fn poll_event(&mut self) -> Option<Event> {
        if self.pending.is_empty() && !self.pumped {
            self.pump();
            self.pumped = true;
        }
        let event = self.pending.pop_front();
        if event.is_none() {
            self.pumped = false;
        }
        event
    }
}

struct PumpHandler<'a> {
    pending: &'a mut VecDeque<Event>,
    window_request: Option<WindowAttributes>,
    created: Option<Result<Window, String>>,
}

impl<'a> PumpHandler<'a> {
    fn new(pending: &'a mut VecDeque<Event>) -> Self {
        Self {
            pending,
            window_request: None,
            created: None,
        }
    }

    fn create_requested_window(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attributes) = self.window_request.take() {
            let created = event_loop.create_window(attributes).map_err(|e| e.to_string());
            match &created {
                Ok(window) => debug!(target: "platform", "Window {:?} created", window.id()),
                Err(e) => warn!(target: "platform", "Window creation failed: {}", e),
            }
            self.created = Some(created);
        }
    }
}

impl ApplicationHandler for PumpHandler<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        self.create_requested_window(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(event) = translate_window_event(&event) {
            self.pending.push_back(event);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.create_requested_window(event_loop);
    }
}

fn translate_window_event(event: &WindowEvent) -> Option<Event> {
    match event {
        WindowEvent::CloseRequested => Some(Event::Quit),
        WindowEvent::Resized(size) => Some(Event::Resized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::KeyboardInput { event, .. } => {
            translate_key(event.physical_key, event.state, event.repeat)
        }
        _ => None,
    }
}

/// Keys winit cannot identify are dropped.
fn translate_key(physical_key: PhysicalKey, state: ElementState, repeat: bool) -> Option<Event> {
    let PhysicalKey::Code(key) = physical_key else {
        return None;
    };
    Some(match state {
        ElementState::Pressed => Event::KeyDown { key, repeat },
        ElementState::Released => Event::KeyUp { key },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Key;
    use winit::dpi::PhysicalSize;
    use winit::keyboard::NativeKeyCode;

    #[test]
    fn test_translate_pressed_key() {
        let event = translate_key(PhysicalKey::Code(Key::KeyW), ElementState::Pressed, false);
        assert_eq!(
            event,
            Some(Event::KeyDown {
                key: Key::KeyW,
                repeat: false
            })
        );
    }

    #[test]
    fn test_translate_repeat_and_release() {
        let repeat = translate_key(PhysicalKey::Code(Key::KeyA), ElementState::Pressed, true);
        assert_eq!(
            repeat,
            Some(Event::KeyDown {
                key: Key::KeyA,
                repeat: true
            })
        );

        let up = translate_key(PhysicalKey::Code(Key::KeyA), ElementState::Released, false);
        assert_eq!(up, Some(Event::KeyUp { key: Key::KeyA }));
    }

    #[test]
    fn test_unidentified_key_is_dropped() {
        let event = translate_key(
            PhysicalKey::Unidentified(NativeKeyCode::Unidentified),
            ElementState::Pressed,
            false,
        );
        assert_eq!(event, None);
    }

    #[test]
    fn test_translate_window_events() {
        assert_eq!(
            translate_window_event(&WindowEvent::CloseRequested),
            Some(Event::Quit)
        );
        assert_eq!(
            translate_window_event(&WindowEvent::Resized(PhysicalSize::new(800, 600))),
            Some(Event::Resized {
                width: 800,
                height: 600
            })
        );
        assert_eq!(translate_window_event(&WindowEvent::RedrawRequested), None);
    }
}
