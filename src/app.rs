//! Sample application: a colored square moved with WASD, Q quits

use crate::{
    core::{AppConfig, Clock, EngineError, MonotonicTime, TimeSource},
    events::{Event, EventKind, EventListener, EventSource, EventSystem, Key, ListenerError},
    input::Keyboard,
    math::{Vec2, Vec4},
    renderer::{GameRenderer, GpuBackend, PipelineId, RenderError, Vertex},
};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shader library used by the sample, compiled at startup.
pub const SQUARE_SHADER: &str = include_str!("shaders/square.metal");

/// Two triangles centered on a point, in pixels.
#[derive(Debug, Clone)]
pub struct Square {
    center: Vec2,
    vertices: [Vertex; 6],
}

impl Square {
    pub fn new(half_extent: f32, color: Vec4) -> Self {
        let h = half_extent;
        let corner = |x: f32, y: f32| Vertex::new(Vec2::new(x, y), color);
        Self {
            center: Vec2::zero(),
            vertices: [
                corner(h, h),
                corner(h, -h),
                corner(-h, -h),
                corner(-h, h),
                corner(h, h),
                corner(-h, -h),
            ],
        }
    }

    pub fn move_by(&mut self, offset: Vec2) {
        self.center = self.center.add(&offset);
        for vertex in &mut self.vertices {
            vertex.position = vertex.position.add(&offset);
        }
    }

    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }
}

/// Unit direction from the held WASD keys; W is up.
#[must_use]
pub fn movement_direction(keyboard: &Keyboard) -> Vec2 {
    let mut direction = Vec2::zero();
    if keyboard.hold(Key::KeyW) {
        direction.y += 1.0;
    }
    if keyboard.hold(Key::KeyS) {
        direction.y -= 1.0;
    }
    if keyboard.hold(Key::KeyA) {
        direction.x -= 1.0;
    }
    if keyboard.hold(Key::KeyD) {
        direction.x += 1.0;
    }
    direction.normalize()
}

/// Raises the exit flag on a quit request or a Q key press.
#[derive(Debug, Default)]
pub struct ExitListener {
    exited: bool,
}

impl ExitListener {
    #[must_use]
    pub fn exited(&self) -> bool {
        self.exited
    }
}

impl EventListener for ExitListener {
    fn listen(&mut self, event: &Event) -> Result<(), ListenerError> {
        match event {
            Event::Quit => {
                info!("Quit requested");
                self.exited = true;
            }
            Event::KeyDown { key: Key::KeyQ, .. } => {
                info!("Q pressed, exiting");
                self.exited = true;
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Exit,
}

/// Per-frame state of the sample: input, simulation and rendering.
pub struct Game<B: GpuBackend, S: TimeSource = MonotonicTime> {
    renderer: GameRenderer<B>,
    pipeline: PipelineId,
    events: EventSystem,
    keyboard: Keyboard,
    exit: Rc<RefCell<ExitListener>>,
    pending_resize: Rc<Cell<Option<(u32, u32)>>>,
    last_resize: Option<(u32, u32)>,
    clock: Clock<S>,
    square: Square,
    speed: f32,
}

impl<B: GpuBackend> Game<B, MonotonicTime> {
    pub fn new(renderer: GameRenderer<B>, config: &AppConfig) -> Result<Self, RenderError> {
        Self::with_clock(renderer, config, Clock::new())
    }
}

impl<B: GpuBackend, S: TimeSource> Game<B, S> {
    /// Loads the square pipeline and wires up the listeners.
    pub fn with_clock(
        mut renderer: GameRenderer<B>,
        config: &AppConfig,
        clock: Clock<S>,
    ) -> Result<Self, RenderError> {
        let library = renderer.add_library(SQUARE_SHADER)?;
        let vertex = renderer.load_shader_from_library(library, "vertexShader")?;
        let fragment = renderer.load_shader_from_library(library, "fragmentShader")?;
        let pipeline = renderer.create_pipeline(vertex, fragment)?;

        let mut events = EventSystem::new();
        let keyboard = Keyboard::new(&mut events);

        let exit = Rc::new(RefCell::new(ExitListener::default()));
        events.add_listener(exit.clone(), EventKind::Quit);
        events.add_listener(exit.clone(), EventKind::KeyDown);

        let pending_resize = Rc::new(Cell::new(None));
        let resize_slot = pending_resize.clone();
        events.add_fn(EventKind::Resized, move |event: &Event| {
            if let Event::Resized { width, height } = *event {
                resize_slot.set(Some((width, height)));
            }
            Ok(())
        });

        Ok(Self {
            renderer,
            pipeline,
            events,
            keyboard,
            exit,
            pending_resize,
            last_resize: None,
            clock,
            square: Square::new(config.square_half_extent, config.square_color),
            speed: config.square_speed,
        })
    }

    /// Runs one poll → update → render cycle.
    pub fn frame<E>(&mut self, source: &mut E) -> Result<FrameOutcome, EngineError>
    where
        E: EventSource + ?Sized,
    {
        self.clock.update();
        self.keyboard.reset();
        self.events.process_events(source)?;

        if self.exit.borrow().exited() {
            return Ok(FrameOutcome::Exit);
        }

        if let Some((width, height)) = self.pending_resize.take() {
            debug!("Viewport resized to {}x{}", width, height);
            self.renderer.set_viewport(width, height);
            self.last_resize = Some((width, height));
        }

        let distance = self.speed * self.clock.delta();
        let direction = movement_direction(&self.keyboard);
        if direction != Vec2::zero() {
            self.square.move_by(direction.scale(distance));
        }

        self.renderer.begin_frame()?;
        if let Err(e) = self.renderer.draw_vertices(self.square.vertices(), self.pipeline) {
            warn!("Dropping frame after draw failure: {}", e);
            self.renderer.abort_frame();
            return Err(e.into());
        }
        self.renderer.end_frame()?;

        Ok(FrameOutcome::Continue)
    }

    /// The most recent resize applied to the renderer, cleared on read.
    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.last_resize.take()
    }

    #[must_use]
    pub fn square(&self) -> &Square {
        &self.square
    }

    #[must_use]
    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    #[must_use]
    pub fn renderer(&self) -> &GameRenderer<B> {
        &self.renderer
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }
}

pub struct App;

impl App {
    pub fn run() -> Result<(), EngineError> {
        Self::run_with(&AppConfig::default())
    }

    #[cfg(target_os = "macos")]
    pub fn run_with(config: &AppConfig) -> Result<(), EngineError> {
        use crate::events::Platform;
        use crate::renderer::{MetalBackend, Viewport};

        let mut platform = Platform::new()?;
        let mut window = platform.create_window(&config.window)?;

        let backend = MetalBackend::new(&window, config.clear_color)?;
        let (width, height) = window.viewport();
        let renderer = GameRenderer::new(backend, Viewport::new(width, height));
        let mut game = Game::new(renderer, config)?;
        info!("Renderer initialized successfully");

        while game.frame(&mut platform)? == FrameOutcome::Continue {
            if platform.has_exited() {
                break;
            }
            if let Some((width, height)) = game.take_resize() {
                window.refresh();
                window.set_viewport(width, height);
            }
        }

        info!("Exiting after {} frames", game.frame_count());
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    pub fn run_with(_config: &AppConfig) -> Result<(), EngineError> {
        Err(crate::core::ConstructionError::Unsupported("the Metal renderer requires macOS").into())
    }
}
