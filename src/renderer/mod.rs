//! Resource tables and frame lifecycle on top of a GPU backend
//!
//! [`GameRenderer`] keeps append-only tables of shader libraries, shader
//! functions and pipelines, handing out typed handles, and enforces the
//! Idle → Recording → Idle frame cycle. The GPU work itself is done by a
//! [`GpuBackend`]; [`MetalBackend`] is the macOS implementation.

#[cfg(target_os = "macos")]
pub mod metal;

#[cfg(target_os = "macos")]
pub use metal::MetalBackend;

use log::{debug, trace};
use thiserror::Error;

use crate::core::ConstructionError;
use crate::math::{Vec2, Vec4};

/// A 2D vertex in pixel coordinates centered on the viewport.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec2,
    pub color: Vec4,
}

impl Vertex {
    #[must_use]
    pub const fn new(position: Vec2, color: Vec4) -> Self {
        Self { position, color }
    }
}

/// Drawable size passed to shaders alongside the vertices.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                Self(index)
            }
        }
    };
}

resource_handle!(
    /// Handle to a shader library in a [`GameRenderer`].
    LibraryId
);
resource_handle!(
    /// Handle to a shader function in a [`GameRenderer`].
    ShaderId
);
resource_handle!(
    /// Handle to a render pipeline in a [`GameRenderer`].
    PipelineId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Idle,
    Recording,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: FrameStatus,
    },

    #[error("No {resource} with handle {index} (have {len})")]
    OutOfRange {
        resource: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("Frame failed: {0}")]
    Frame(String),
}

/// The GPU operations a [`GameRenderer`] needs.
pub trait GpuBackend {
    type Library;
    type Shader;
    type Pipeline;
    /// Recording context for one frame.
    type Frame;

    fn load_library(&mut self, source: &str) -> Result<Self::Library, ConstructionError>;

    fn load_shader(
        &mut self,
        library: &Self::Library,
        name: &str,
    ) -> Result<Self::Shader, ConstructionError>;

    fn create_pipeline(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Pipeline, ConstructionError>;

    /// Acquires a drawable and opens a recording context.
    fn begin_frame(&mut self, viewport: Viewport) -> Result<Self::Frame, String>;

    /// Records one triangle-list draw of `vertices`.
    fn draw(
        &mut self,
        frame: &mut Self::Frame,
        pipeline: &Self::Pipeline,
        vertices: &[Vertex],
        viewport: Viewport,
    ) -> Result<(), String>;

    /// Closes recording, presents the drawable and submits.
    fn end_frame(&mut self, frame: Self::Frame) -> Result<(), String>;

    /// Closes recording without presenting. The default drops the frame.
    fn abort_frame(&mut self, frame: Self::Frame) {
        drop(frame);
    }

    fn resize(&mut self, _viewport: Viewport) {}
}

enum FrameState<F> {
    Idle,
    Recording(F),
}

/// Owns a backend, its resource tables and the current frame.
pub struct GameRenderer<B: GpuBackend> {
    backend: B,
    viewport: Viewport,
    libraries: Vec<B::Library>,
    shaders: Vec<B::Shader>,
    pipelines: Vec<B::Pipeline>,
    state: FrameState<B::Frame>,
}

impl<B: GpuBackend> GameRenderer<B> {
    pub fn new(backend: B, viewport: Viewport) -> Self {
        Self {
            backend,
            viewport,
            libraries: Vec::new(),
            shaders: Vec::new(),
            pipelines: Vec::new(),
            state: FrameState::Idle,
        }
    }

    /// Compiles a shader library and returns its handle.
    pub fn add_library(&mut self, source: &str) -> Result<LibraryId, RenderError> {
        let library = self.backend.load_library(source)?;
        self.libraries.push(library);
        let id = LibraryId(self.libraries.len() - 1);
        debug!(target: "renderer", "Loaded library {}", id.0);
        Ok(id)
    }

    /// Looks up the function `name` in `library`.
    pub fn load_shader_from_library(
        &mut self,
        library: LibraryId,
        name: &str,
    ) -> Result<ShaderId, RenderError> {
        let lib = lookup(&self.libraries, library.0, "library")?;
        let shader = self.backend.load_shader(lib, name)?;
        self.shaders.push(shader);
        let id = ShaderId(self.shaders.len() - 1);
        debug!(target: "renderer", "Loaded shader '{}' as {}", name, id.0);
        Ok(id)
    }

    pub fn create_pipeline(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<PipelineId, RenderError> {
        let vertex_fn = lookup(&self.shaders, vertex.0, "shader")?;
        let fragment_fn = lookup(&self.shaders, fragment.0, "shader")?;
        let pipeline = self.backend.create_pipeline(vertex_fn, fragment_fn)?;
        self.pipelines.push(pipeline);
        let id = PipelineId(self.pipelines.len() - 1);
        debug!(target: "renderer", "Created pipeline {}", id.0);
        Ok(id)
    }

    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        if let FrameState::Recording(_) = self.state {
            return Err(RenderError::InvalidState {
                operation: "begin a frame",
                state: FrameStatus::Recording,
            });
        }
        let frame = self
            .backend
            .begin_frame(self.viewport)
            .map_err(RenderError::Frame)?;
        self.state = FrameState::Recording(frame);
        trace!(target: "renderer", "Frame begun");
        Ok(())
    }

    /// Draws `vertices` as a triangle list with `pipeline`.
    ///
    /// Only valid between [`begin_frame`](Self::begin_frame) and
    /// [`end_frame`](Self::end_frame).
    pub fn draw_vertices(
        &mut self,
        vertices: &[Vertex],
        pipeline: PipelineId,
    ) -> Result<(), RenderError> {
        let FrameState::Recording(frame) = &mut self.state else {
            return Err(RenderError::InvalidState {
                operation: "draw vertices",
                state: FrameStatus::Idle,
            });
        };
        let pipeline_state = lookup(&self.pipelines, pipeline.0, "pipeline")?;
        if vertices.is_empty() {
            return Ok(());
        }
        self.backend
            .draw(frame, pipeline_state, vertices, self.viewport)
            .map_err(RenderError::Frame)
    }

    /// Presents and submits the frame. The renderer is idle afterwards even
    /// if submission fails.
    pub fn end_frame(&mut self) -> Result<(), RenderError> {
        match std::mem::replace(&mut self.state, FrameState::Idle) {
            FrameState::Recording(frame) => {
                trace!(target: "renderer", "Frame ended");
                self.backend.end_frame(frame).map_err(RenderError::Frame)
            }
            FrameState::Idle => Err(RenderError::InvalidState {
                operation: "end a frame",
                state: FrameStatus::Idle,
            }),
        }
    }

    /// Discards the frame being recorded, leaving the renderer idle.
    ///
    /// Returns `false` if no frame was open.
    pub fn abort_frame(&mut self) -> bool {
        match std::mem::replace(&mut self.state, FrameState::Idle) {
            FrameState::Recording(frame) => {
                debug!(target: "renderer", "Frame aborted");
                self.backend.abort_frame(frame);
                true
            }
            FrameState::Idle => false,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width.max(1), height.max(1));
        self.backend.resize(self.viewport);
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn status(&self) -> FrameStatus {
        match self.state {
            FrameState::Idle => FrameStatus::Idle,
            FrameState::Recording(_) => FrameStatus::Recording,
        }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.status() == FrameStatus::Recording
    }

    #[must_use]
    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    #[must_use]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn lookup<'a, T>(
    table: &'a [T],
    index: usize,
    resource: &'static str,
) -> Result<&'a T, RenderError> {
    table.get(index).ok_or(RenderError::OutOfRange {
        resource,
        index,
        len: table.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        frames_begun: usize,
        draws: Vec<usize>,
        presented: usize,
        aborted: usize,
        fail_shader: bool,
        fail_draw: bool,
    }

    impl GpuBackend for CountingBackend {
        type Library = String;
        type Shader = String;
        type Pipeline = (String, String);
        type Frame = usize;

        fn load_library(&mut self, source: &str) -> Result<String, ConstructionError> {
            if source.is_empty() {
                return Err(ConstructionError::Library("empty source".to_string()));
            }
            Ok(source.to_string())
        }

        fn load_shader(
            &mut self,
            library: &String,
            name: &str,
        ) -> Result<String, ConstructionError> {
            if self.fail_shader {
                return Err(ConstructionError::Shader {
                    name: name.to_string(),
                });
            }
            Ok(format!("{library}::{name}"))
        }

        fn create_pipeline(
            &mut self,
            vertex: &String,
            fragment: &String,
        ) -> Result<(String, String), ConstructionError> {
            Ok((vertex.clone(), fragment.clone()))
        }

        fn begin_frame(&mut self, _viewport: Viewport) -> Result<usize, String> {
            self.frames_begun += 1;
            Ok(self.frames_begun)
        }

        fn draw(
            &mut self,
            _frame: &mut usize,
            _pipeline: &(String, String),
            vertices: &[Vertex],
            _viewport: Viewport,
        ) -> Result<(), String> {
            if self.fail_draw {
                return Err("draw failed".to_string());
            }
            self.draws.push(vertices.len());
            Ok(())
        }

        fn end_frame(&mut self, _frame: usize) -> Result<(), String> {
            self.presented += 1;
            Ok(())
        }

        fn abort_frame(&mut self, _frame: usize) {
            self.aborted += 1;
        }
    }

    fn renderer() -> GameRenderer<CountingBackend> {
        GameRenderer::new(CountingBackend::default(), Viewport::new(640, 480))
    }

    #[test]
    fn test_handles_are_dense() {
        let mut renderer = renderer();
        let a = renderer.add_library("a").ok();
        let b = renderer.add_library("b").ok();
        assert_eq!(a.map(LibraryId::index), Some(0));
        assert_eq!(b.map(LibraryId::index), Some(1));
        assert_eq!(renderer.library_count(), 2);
    }

    #[test]
    fn test_library_failure_is_typed() {
        let mut renderer = renderer();
        let result = renderer.add_library("");
        assert!(matches!(
            result,
            Err(RenderError::Construction(ConstructionError::Library(_)))
        ));
        assert_eq!(renderer.library_count(), 0);
    }

    #[test]
    fn test_shader_from_missing_library() {
        let mut renderer = renderer();
        assert!(renderer.add_library("only").is_ok());
        let result = renderer.load_shader_from_library(LibraryId::from(1), "vertexShader");
        assert!(matches!(
            result,
            Err(RenderError::OutOfRange {
                resource: "library",
                index: 1,
                len: 1
            })
        ));
    }

    #[test]
    fn test_shader_failure_is_typed() {
        let mut renderer = GameRenderer::new(
            CountingBackend {
                fail_shader: true,
                ..CountingBackend::default()
            },
            Viewport::new(1, 1),
        );
        let Ok(lib) = renderer.add_library("lib") else {
            panic!("library should load");
        };
        let result = renderer.load_shader_from_library(lib, "missing");
        assert!(matches!(
            result,
            Err(RenderError::Construction(ConstructionError::Shader { .. }))
        ));
        assert_eq!(renderer.shader_count(), 0);
    }

    #[test]
    fn test_pipeline_checks_both_shaders() {
        let mut renderer = renderer();
        let Ok(lib) = renderer.add_library("lib") else {
            panic!("library should load");
        };
        let Ok(vertex) = renderer.load_shader_from_library(lib, "vertexShader") else {
            panic!("shader should load");
        };
        let result = renderer.create_pipeline(vertex, ShaderId::from(3));
        assert!(matches!(
            result,
            Err(RenderError::OutOfRange {
                resource: "shader",
                index: 3,
                ..
            })
        ));
        assert_eq!(renderer.pipeline_count(), 0);
    }

    #[test]
    fn test_frame_lifecycle() {
        let mut renderer = renderer();
        let Ok(lib) = renderer.add_library("lib") else {
            panic!("library should load");
        };
        let (Ok(v), Ok(f)) = (
            renderer.load_shader_from_library(lib, "vertexShader"),
            renderer.load_shader_from_library(lib, "fragmentShader"),
        ) else {
            panic!("shaders should load");
        };
        let Ok(pipeline) = renderer.create_pipeline(v, f) else {
            panic!("pipeline should build");
        };

        assert_eq!(renderer.status(), FrameStatus::Idle);
        assert!(renderer.begin_frame().is_ok());
        assert!(renderer.is_recording());
        assert!(renderer.draw_vertices(&[Vertex::default(); 6], pipeline).is_ok());
        assert!(renderer.end_frame().is_ok());
        assert_eq!(renderer.status(), FrameStatus::Idle);

        assert_eq!(renderer.backend().draws, vec![6]);
        assert_eq!(renderer.backend().presented, 1);
    }

    #[test]
    fn test_draw_before_begin_is_rejected() {
        let mut renderer = renderer();
        let result = renderer.draw_vertices(&[Vertex::default(); 3], PipelineId::from(0));
        assert!(matches!(
            result,
            Err(RenderError::InvalidState {
                state: FrameStatus::Idle,
                ..
            })
        ));
        assert!(renderer.backend().draws.is_empty());
    }

    #[test]
    fn test_double_begin_is_rejected() {
        let mut renderer = renderer();
        assert!(renderer.begin_frame().is_ok());
        assert!(matches!(
            renderer.begin_frame(),
            Err(RenderError::InvalidState {
                state: FrameStatus::Recording,
                ..
            })
        ));
        assert_eq!(renderer.backend().frames_begun, 1);
        assert!(renderer.is_recording());
    }

    #[test]
    fn test_end_without_begin_is_rejected() {
        let mut renderer = renderer();
        assert!(matches!(
            renderer.end_frame(),
            Err(RenderError::InvalidState { .. })
        ));
        assert_eq!(renderer.backend().presented, 0);
    }

    #[test]
    fn test_draw_with_unknown_pipeline() {
        let mut renderer = renderer();
        assert!(renderer.begin_frame().is_ok());
        let result = renderer.draw_vertices(&[Vertex::default(); 3], PipelineId::from(0));
        assert!(matches!(
            result,
            Err(RenderError::OutOfRange {
                resource: "pipeline",
                ..
            })
        ));
        assert!(renderer.is_recording());
    }

    #[test]
    fn test_abort_after_failed_draw_allows_next_frame() {
        let mut renderer = GameRenderer::new(
            CountingBackend {
                fail_draw: true,
                ..CountingBackend::default()
            },
            Viewport::new(1, 1),
        );
        let Ok(lib) = renderer.add_library("lib") else {
            panic!("library should load");
        };
        let (Ok(v), Ok(f)) = (
            renderer.load_shader_from_library(lib, "vertexShader"),
            renderer.load_shader_from_library(lib, "fragmentShader"),
        ) else {
            panic!("shaders should load");
        };
        let Ok(pipeline) = renderer.create_pipeline(v, f) else {
            panic!("pipeline should build");
        };

        assert!(renderer.begin_frame().is_ok());
        assert!(matches!(
            renderer.draw_vertices(&[Vertex::default(); 3], pipeline),
            Err(RenderError::Frame(_))
        ));
        assert!(renderer.abort_frame());
        assert_eq!(renderer.status(), FrameStatus::Idle);
        assert_eq!(renderer.backend().aborted, 1);
        assert_eq!(renderer.backend().presented, 0);

        assert!(renderer.begin_frame().is_ok());
        assert!(renderer.is_recording());
    }

    #[test]
    fn test_abort_when_idle() {
        let mut renderer = renderer();
        assert!(!renderer.abort_frame());
        assert_eq!(renderer.backend().aborted, 0);
    }

    #[test]
    fn test_set_viewport_clamps_zero() {
        let mut renderer = renderer();
        renderer.set_viewport(0, 300);
        assert_eq!(renderer.viewport(), Viewport::new(1, 300));
    }

    #[test]
    fn test_vertex_layout_matches_shader() {
        assert_eq!(std::mem::offset_of!(Vertex, color), 16);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::size_of::<Viewport>(), 8);
    }
}
