use std::ffi::c_void;
use std::ptr::NonNull;

use log::info;
use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_core_foundation::CGSize;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLClearColor, MTLCommandBuffer, MTLCommandEncoder, MTLCommandQueue,
    MTLCompileOptions, MTLCreateSystemDefaultDevice, MTLDevice, MTLDrawable, MTLFunction,
    MTLLibrary, MTLLoadAction, MTLPixelFormat, MTLPrimitiveType, MTLRenderCommandEncoder,
    MTLRenderPassDescriptor, MTLRenderPipelineDescriptor, MTLRenderPipelineState,
    MTLResourceOptions, MTLStoreAction, MTLViewport,
};
use objc2_quartz_core::{CAMetalDrawable, CAMetalLayer};
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};

use super::{GpuBackend, Vertex, Viewport};
use crate::core::ConstructionError;
use crate::math::Vec4;
use crate::window::GameWindow;

// Buffer slots shared with the shaders.
const VERTEX_BUFFER_INDEX: usize = 0;
const VIEWPORT_BUFFER_INDEX: usize = 1;

// setVertexBytes is limited to 4 KiB; larger uploads go through a buffer.
const INLINE_VERTEX_BYTES: usize = 4096;

pub struct MetalPipeline {
    #[allow(dead_code)]
    descriptor: Retained<MTLRenderPipelineDescriptor>,
    state: Retained<ProtocolObject<dyn MTLRenderPipelineState>>,
}

pub struct MetalFrame {
    drawable: Retained<ProtocolObject<dyn CAMetalDrawable>>,
    command_buffer: Retained<ProtocolObject<dyn MTLCommandBuffer>>,
    encoder: Retained<ProtocolObject<dyn MTLRenderCommandEncoder>>,
}

/// Metal device, command queue and the window's `CAMetalLayer`.
pub struct MetalBackend {
    device: Retained<ProtocolObject<dyn MTLDevice>>,
    command_queue: Retained<ProtocolObject<dyn MTLCommandQueue>>,
    layer: Retained<CAMetalLayer>,
    clear_color: MTLClearColor,
}

impl MetalBackend {
    pub fn new(window: &GameWindow, clear_color: Vec4) -> Result<Self, ConstructionError> {
        let device = MTLCreateSystemDefaultDevice().ok_or(ConstructionError::Device)?;

        let command_queue = device
            .newCommandQueue()
            .ok_or(ConstructionError::CommandQueue)?;

        let handle = window
            .raw()
            .window_handle()
            .map_err(|e| ConstructionError::Surface(e.to_string()))?;
        let layer = Self::create_metal_layer(&device, handle.as_raw())?;

        let backend = Self {
            device,
            command_queue,
            layer,
            clear_color: MTLClearColor {
                red: f64::from(clear_color.x),
                green: f64::from(clear_color.y),
                blue: f64::from(clear_color.z),
                alpha: f64::from(clear_color.w),
            },
        };
        let (width, height) = window.viewport();
        backend.update_drawable_size(Viewport::new(width, height));

        info!(target: "renderer", "Metal backend ready ({}x{})", width, height);
        Ok(backend)
    }

    fn create_metal_layer(
        device: &ProtocolObject<dyn MTLDevice>,
        window_handle: RawWindowHandle,
    ) -> Result<Retained<CAMetalLayer>, ConstructionError> {
        let layer = unsafe { CAMetalLayer::new() };

        unsafe {
            layer.setDevice(Some(device));
            layer.setPixelFormat(MTLPixelFormat::BGRA8Unorm);
            layer.setOpaque(true);
        }

        match window_handle {
            RawWindowHandle::AppKit(handle) => unsafe {
                use objc2::runtime::AnyObject;

                let view = handle.ns_view.as_ptr().cast::<AnyObject>();
                let _: () = msg_send![view, setWantsLayer: true];
                let _: () = msg_send![view, setLayer: &*layer];
            },
            _ => {
                return Err(ConstructionError::Surface(
                    "unsupported window handle type".to_string(),
                ))
            }
        }

        Ok(layer)
    }

    fn update_drawable_size(&self, viewport: Viewport) {
        let size = CGSize {
            width: f64::from(viewport.width),
            height: f64::from(viewport.height),
        };
        unsafe {
            self.layer.setDrawableSize(size);
        }
    }
}

impl GpuBackend for MetalBackend {
    type Library = Retained<ProtocolObject<dyn MTLLibrary>>;
    type Shader = Retained<ProtocolObject<dyn MTLFunction>>;
    type Pipeline = MetalPipeline;
    type Frame = MetalFrame;

    fn load_library(&mut self, source: &str) -> Result<Self::Library, ConstructionError> {
        let source_string = NSString::from_str(source);
        let compile_options = MTLCompileOptions::new();

        self.device
            .newLibraryWithSource_options_error(&source_string, Some(&compile_options))
            .map_err(|e| ConstructionError::Library(format!("{e:?}")))
    }

    fn load_shader(
        &mut self,
        library: &Self::Library,
        name: &str,
    ) -> Result<Self::Shader, ConstructionError> {
        let function_name = NSString::from_str(name);
        library
            .newFunctionWithName(&function_name)
            .ok_or_else(|| ConstructionError::Shader {
                name: name.to_string(),
            })
    }

    fn create_pipeline(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Pipeline, ConstructionError> {
        let descriptor = MTLRenderPipelineDescriptor::new();
        unsafe {
            descriptor.setVertexFunction(Some(vertex));
            descriptor.setFragmentFunction(Some(fragment));

            let color_attachment = descriptor.colorAttachments().objectAtIndexedSubscript(0);
            color_attachment.setPixelFormat(self.layer.pixelFormat());
        }

        let state = self
            .device
            .newRenderPipelineStateWithDescriptor_error(&descriptor)
            .map_err(|e| ConstructionError::Pipeline(format!("{e:?}")))?;

        Ok(MetalPipeline { descriptor, state })
    }

    fn begin_frame(&mut self, viewport: Viewport) -> Result<Self::Frame, String> {
        let drawable = unsafe { self.layer.nextDrawable() }
            .ok_or_else(|| "Failed to get next drawable".to_string())?;

        let command_buffer = self
            .command_queue
            .commandBuffer()
            .ok_or_else(|| "Failed to create command buffer".to_string())?;

        let render_pass_descriptor = unsafe { MTLRenderPassDescriptor::new() };
        let color_attachment = unsafe {
            render_pass_descriptor
                .colorAttachments()
                .objectAtIndexedSubscript(0)
        };

        unsafe {
            color_attachment.setTexture(Some(&drawable.texture()));
            color_attachment.setLoadAction(MTLLoadAction::Clear);
            color_attachment.setClearColor(self.clear_color);
            color_attachment.setStoreAction(MTLStoreAction::Store);
        }

        let encoder = command_buffer
            .renderCommandEncoderWithDescriptor(&render_pass_descriptor)
            .ok_or_else(|| "Failed to create render encoder".to_string())?;

        let label = NSString::from_str("Frame Encoder");
        encoder.setLabel(Some(&label));
        unsafe {
            encoder.setViewport(MTLViewport {
                originX: 0.0,
                originY: 0.0,
                width: f64::from(viewport.width),
                height: f64::from(viewport.height),
                znear: 0.0,
                zfar: 1.0,
            });
        }

        Ok(MetalFrame {
            drawable,
            command_buffer,
            encoder,
        })
    }

    fn draw(
        &mut self,
        frame: &mut Self::Frame,
        pipeline: &Self::Pipeline,
        vertices: &[Vertex],
        viewport: Viewport,
    ) -> Result<(), String> {
        let encoder = &frame.encoder;
        encoder.setRenderPipelineState(&pipeline.state);

        let vertex_bytes = std::mem::size_of_val(vertices);
        let vertex_data = NonNull::from(vertices).cast::<c_void>();

        unsafe {
            if vertex_bytes <= INLINE_VERTEX_BYTES {
                encoder.setVertexBytes_length_atIndex(
                    vertex_data,
                    vertex_bytes,
                    VERTEX_BUFFER_INDEX,
                );
            } else {
                let buffer = self
                    .device
                    .newBufferWithBytes_length_options(
                        vertex_data,
                        vertex_bytes,
                        MTLResourceOptions::CPUCacheModeDefaultCache,
                    )
                    .ok_or_else(|| "Failed to create vertex buffer".to_string())?;
                encoder.setVertexBuffer_offset_atIndex(Some(&buffer), 0, VERTEX_BUFFER_INDEX);
            }

            encoder.setVertexBytes_length_atIndex(
                NonNull::from(&viewport).cast::<c_void>(),
                std::mem::size_of::<Viewport>(),
                VIEWPORT_BUFFER_INDEX,
            );

            encoder.drawPrimitives_vertexStart_vertexCount(
                MTLPrimitiveType::Triangle,
                0,
                vertices.len(),
            );
        }

        Ok(())
    }

    fn end_frame(&mut self, frame: Self::Frame) -> Result<(), String> {
        frame.encoder.endEncoding();

        unsafe {
            let mtl_drawable =
                (&raw const *frame.drawable).cast::<ProtocolObject<dyn MTLDrawable>>();
            frame.command_buffer.presentDrawable(&*mtl_drawable);
        }

        frame.command_buffer.commit();
        Ok(())
    }

    fn abort_frame(&mut self, frame: Self::Frame) {
        // The command buffer is dropped uncommitted and the drawable is not presented.
        frame.encoder.endEncoding();
    }

    fn resize(&mut self, viewport: Viewport) {
        self.update_drawable_size(viewport);
    }
}
