//! Core backend abstraction traits
//!
//! These traits define the capability surface of a WebGL-style immediate-mode
//! rendering context. Everything above this layer talks to the GPU only
//! through [`GlBackend`].

use crate::backend::types::*;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Shader failed to compile ({stage}): {log}")]
    ShaderCompilationFailed { stage: ShaderStage, log: String },
    #[error("Program failed to link: {0}")]
    ProgramLinkFailed(String),
    #[error("Failed to create resource: {0}")]
    ResourceCreationFailed(String),
    #[error("Failed to create rendering context: {0}")]
    ContextCreationFailed(String),
    #[error("Context lost")]
    ContextLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a compiled shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub(crate) u64);

/// Handle to a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to an off-screen framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub(crate) u64);

/// Handle to a depth renderbuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderbufferHandle(pub(crate) u64);

/// Stable identity of a drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Allocate a process-unique surface id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Something a rendering context can be created for, e.g. a canvas or a window.
pub trait Surface {
    type Backend: GlBackend;

    /// Identity used to cache the surface's context
    fn id(&self) -> SurfaceId;

    /// Drawable size in pixels
    fn size(&self) -> (u32, u32);

    /// Create a new rendering context for this surface
    fn create_context(&self, attributes: &ContextAttributes) -> BackendResult<Self::Backend>;
}

/// A WebGL-style rendering context
pub trait GlBackend {
    /// Human-readable backend name
    fn name(&self) -> &'static str;

    /// Enable depth testing with the given comparison function
    fn enable_depth_test(&mut self, func: DepthFunc);

    // Programs

    /// Compile one shader stage, returning the info log on failure
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderHandle>;

    /// Link a vertex and fragment shader into a program
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> BackendResult<ProgramHandle>;

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Location of a vertex attribute, or `None` if the program doesn't use it
    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Write a uniform on the current program. Returns false if the program has no such uniform.
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformWrite<'_>) -> bool;

    // Buffers

    /// Create a buffer with static contents
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Bind a vertex buffer to an attribute location as `components` floats per vertex
    fn bind_vertex_attribute(&mut self, location: u32, buffer: BufferHandle, components: u32);

    /// Bind the element array buffer used by indexed draws
    fn bind_index_buffer(&mut self, buffer: BufferHandle);

    // Textures

    /// Create an empty texture object
    fn create_texture(&mut self, dimension: TextureDimension) -> BackendResult<TextureHandle>;

    /// Upload RGBA8 pixels, or allocate uninitialized storage when `pixels` is `None`
    fn tex_image(
        &mut self,
        texture: TextureHandle,
        target: TexImageTarget,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    );

    /// Set wrap and filter parameters
    fn set_sampler_state(
        &mut self,
        texture: TextureHandle,
        dimension: TextureDimension,
        state: &SamplerState,
    );

    /// Generate the mipmap chain
    fn generate_mipmap(&mut self, texture: TextureHandle, dimension: TextureDimension);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, dimension: TextureDimension, texture: Option<TextureHandle>);

    // Off-screen targets

    /// Create a framebuffer
    fn create_framebuffer(&mut self) -> BackendResult<FramebufferHandle>;

    /// Create a 16-bit depth renderbuffer and attach it to a framebuffer
    fn create_depth_renderbuffer(
        &mut self,
        framebuffer: FramebufferHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<RenderbufferHandle>;

    /// Attach a texture (or cube face) as the framebuffer's color attachment
    fn attach_color_texture(
        &mut self,
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
        target: TexImageTarget,
    );

    /// Bind a framebuffer, `None` meaning the visible surface
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Bind a renderbuffer, `None` meaning the visible surface
    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferHandle>);

    // Drawing

    /// Set the clear color
    fn clear_color(&mut self, color: [f32; 4]);

    /// Clear the color and depth buffers
    fn clear(&mut self);

    /// Set the viewport
    fn viewport(&mut self, viewport: Viewport);

    /// Draw non-indexed primitives
    fn draw_arrays(&mut self, mode: PrimitiveMode, count: u32);

    /// Draw primitives indexed by the bound 16-bit index buffer
    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32);

    // Resource cleanup

    /// Destroy a shader stage
    fn destroy_shader(&mut self, shader: ShaderHandle);

    /// Destroy a program
    fn destroy_program(&mut self, program: ProgramHandle);

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Destroy a framebuffer
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Destroy a renderbuffer
    fn destroy_renderbuffer(&mut self, renderbuffer: RenderbufferHandle);
}
