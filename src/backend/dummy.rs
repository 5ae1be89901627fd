//! Dummy GL backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out fresh
//! handles, tracks which objects are alive, and records every call so tests
//! can assert on the exact command stream a draw produced.

use std::collections::{HashMap, HashSet};

use super::traits::*;
use super::types::*;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    EnableDepthTest(DepthFunc),
    CompileShader(ShaderStage),
    LinkProgram(ProgramHandle),
    UseProgram(ProgramHandle),
    SetUniform {
        program: ProgramHandle,
        name: String,
        value: RecordedUniform,
    },
    CreateBuffer {
        buffer: BufferHandle,
        kind: BufferKind,
        size: usize,
    },
    BindVertexAttribute {
        location: u32,
        buffer: BufferHandle,
        components: u32,
    },
    BindIndexBuffer(BufferHandle),
    CreateTexture(TextureHandle, TextureDimension),
    TexImage {
        texture: TextureHandle,
        target: TexImageTarget,
        width: u32,
        height: u32,
        has_pixels: bool,
    },
    SetSamplerState(TextureHandle, SamplerState),
    GenerateMipmap(TextureHandle),
    BindTexture {
        unit: u32,
        dimension: TextureDimension,
        texture: Option<TextureHandle>,
    },
    CreateFramebuffer(FramebufferHandle),
    CreateDepthRenderbuffer {
        framebuffer: FramebufferHandle,
        renderbuffer: RenderbufferHandle,
        width: u32,
        height: u32,
    },
    AttachColorTexture {
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
        target: TexImageTarget,
    },
    BindFramebuffer(Option<FramebufferHandle>),
    BindRenderbuffer(Option<RenderbufferHandle>),
    ClearColor([f32; 4]),
    Clear,
    Viewport(Viewport),
    DrawArrays(PrimitiveMode, u32),
    DrawElements(PrimitiveMode, u32),
    Destroy(u64),
}

/// Owned copy of a [`UniformWrite`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Bool(bool),
    Float(f32),
    Int(i32),
    Vector(Vec<f32>),
    Matrix { dimension: usize, data: Vec<f32> },
    Sampler(u32),
}

impl From<UniformWrite<'_>> for RecordedUniform {
    fn from(value: UniformWrite<'_>) -> Self {
        match value {
            UniformWrite::Bool(v) => Self::Bool(v),
            UniformWrite::Float(v) => Self::Float(v),
            UniformWrite::Int(v) => Self::Int(v),
            UniformWrite::Vector(v) => Self::Vector(v.to_vec()),
            UniformWrite::Matrix { dimension, data } => Self::Matrix {
                dimension,
                data: data.to_vec(),
            },
            UniformWrite::Sampler(unit) => Self::Sampler(unit),
        }
    }
}

/// Dummy GL backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_handle: u64,
    calls: Vec<GlCall>,
    live: HashSet<u64>,
    textures: HashSet<u64>,
    attribute_locations: HashMap<(ProgramHandle, String), u32>,
    next_location: HashMap<ProgramHandle, u32>,
    missing_names: HashSet<String>,
    compile_error_marker: Option<String>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail compilation of any shader whose source contains `marker`.
    pub fn with_compile_error(mut self, marker: impl Into<String>) -> Self {
        self.compile_error_marker = Some(marker.into());
        self
    }

    /// Report `name` as absent from every program, like an attribute or
    /// uniform the GLSL compiler optimized out.
    pub fn with_missing_name(mut self, name: impl Into<String>) -> Self {
        self.missing_names.insert(name.into());
        self
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Drain the recorded calls.
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of draw calls recorded so far.
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GlCall::DrawArrays(..) | GlCall::DrawElements(..)))
            .count()
    }

    /// Number of programs linked so far.
    pub fn programs_linked(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GlCall::LinkProgram(_)))
            .count()
    }

    /// Number of GPU objects (of any kind) currently alive.
    pub fn live_objects(&self) -> usize {
        self.live.len()
    }

    /// Number of textures currently alive.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Last value written to a uniform, if any.
    pub fn last_uniform(&self, name: &str) -> Option<&RecordedUniform> {
        self.calls.iter().rev().find_map(|c| match c {
            GlCall::SetUniform { name: n, value, .. } if n == name => Some(value),
            _ => None,
        })
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.live.insert(self.next_handle);
        self.next_handle
    }

    fn release(&mut self, id: u64) {
        log::trace!("DummyBackend: destroying object {}", id);
        self.live.remove(&id);
        self.textures.remove(&id);
        self.calls.push(GlCall::Destroy(id));
    }
}

impl GlBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn enable_depth_test(&mut self, func: DepthFunc) {
        self.calls.push(GlCall::EnableDepthTest(func));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderHandle> {
        log::trace!("DummyBackend: compiling {} shader ({} bytes)", stage, source.len());
        self.calls.push(GlCall::CompileShader(stage));
        if let Some(marker) = &self.compile_error_marker {
            if source.contains(marker.as_str()) {
                return Err(BackendError::ShaderCompilationFailed {
                    stage,
                    log: format!("ERROR: 0:1: '{}' : syntax error", marker),
                });
            }
        }
        Ok(ShaderHandle(self.allocate()))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> BackendResult<ProgramHandle> {
        log::trace!("DummyBackend: linking {:?} + {:?}", vertex, fragment);
        let program = ProgramHandle(self.allocate());
        self.calls.push(GlCall::LinkProgram(program));
        Ok(program)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        if self.missing_names.contains(name) {
            return None;
        }
        let key = (program, name.to_string());
        if let Some(location) = self.attribute_locations.get(&key) {
            return Some(*location);
        }
        // Leave room for matrix attributes, which span consecutive locations.
        let next = self.next_location.entry(program).or_insert(0);
        let location = *next;
        *next += 4;
        self.attribute_locations.insert(key, location);
        Some(location)
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformWrite<'_>) -> bool {
        if self.missing_names.contains(name) {
            return false;
        }
        self.calls.push(GlCall::SetUniform {
            program,
            name: name.to_string(),
            value: value.into(),
        });
        true
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        log::trace!("DummyBackend: creating {:?} buffer (size: {})", kind, data.len());
        let buffer = BufferHandle(self.allocate());
        self.calls.push(GlCall::CreateBuffer {
            buffer,
            kind,
            size: data.len(),
        });
        Ok(buffer)
    }

    fn bind_vertex_attribute(&mut self, location: u32, buffer: BufferHandle, components: u32) {
        self.calls.push(GlCall::BindVertexAttribute {
            location,
            buffer,
            components,
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.calls.push(GlCall::BindIndexBuffer(buffer));
    }

    fn create_texture(&mut self, dimension: TextureDimension) -> BackendResult<TextureHandle> {
        let texture = TextureHandle(self.allocate());
        log::trace!("DummyBackend: creating {:?} texture {:?}", dimension, texture);
        self.textures.insert(texture.0);
        self.calls.push(GlCall::CreateTexture(texture, dimension));
        Ok(texture)
    }

    fn tex_image(
        &mut self,
        texture: TextureHandle,
        target: TexImageTarget,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) {
        log::trace!(
            "DummyBackend: tex_image {:?} {:?} ({}x{})",
            texture,
            target,
            width,
            height
        );
        self.calls.push(GlCall::TexImage {
            texture,
            target,
            width,
            height,
            has_pixels: pixels.is_some(),
        });
    }

    fn set_sampler_state(
        &mut self,
        texture: TextureHandle,
        _dimension: TextureDimension,
        state: &SamplerState,
    ) {
        self.calls.push(GlCall::SetSamplerState(texture, *state));
    }

    fn generate_mipmap(&mut self, texture: TextureHandle, _dimension: TextureDimension) {
        self.calls.push(GlCall::GenerateMipmap(texture));
    }

    fn bind_texture(&mut self, unit: u32, dimension: TextureDimension, texture: Option<TextureHandle>) {
        self.calls.push(GlCall::BindTexture {
            unit,
            dimension,
            texture,
        });
    }

    fn create_framebuffer(&mut self) -> BackendResult<FramebufferHandle> {
        let framebuffer = FramebufferHandle(self.allocate());
        self.calls.push(GlCall::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn create_depth_renderbuffer(
        &mut self,
        framebuffer: FramebufferHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<RenderbufferHandle> {
        let renderbuffer = RenderbufferHandle(self.allocate());
        self.calls.push(GlCall::CreateDepthRenderbuffer {
            framebuffer,
            renderbuffer,
            width,
            height,
        });
        Ok(renderbuffer)
    }

    fn attach_color_texture(
        &mut self,
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
        target: TexImageTarget,
    ) {
        self.calls.push(GlCall::AttachColorTexture {
            framebuffer,
            texture,
            target,
        });
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.calls.push(GlCall::BindFramebuffer(framebuffer));
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferHandle>) {
        self.calls.push(GlCall::BindRenderbuffer(renderbuffer));
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.calls.push(GlCall::ClearColor(color));
    }

    fn clear(&mut self) {
        self.calls.push(GlCall::Clear);
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.calls.push(GlCall::Viewport(viewport));
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, count: u32) {
        log::trace!("DummyBackend: draw_arrays {:?} count={}", mode, count);
        self.calls.push(GlCall::DrawArrays(mode, count));
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32) {
        log::trace!("DummyBackend: draw_elements {:?} count={}", mode, count);
        self.calls.push(GlCall::DrawElements(mode, count));
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        self.release(shader.0);
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.release(program.0);
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.release(buffer.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.release(texture.0);
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.release(framebuffer.0);
    }

    fn destroy_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        self.release(renderbuffer.0);
    }
}

/// An off-screen surface backed by [`DummyBackend`].
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    id: SurfaceId,
    width: u32,
    height: u32,
    compile_error_marker: Option<String>,
    missing_names: Vec<String>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: SurfaceId::next(),
            width,
            height,
            compile_error_marker: None,
            missing_names: Vec::new(),
        }
    }

    /// Contexts created for this surface fail to compile sources containing `marker`.
    pub fn with_compile_error(mut self, marker: impl Into<String>) -> Self {
        self.compile_error_marker = Some(marker.into());
        self
    }

    /// Contexts created for this surface report `name` as absent from every program.
    pub fn with_missing_name(mut self, name: impl Into<String>) -> Self {
        self.missing_names.push(name.into());
        self
    }
}

impl Surface for HeadlessSurface {
    type Backend = DummyBackend;

    fn id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_context(&self, attributes: &ContextAttributes) -> BackendResult<DummyBackend> {
        log::trace!(
            "DummyBackend: creating context for {:?} ({}x{}, {:?})",
            self.id,
            self.width,
            self.height,
            attributes
        );
        let mut backend = DummyBackend::new();
        if let Some(marker) = &self.compile_error_marker {
            backend = backend.with_compile_error(marker.clone());
        }
        for name in &self.missing_names {
            backend = backend.with_missing_name(name.clone());
        }
        Ok(backend)
    }
}
