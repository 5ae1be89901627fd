//! OpenGL / WebGL backend implementation on top of `glow`

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::uniforms::CubeFace;
use glow::HasContext;
use std::collections::HashMap;
use std::sync::Arc;

type GlShader = <glow::Context as HasContext>::Shader;
type GlProgram = <glow::Context as HasContext>::Program;
type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlTexture = <glow::Context as HasContext>::Texture;
type GlFramebuffer = <glow::Context as HasContext>::Framebuffer;
type GlRenderbuffer = <glow::Context as HasContext>::Renderbuffer;

/// glow backend implementation
pub struct GlowBackend {
    gl: Arc<glow::Context>,

    // Resource storage
    shaders: HashMap<u64, GlShader>,
    programs: HashMap<u64, GlProgram>,
    buffers: HashMap<u64, GlBuffer>,
    textures: HashMap<u64, GlTexture>,
    framebuffers: HashMap<u64, GlFramebuffer>,
    renderbuffers: HashMap<u64, GlRenderbuffer>,

    next_id: u64,
}

impl GlowBackend {
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            renderbuffers: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_handle(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn convert_mode(mode: PrimitiveMode) -> u32 {
        match mode {
            PrimitiveMode::Points => glow::POINTS,
            PrimitiveMode::Lines => glow::LINES,
            PrimitiveMode::LineStrip => glow::LINE_STRIP,
            PrimitiveMode::LineLoop => glow::LINE_LOOP,
            PrimitiveMode::Triangles => glow::TRIANGLES,
            PrimitiveMode::TriangleStrip => glow::TRIANGLE_STRIP,
            PrimitiveMode::TriangleFan => glow::TRIANGLE_FAN,
        }
    }

    fn convert_dimension(dimension: TextureDimension) -> u32 {
        match dimension {
            TextureDimension::D2 => glow::TEXTURE_2D,
            TextureDimension::Cube => glow::TEXTURE_CUBE_MAP,
        }
    }

    fn convert_target(target: TexImageTarget) -> u32 {
        match target {
            TexImageTarget::D2 => glow::TEXTURE_2D,
            TexImageTarget::CubeFace(face) => match face {
                CubeFace::PosX => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
                CubeFace::NegX => glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
                CubeFace::PosY => glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
                CubeFace::NegY => glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
                CubeFace::PosZ => glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
                CubeFace::NegZ => glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
            },
        }
    }

    fn convert_wrap(wrap: WrapMode) -> i32 {
        match wrap {
            WrapMode::Repeat => glow::REPEAT as i32,
            WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
        }
    }

    fn convert_filter(filter: FilterMode) -> i32 {
        match filter {
            FilterMode::Nearest => glow::NEAREST as i32,
            FilterMode::Linear => glow::LINEAR as i32,
            FilterMode::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR as i32,
        }
    }

    fn convert_depth_func(func: DepthFunc) -> u32 {
        match func {
            DepthFunc::Less => glow::LESS,
            DepthFunc::LessOrEqual => glow::LEQUAL,
            DepthFunc::Always => glow::ALWAYS,
        }
    }
}

impl GlBackend for GlowBackend {
    fn name(&self) -> &'static str {
        "glow"
    }

    fn enable_depth_test(&mut self, func: DepthFunc) {
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.depth_func(Self::convert_depth_func(func));
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderHandle> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = unsafe {
            let shader = self
                .gl
                .create_shader(kind)
                .map_err(BackendError::ResourceCreationFailed)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(BackendError::ShaderCompilationFailed { stage, log });
            }
            shader
        };
        let id = self.next_handle();
        self.shaders.insert(id, shader);
        Ok(ShaderHandle(id))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> BackendResult<ProgramHandle> {
        let (Some(&vs), Some(&fs)) = (self.shaders.get(&vertex.0), self.shaders.get(&fragment.0))
        else {
            return Err(BackendError::ProgramLinkFailed(
                "unknown shader handle".to_string(),
            ));
        };
        let program = unsafe {
            let program = self
                .gl
                .create_program()
                .map_err(BackendError::ResourceCreationFailed)?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(BackendError::ProgramLinkFailed(log));
            }
            program
        };
        let id = self.next_handle();
        self.programs.insert(id, program);
        Ok(ProgramHandle(id))
    }

    fn use_program(&mut self, program: ProgramHandle) {
        let program = self.programs.get(&program.0).copied();
        unsafe { self.gl.use_program(program) };
    }

    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        let program = *self.programs.get(&program.0)?;
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformWrite<'_>) -> bool {
        let Some(&program) = self.programs.get(&program.0) else {
            return false;
        };
        let Some(location) = (unsafe { self.gl.get_uniform_location(program, name) }) else {
            return false;
        };
        let location = Some(&location);
        unsafe {
            match value {
                UniformWrite::Bool(v) => self.gl.uniform_1_i32(location, v as i32),
                UniformWrite::Float(v) => self.gl.uniform_1_f32(location, v),
                UniformWrite::Int(v) => self.gl.uniform_1_i32(location, v),
                UniformWrite::Sampler(unit) => self.gl.uniform_1_i32(location, unit as i32),
                UniformWrite::Vector(data) => match data.len() {
                    1 => self.gl.uniform_1_f32_slice(location, data),
                    2 => self.gl.uniform_2_f32_slice(location, data),
                    3 => self.gl.uniform_3_f32_slice(location, data),
                    _ => self.gl.uniform_4_f32_slice(location, data),
                },
                UniformWrite::Matrix { dimension, data } => match dimension {
                    2 => self.gl.uniform_matrix_2_f32_slice(location, false, data),
                    3 => self.gl.uniform_matrix_3_f32_slice(location, false, data),
                    _ => self.gl.uniform_matrix_4_f32_slice(location, false, data),
                },
            }
        }
        true
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        let target = match kind {
            BufferKind::Vertex => glow::ARRAY_BUFFER,
            BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
        };
        let buffer = unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(BackendError::ResourceCreationFailed)?;
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
            buffer
        };
        let id = self.next_handle();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn bind_vertex_attribute(&mut self, location: u32, buffer: BufferHandle, components: u32) {
        let buffer = self.buffers.get(&buffer.0).copied();
        unsafe {
            self.gl.enable_vertex_attrib_array(location);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, buffer);
            self.gl
                .vertex_attrib_pointer_f32(location, components as i32, glow::FLOAT, false, 0, 0);
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        let buffer = self.buffers.get(&buffer.0).copied();
        unsafe { self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, buffer) };
    }

    fn create_texture(&mut self, _dimension: TextureDimension) -> BackendResult<TextureHandle> {
        let texture = unsafe {
            self.gl
                .create_texture()
                .map_err(BackendError::ResourceCreationFailed)?
        };
        let id = self.next_handle();
        self.textures.insert(id, texture);
        Ok(TextureHandle(id))
    }

    fn tex_image(
        &mut self,
        texture: TextureHandle,
        target: TexImageTarget,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
    ) {
        let bind_target = match target {
            TexImageTarget::D2 => glow::TEXTURE_2D,
            TexImageTarget::CubeFace(_) => glow::TEXTURE_CUBE_MAP,
        };
        let texture = self.textures.get(&texture.0).copied();
        unsafe {
            self.gl.bind_texture(bind_target, texture);
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                Self::convert_target(target),
                0,
                glow::RGBA as i32,
                width.min(i32::MAX as u32) as i32,
                height.min(i32::MAX as u32) as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn set_sampler_state(
        &mut self,
        texture: TextureHandle,
        dimension: TextureDimension,
        state: &SamplerState,
    ) {
        let target = Self::convert_dimension(dimension);
        let texture = self.textures.get(&texture.0).copied();
        unsafe {
            self.gl.bind_texture(target, texture);
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_WRAP_S, Self::convert_wrap(state.wrap_s));
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_WRAP_T, Self::convert_wrap(state.wrap_t));
            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MIN_FILTER,
                Self::convert_filter(state.min_filter),
            );
            self.gl.tex_parameter_i32(
                target,
                glow::TEXTURE_MAG_FILTER,
                Self::convert_filter(state.mag_filter),
            );
        }
    }

    fn generate_mipmap(&mut self, texture: TextureHandle, dimension: TextureDimension) {
        let target = Self::convert_dimension(dimension);
        let texture = self.textures.get(&texture.0).copied();
        unsafe {
            self.gl.bind_texture(target, texture);
            self.gl.generate_mipmap(target);
        }
    }

    fn bind_texture(&mut self, unit: u32, dimension: TextureDimension, texture: Option<TextureHandle>) {
        let texture = texture.and_then(|t| self.textures.get(&t.0).copied());
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(Self::convert_dimension(dimension), texture);
        }
    }

    fn create_framebuffer(&mut self) -> BackendResult<FramebufferHandle> {
        let framebuffer = unsafe {
            self.gl
                .create_framebuffer()
                .map_err(BackendError::ResourceCreationFailed)?
        };
        let id = self.next_handle();
        self.framebuffers.insert(id, framebuffer);
        Ok(FramebufferHandle(id))
    }

    fn create_depth_renderbuffer(
        &mut self,
        framebuffer: FramebufferHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<RenderbufferHandle> {
        let framebuffer = self.framebuffers.get(&framebuffer.0).copied();
        let renderbuffer = unsafe {
            let renderbuffer = self
                .gl
                .create_renderbuffer()
                .map_err(BackendError::ResourceCreationFailed)?;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            self.gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT16,
                width as i32,
                height as i32,
            );
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(renderbuffer),
            );
            renderbuffer
        };
        let id = self.next_handle();
        self.renderbuffers.insert(id, renderbuffer);
        Ok(RenderbufferHandle(id))
    }

    fn attach_color_texture(
        &mut self,
        framebuffer: FramebufferHandle,
        texture: TextureHandle,
        target: TexImageTarget,
    ) {
        let framebuffer = self.framebuffers.get(&framebuffer.0).copied();
        let texture = self.textures.get(&texture.0).copied();
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                Self::convert_target(target),
                texture,
                0,
            );
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        let framebuffer = framebuffer.and_then(|f| self.framebuffers.get(&f.0).copied());
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferHandle>) {
        let renderbuffer = renderbuffer.and_then(|r| self.renderbuffers.get(&r.0).copied());
        unsafe { self.gl.bind_renderbuffer(glow::RENDERBUFFER, renderbuffer) };
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        unsafe { self.gl.clear_color(color[0], color[1], color[2], color[3]) };
    }

    fn clear(&mut self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT) };
    }

    fn viewport(&mut self, viewport: Viewport) {
        unsafe {
            self.gl.viewport(
                viewport.x,
                viewport.y,
                viewport.width as i32,
                viewport.height as i32,
            )
        };
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, count: u32) {
        unsafe { self.gl.draw_arrays(Self::convert_mode(mode), 0, count as i32) };
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, count: u32) {
        unsafe {
            self.gl
                .draw_elements(Self::convert_mode(mode), count as i32, glow::UNSIGNED_SHORT, 0)
        };
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        if let Some(shader) = self.shaders.remove(&shader.0) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if let Some(program) = self.programs.remove(&program.0) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer.0) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(texture) = self.textures.remove(&texture.0) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if let Some(framebuffer) = self.framebuffers.remove(&framebuffer.0) {
            unsafe { self.gl.delete_framebuffer(framebuffer) };
        }
    }

    fn destroy_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        if let Some(renderbuffer) = self.renderbuffers.remove(&renderbuffer.0) {
            unsafe { self.gl.delete_renderbuffer(renderbuffer) };
        }
    }
}

/// A window or canvas whose GL context was created by the host application.
///
/// Every [`GlowBackend`] created for this surface shares the same `glow::Context`.
pub struct GlowSurface {
    id: SurfaceId,
    gl: Arc<glow::Context>,
    width: u32,
    height: u32,
}

impl GlowSurface {
    pub fn new(gl: Arc<glow::Context>, width: u32, height: u32) -> Self {
        Self {
            id: SurfaceId::next(),
            gl,
            width,
            height,
        }
    }

    /// Update the drawable size after the host resized the window.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl Surface for GlowSurface {
    type Backend = GlowBackend;

    fn id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_context(&self, attributes: &ContextAttributes) -> BackendResult<GlowBackend> {
        // Drawing-buffer preservation is a creation-time flag the host already chose.
        log::debug!(
            "Creating glow backend for {:?} ({:?})",
            self.id,
            attributes
        );
        Ok(GlowBackend::new(Arc::clone(&self.gl)))
    }
}
