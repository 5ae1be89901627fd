//! Resource-binding primitives
//!
//! Thin helpers over [`GlBackend`] that turn the library's data into GL
//! objects: programs, textures, off-screen render targets and draw calls.

use std::collections::HashMap;

use crate::backend::*;
use crate::error::{Error, Result};
use crate::math::is_power_of_two;
use crate::uniforms::{Cube, CubeFace, ImageSource};

/// Number of texture units a program may use.
pub const MAX_TEXTURE_UNITS: u32 = 32;

/// Texture-unit bookkeeping for every program of one context.
///
/// Units are keyed by uniform name, so the same name always maps to the same
/// unit within a program.
#[derive(Debug)]
pub struct TextureUnits {
    max: u32,
    assigned: HashMap<ProgramHandle, Vec<String>>,
}

impl TextureUnits {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            assigned: HashMap::new(),
        }
    }

    /// Unit for `name` in `program`, assigning the next free one on first use.
    pub fn reserve(&mut self, program: ProgramHandle, name: &str) -> Result<u32> {
        let names = self.assigned.entry(program).or_default();
        if let Some(unit) = names.iter().position(|n| n == name) {
            return Ok(unit as u32);
        }
        let unit = names.len() as u32;
        if unit >= self.max {
            return Err(Error::TextureUnitsExhausted {
                name: name.to_string(),
                max: self.max,
            });
        }
        names.push(name.to_string());
        Ok(unit)
    }

    /// Number of units in use by `program`.
    pub fn used(&self, program: ProgramHandle) -> usize {
        self.assigned.get(&program).map_or(0, Vec::len)
    }

    pub(crate) fn forget(&mut self, program: ProgramHandle) {
        self.assigned.remove(&program);
    }
}

impl Default for TextureUnits {
    fn default() -> Self {
        Self::new(MAX_TEXTURE_UNITS)
    }
}

/// Frame/render-buffer pair an off-screen texture is rendered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetBuffers {
    pub framebuffer: FramebufferHandle,
    pub renderbuffer: RenderbufferHandle,
}

/// Compile both stages and link them, reporting the compiler's log on failure.
pub fn compile_program<B: GlBackend>(
    backend: &mut B,
    vertex_source: &str,
    fragment_source: &str,
) -> BackendResult<ProgramHandle> {
    let vertex = backend.compile_shader(ShaderStage::Vertex, vertex_source)?;
    let fragment = match backend.compile_shader(ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            backend.destroy_shader(vertex);
            return Err(err);
        }
    };
    let program = backend.link_program(vertex, fragment);
    backend.destroy_shader(vertex);
    backend.destroy_shader(fragment);
    program
}

fn apply_mipmap_rule<B: GlBackend>(
    backend: &mut B,
    texture: TextureHandle,
    dimension: TextureDimension,
    mipmappable: bool,
) {
    if mipmappable {
        backend.generate_mipmap(texture, dimension);
        backend.set_sampler_state(texture, dimension, &SamplerState::MIPMAPPED);
    } else {
        backend.set_sampler_state(texture, dimension, &SamplerState::CLAMPED_LINEAR);
    }
}

fn is_mipmappable(source: &ImageSource) -> bool {
    !source.is_streaming() && is_power_of_two(source.width()) && is_power_of_two(source.height())
}

/// Upload an image into a new 2D texture.
///
/// Mipmaps are generated only for power-of-two, non-streaming sources.
pub fn create_opaque_texture<B: GlBackend>(
    backend: &mut B,
    source: &ImageSource,
) -> BackendResult<TextureHandle> {
    let texture = backend.create_texture(TextureDimension::D2)?;
    backend.tex_image(
        texture,
        TexImageTarget::D2,
        source.width(),
        source.height(),
        Some(source.pixels()),
    );
    apply_mipmap_rule(backend, texture, TextureDimension::D2, is_mipmappable(source));
    Ok(texture)
}

/// Upload six images into a new cube texture.
///
/// Mipmaps are generated only if every face qualifies.
pub fn create_cube_texture<B: GlBackend>(
    backend: &mut B,
    faces: &Cube<ImageSource>,
) -> BackendResult<TextureHandle> {
    let texture = backend.create_texture(TextureDimension::Cube)?;
    for (face, source) in faces.iter() {
        backend.tex_image(
            texture,
            TexImageTarget::CubeFace(face),
            source.width(),
            source.height(),
            Some(source.pixels()),
        );
    }
    let mipmappable = faces.iter().all(|(_, source)| is_mipmappable(source));
    apply_mipmap_rule(backend, texture, TextureDimension::Cube, mipmappable);
    Ok(texture)
}

fn render_target_buffers<B: GlBackend>(
    backend: &mut B,
    width: u32,
    height: u32,
) -> BackendResult<RenderTargetBuffers> {
    let framebuffer = backend.create_framebuffer()?;
    let renderbuffer = backend.create_depth_renderbuffer(framebuffer, width, height)?;
    Ok(RenderTargetBuffers {
        framebuffer,
        renderbuffer,
    })
}

/// Allocate a 2D texture that is the color attachment of a new framebuffer.
pub fn create_render_target_texture<B: GlBackend>(
    backend: &mut B,
    width: u32,
    height: u32,
) -> BackendResult<(TextureHandle, RenderTargetBuffers)> {
    let buffers = render_target_buffers(backend, width, height)?;
    let texture = backend.create_texture(TextureDimension::D2)?;
    backend.set_sampler_state(texture, TextureDimension::D2, &SamplerState::CLAMPED_LINEAR);
    backend.tex_image(texture, TexImageTarget::D2, width, height, None);
    backend.attach_color_texture(buffers.framebuffer, texture, TexImageTarget::D2);
    Ok((texture, buffers))
}

/// Allocate a cube texture whose faces are the color attachments of six new framebuffers.
///
/// Faces are square; a non-square request is clamped to its shorter side.
pub fn create_render_target_cube_texture<B: GlBackend>(
    backend: &mut B,
    width: u32,
    height: u32,
) -> BackendResult<(TextureHandle, Cube<RenderTargetBuffers>)> {
    if width != height {
        log::warn!("Cube render target {}x{} clamped to a square", width, height);
    }
    let side = width.min(height);
    let (width, height) = (side, side);
    let buffers = Cube::try_from_fn(|_| render_target_buffers(backend, width, height))?;
    let texture = backend.create_texture(TextureDimension::Cube)?;
    backend.set_sampler_state(texture, TextureDimension::Cube, &SamplerState::CLAMPED_LINEAR);
    for face in CubeFace::ALL {
        let target = TexImageTarget::CubeFace(face);
        backend.tex_image(texture, target, width, height, None);
        backend.attach_color_texture(buffers[face].framebuffer, texture, target);
    }
    Ok((texture, buffers))
}

/// Release the objects behind a render target.
pub fn destroy_render_target_buffers<B: GlBackend>(backend: &mut B, buffers: &RenderTargetBuffers) {
    backend.destroy_renderbuffer(buffers.renderbuffer);
    backend.destroy_framebuffer(buffers.framebuffer);
}

/// Parameters of a single draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub vertex_count: u32,
    pub clear: bool,
    pub clear_color: [f32; 4],
    pub viewport: Viewport,
    pub mode: PrimitiveMode,
    pub indexed: bool,
}

/// Clear (optionally), set the viewport and draw into whatever is bound.
pub fn issue_draw<B: GlBackend>(backend: &mut B, draw: &DrawCall) {
    backend.clear_color(draw.clear_color);
    if draw.clear {
        backend.clear();
    }
    backend.viewport(draw.viewport);
    if draw.indexed {
        backend.draw_elements(draw.mode, draw.vertex_count);
    } else {
        backend.draw_arrays(draw.mode, draw.vertex_count);
    }
}
