//! Shaders and the renderer that draws them
//!
//! A [`Shader`] is a declarative draw: sources, attributes, uniforms and draw
//! options. Rendering it to a surface draws immediately. Rendering it to a
//! texture uniform only queues the draw; the queue for a texture is drained
//! the first time a later draw samples that texture, one level at a time,
//! recursively.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::attributes::Attribute;
use crate::backend::*;
use crate::context::{ContextId, ContextRegistry};
use crate::error::{Error, Result};
use crate::gl::{self, DrawCall, RenderTargetBuffers};
use crate::pending::{PendingRender, PendingRenders};
use crate::uniforms::{
    CubeCameraUniform, CubeFace, CubeTextureUniform, Texture2DUniform, TextureId, Uniform,
};
use crate::RendererConfig;

/// Draw options of a [`Shader`].
#[derive(Debug, Clone)]
pub struct ShaderOptions {
    pub attributes: Vec<Attribute>,
    pub uniforms: Vec<Uniform>,
    /// Defaults to the whole surface being drawn for.
    pub viewport: Option<Viewport>,
    pub mode: PrimitiveMode,
    /// Draw indexed with these indices instead of in vertex order.
    pub indices: Option<Vec<u16>>,
    /// Clear color and depth before drawing.
    pub clear: bool,
    /// Overrides the vertex count derived from indices or attributes.
    pub vertex_count: Option<u32>,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            uniforms: Vec::new(),
            viewport: None,
            mode: PrimitiveMode::TriangleStrip,
            indices: None,
            clear: true,
            vertex_count: None,
        }
    }
}

impl ShaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn uniform(mut self, uniform: impl Into<Uniform>) -> Self {
        self.uniforms.push(uniform.into());
        self
    }

    pub fn uniforms<U: Into<Uniform>>(mut self, uniforms: impl IntoIterator<Item = U>) -> Self {
        self.uniforms.extend(uniforms.into_iter().map(Into::into));
        self
    }

    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn mode(mut self, mode: PrimitiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn indices(mut self, indices: impl Into<Vec<u16>>) -> Self {
        self.indices = Some(indices.into());
        self
    }

    pub fn clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    pub fn vertex_count(mut self, count: u32) -> Self {
        self.vertex_count = Some(count);
        self
    }
}

struct ShaderInner {
    vertex_source: String,
    fragment_source: String,
    options: ShaderOptions,
    index_buffers: RwLock<HashMap<ContextId, BufferHandle>>,
}

/// A vertex/fragment shader pair with everything needed to draw it.
#[derive(Clone)]
pub struct Shader {
    inner: Arc<ShaderInner>,
}

impl Shader {
    /// Fails with [`Error::NoAttributes`] if `options` has no attributes.
    pub fn new(
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
        options: ShaderOptions,
    ) -> Result<Self> {
        if options.attributes.is_empty() {
            return Err(Error::NoAttributes);
        }
        Ok(Self {
            inner: Arc::new(ShaderInner {
                vertex_source: vertex_source.into(),
                fragment_source: fragment_source.into(),
                options,
                index_buffers: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn vertex_source(&self) -> &str {
        &self.inner.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.inner.fragment_source
    }

    pub fn options(&self) -> &ShaderOptions {
        &self.inner.options
    }

    /// The viewport set in the options, or one covering `size`.
    pub fn viewport(&self, size: (u32, u32)) -> Viewport {
        self.inner.options.viewport.unwrap_or(Viewport::full(size))
    }

    pub fn ptr_eq(&self, other: &Shader) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of vertices one draw covers.
    ///
    /// Every attribute must describe the same number of vertices.
    pub fn vertex_count(&self) -> Result<u32> {
        let options = &self.inner.options;
        let (first, rest) = options
            .attributes
            .split_first()
            .ok_or(Error::NoAttributes)?;
        let expected = first.len();
        if let Some(other) = rest.iter().find(|a| a.len() != expected) {
            return Err(Error::AttributeLengthMismatch {
                name: other.name().to_string(),
                expected,
                actual: other.len(),
            });
        }
        let count = match (options.vertex_count, &options.indices) {
            (Some(count), _) => count as usize,
            (None, Some(indices)) => indices.len(),
            (None, None) => expected,
        };
        Ok(count as u32)
    }

    /// Draw to `target`, returning it for chaining.
    ///
    /// Surfaces are drawn to immediately. Texture uniforms get the draw queued
    /// until another draw samples them.
    pub fn render<'a, B: GlBackend>(
        &self,
        renderer: &mut Renderer<B>,
        target: impl Into<RenderTarget<'a, B>>,
    ) -> Result<RenderTarget<'a, B>> {
        let target = target.into();
        renderer.render(self, &target)?;
        Ok(target)
    }

    fn bind_indices<B: GlBackend>(&self, backend: &mut B, context: ContextId) -> Result<bool> {
        let Some(indices) = &self.inner.options.indices else {
            return Ok(false);
        };
        let cached = self.inner.index_buffers.read().get(&context).copied();
        let buffer = match cached {
            Some(buffer) => buffer,
            None => {
                let buffer = backend.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))?;
                self.inner.index_buffers.write().insert(context, buffer);
                buffer
            }
        };
        backend.bind_index_buffer(buffer);
        Ok(true)
    }

    fn release<B: GlBackend>(&self, backend: &mut B, context: ContextId) {
        for attribute in &self.inner.options.attributes {
            attribute.release(backend, context);
        }
        for uniform in &self.inner.options.uniforms {
            uniform.release(backend, context);
        }
        if let Some(buffer) = self.inner.index_buffers.write().remove(&context) {
            backend.destroy_buffer(buffer);
        }
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = &self.inner.options;
        f.debug_struct("Shader")
            .field(
                "attributes",
                &options.attributes.iter().map(Attribute::name).collect::<Vec<_>>(),
            )
            .field(
                "uniforms",
                &options.uniforms.iter().map(Uniform::name).collect::<Vec<_>>(),
            )
            .field("mode", &options.mode)
            .field("indexed", &options.indices.is_some())
            .finish_non_exhaustive()
    }
}

/// Where a shader draws.
pub enum RenderTarget<'a, B: GlBackend> {
    Surface(&'a dyn Surface<Backend = B>),
    /// A texture uniform. Any other kind of uniform is rejected at render time.
    Uniform(Uniform),
}

impl<B: GlBackend> fmt::Debug for RenderTarget<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderTarget::Surface(surface) => f.debug_tuple("Surface").field(&surface.id()).finish(),
            RenderTarget::Uniform(uniform) => f.debug_tuple("Uniform").field(&uniform.name()).finish(),
        }
    }
}

impl<'a, S: Surface> From<&'a S> for RenderTarget<'a, S::Backend> {
    fn from(surface: &'a S) -> Self {
        RenderTarget::Surface(surface)
    }
}

impl<B: GlBackend> From<Uniform> for RenderTarget<'_, B> {
    fn from(uniform: Uniform) -> Self {
        RenderTarget::Uniform(uniform)
    }
}

impl<B: GlBackend> From<Texture2DUniform> for RenderTarget<'_, B> {
    fn from(texture: Texture2DUniform) -> Self {
        RenderTarget::Uniform(texture.into())
    }
}

impl<B: GlBackend> From<CubeTextureUniform> for RenderTarget<'_, B> {
    fn from(texture: CubeTextureUniform) -> Self {
        RenderTarget::Uniform(texture.into())
    }
}

impl<B: GlBackend> From<CubeCameraUniform> for RenderTarget<'_, B> {
    fn from(camera: CubeCameraUniform) -> Self {
        RenderTarget::Uniform(camera.into())
    }
}

/// Draws shaders and owns everything cached for them: contexts, programs
/// and the queue of pending texture renders.
pub struct Renderer<B: GlBackend> {
    config: RendererConfig,
    contexts: ContextRegistry<B>,
    pending: PendingRenders,
    // Textures currently being rendered into, innermost last.
    active_targets: Vec<TextureId>,
    // Shaders with GPU state in each context, released on teardown.
    resident: HashMap<ContextId, Vec<Shader>>,
}

impl<B: GlBackend> Renderer<B> {
    pub fn new(config: RendererConfig) -> Self {
        log::debug!("Creating renderer with config {:?}", config);
        Self {
            contexts: ContextRegistry::new(config.max_texture_units),
            config,
            pending: PendingRenders::new(),
            active_targets: Vec::new(),
            resident: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn contexts(&self) -> &ContextRegistry<B> {
        &self.contexts
    }

    pub fn pending(&self) -> &PendingRenders {
        &self.pending
    }

    /// Context created for a surface, if any.
    pub fn context_id(&self, surface: SurfaceId) -> Option<ContextId> {
        self.contexts.for_surface(surface).map(|entry| entry.id())
    }

    /// Backend of the context created for a surface.
    pub fn backend(&self, surface: SurfaceId) -> Option<&B> {
        self.contexts.for_surface(surface).map(|entry| entry.backend())
    }

    pub fn backend_mut(&mut self, surface: SurfaceId) -> Option<&mut B> {
        self.contexts
            .for_surface_mut(surface)
            .map(|entry| entry.backend_mut())
    }

    /// Draw `shader` to `target`. See [`Shader::render`].
    pub fn render(&mut self, shader: &Shader, target: &RenderTarget<'_, B>) -> Result<()> {
        match target {
            RenderTarget::Surface(surface) => {
                let context = self.contexts.acquire(*surface, &self.config.context)?;
                let size = surface.size();
                let viewport = shader.viewport(size);
                self.draw(shader, context, size, viewport, None)
            }
            RenderTarget::Uniform(uniform) => {
                let texture = uniform
                    .texture_id()
                    .ok_or(Error::InvalidRenderTarget(uniform.kind_name()))?;
                log::trace!("Queued render into texture {}", uniform.name());
                self.pending.push(
                    texture,
                    PendingRender {
                        shader: shader.clone(),
                        target: uniform.clone(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Tear down everything held for a surface: its context, programs,
    /// buffers and the textures drawn in it.
    ///
    /// Returns false if the surface was never drawn to.
    pub fn destroy_surface(&mut self, surface: SurfaceId) -> bool {
        let Some(context) = self.context_id(surface) else {
            return false;
        };
        if let (Some(shaders), Some(entry)) = (
            self.resident.remove(&context),
            self.contexts.for_surface_mut(surface),
        ) {
            for shader in shaders {
                shader.release(&mut entry.backend, context);
            }
        }
        self.contexts.destroy(surface)
    }

    fn track(&mut self, context: ContextId, shader: &Shader) {
        let shaders = self.resident.entry(context).or_default();
        if !shaders.iter().any(|s| s.ptr_eq(shader)) {
            shaders.push(shader.clone());
        }
    }

    fn draw(
        &mut self,
        shader: &Shader,
        context: ContextId,
        size: (u32, u32),
        viewport: Viewport,
        target: Option<RenderTargetBuffers>,
    ) -> Result<()> {
        let vertex_count = shader.vertex_count()?;
        let program = self
            .contexts
            .program(context, shader.vertex_source(), shader.fragment_source())?;
        self.track(context, shader);
        let options = shader.options();

        // Every texture is prepared, and its pending renders run, before anything is sent.
        for uniform in &options.uniforms {
            let Some(texture) = uniform.texture_id() else {
                continue;
            };
            if self.config.detect_texture_cycles && self.active_targets.contains(&texture) {
                return Err(Error::TextureCycle(uniform.name().to_string()));
            }
            {
                let entry = self.contexts.get_mut(context)?;
                uniform.prepare(&mut entry.backend, context, program, &mut entry.units)?;
            }
            for render in self.pending.take(texture) {
                self.execute_pending(render, context, size)?;
            }
            if uniform.texture_handle(context).is_none() {
                log::warn!("Texture {} is sampled before it has any content", uniform.name());
            }
        }

        let entry = self.contexts.get_mut(context)?;
        let backend = &mut entry.backend;
        backend.use_program(program);
        backend.bind_framebuffer(target.map(|t| t.framebuffer));
        backend.bind_renderbuffer(target.map(|t| t.renderbuffer));
        for attribute in &options.attributes {
            attribute.send(backend, context, program)?;
        }
        for uniform in &options.uniforms {
            uniform.send(backend, context, program)?;
        }
        let indexed = shader.bind_indices(backend, context)?;

        gl::issue_draw(
            backend,
            &DrawCall {
                vertex_count,
                clear: options.clear,
                clear_color: self.config.clear_color,
                viewport,
                mode: options.mode,
                indexed,
            },
        );
        Ok(())
    }

    fn execute_pending(
        &mut self,
        render: PendingRender,
        context: ContextId,
        size: (u32, u32),
    ) -> Result<()> {
        let PendingRender { shader, target } = render;
        let texture = target
            .texture_id()
            .ok_or(Error::InvalidRenderTarget(target.kind_name()))?;
        log::debug!("Rendering pending shader into texture {}", target.name());
        self.active_targets.push(texture);
        let result = self.render_into(&shader, &target, context, size);
        self.active_targets.pop();
        result
    }

    fn render_into(
        &mut self,
        shader: &Shader,
        target: &Uniform,
        context: ContextId,
        size: (u32, u32),
    ) -> Result<()> {
        let viewport = shader.viewport(size);
        match target {
            Uniform::Texture2D(texture) => {
                let entry = self.contexts.get_mut(context)?;
                let buffers =
                    texture.buffers(&mut entry.backend, context, viewport.width, viewport.height)?;
                self.draw(shader, context, size, viewport, Some(buffers))
            }
            Uniform::CubeTexture(texture) => {
                // Cube faces must be square.
                let face = viewport.square();
                let entry = self.contexts.get_mut(context)?;
                let buffers =
                    texture.buffers(&mut entry.backend, context, face.width, face.height)?;
                for side in CubeFace::ALL {
                    self.draw(shader, context, size, face, Some(buffers[side]))?;
                }
                Ok(())
            }
            Uniform::CubeCamera(camera) => {
                let face = viewport.square();
                let entry = self.contexts.get_mut(context)?;
                let buffers = camera.texture().buffers(
                    &mut entry.backend,
                    context,
                    face.width,
                    face.height,
                )?;
                camera.render(|side| self.draw(shader, context, size, face, Some(buffers[side])))
            }
            other => Err(Error::InvalidRenderTarget(other.kind_name())),
        }
    }
}

impl<B: GlBackend> Default for Renderer<B> {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}
