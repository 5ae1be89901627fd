//! Texture uniforms and the image data they sample from

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use parking_lot::RwLock;

use super::{Cube, Value};
use crate::backend::*;
use crate::context::ContextId;
use crate::error::{Error, Result};
use crate::gl::{self, RenderTargetBuffers, TextureUnits};

/// RGBA8 pixel data for one texture image.
#[derive(Clone)]
pub struct ImageSource {
    width: u32,
    height: u32,
    pixels: Arc<Vec<u8>>,
    streaming: bool,
}

impl ImageSource {
    /// Wrap tightly packed RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::InvalidImageData(format!(
                "{}x{} RGBA image needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: Arc::new(pixels),
            streaming: false,
        })
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        Self::from_rgba_image(img.to_rgba8())
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: Arc::new(img.into_raw()),
            streaming: false,
        }
    }

    /// Decode an encoded image (PNG, JPEG).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img =
            image::load_from_memory(bytes).map_err(|e| Error::InvalidImageData(e.to_string()))?;
        Ok(Self::from_image(&img))
    }

    /// A 1x1 image of a single color.
    pub fn solid_color(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: Arc::new(color.to_vec()),
            streaming: false,
        }
    }

    /// Mark the source as continuously updating, like a video frame.
    ///
    /// Streaming sources are re-uploaded on every draw and never mipmapped.
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}

/// Data a texture uniform can be built from.
pub trait TextureData: Clone + Send + Sync + 'static {
    const DIMENSION: TextureDimension;

    /// Off-screen buffers used when the texture is a render target.
    type Buffers: Clone + fmt::Debug + Send + Sync;

    fn is_streaming(&self) -> bool;

    fn upload<B: GlBackend>(&self, backend: &mut B) -> BackendResult<TextureHandle>;

    fn create_render_target<B: GlBackend>(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> BackendResult<(TextureHandle, Self::Buffers)>;

    fn destroy_buffers<B: GlBackend>(backend: &mut B, buffers: &Self::Buffers);
}

impl TextureData for ImageSource {
    const DIMENSION: TextureDimension = TextureDimension::D2;
    type Buffers = RenderTargetBuffers;

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn upload<B: GlBackend>(&self, backend: &mut B) -> BackendResult<TextureHandle> {
        gl::create_opaque_texture(backend, self)
    }

    fn create_render_target<B: GlBackend>(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> BackendResult<(TextureHandle, Self::Buffers)> {
        gl::create_render_target_texture(backend, width, height)
    }

    fn destroy_buffers<B: GlBackend>(backend: &mut B, buffers: &Self::Buffers) {
        gl::destroy_render_target_buffers(backend, buffers);
    }
}

impl TextureData for Cube<ImageSource> {
    const DIMENSION: TextureDimension = TextureDimension::Cube;
    type Buffers = Cube<RenderTargetBuffers>;

    fn is_streaming(&self) -> bool {
        self.iter().any(|(_, face)| face.is_streaming())
    }

    fn upload<B: GlBackend>(&self, backend: &mut B) -> BackendResult<TextureHandle> {
        gl::create_cube_texture(backend, self)
    }

    fn create_render_target<B: GlBackend>(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> BackendResult<(TextureHandle, Self::Buffers)> {
        gl::create_render_target_cube_texture(backend, width, height)
    }

    fn destroy_buffers<B: GlBackend>(backend: &mut B, buffers: &Self::Buffers) {
        for (_, face) in buffers.iter() {
            gl::destroy_render_target_buffers(backend, face);
        }
    }
}

/// Stable identity of a texture uniform, shared by all its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct ContextTexture<T: TextureData> {
    handle: TextureHandle,
    // Source generation the handle was built from.
    generation: u64,
    buffers: Option<T::Buffers>,
}

struct TextureState<T: TextureData> {
    source: Option<Value<T>>,
    generation: u64,
    contexts: HashMap<ContextId, ContextTexture<T>>,
    units: HashMap<(ContextId, ProgramHandle), u32>,
}

struct TextureInner<T: TextureData> {
    id: TextureId,
    name: String,
    state: RwLock<TextureState<T>>,
}

/// A sampler uniform backed either by caller-supplied image data or by the
/// output of another shader.
///
/// GPU state is kept per context. A texture that has been used as a render
/// target in a context stays one for the life of that context.
pub struct TextureUniform<T: TextureData> {
    inner: Arc<TextureInner<T>>,
}

/// 2D texture uniform (`sampler2D`).
pub type Texture2DUniform = TextureUniform<ImageSource>;

/// Cube texture uniform (`samplerCube`).
pub type CubeTextureUniform = TextureUniform<Cube<ImageSource>>;

impl<T: TextureData> Clone for TextureUniform<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TextureData> TextureUniform<T> {
    /// Texture with no content. Its content will come from a shader rendered into it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TextureInner {
                id: TextureId::next(),
                name: name.into(),
                state: RwLock::new(TextureState {
                    source: None,
                    generation: 0,
                    contexts: HashMap::new(),
                    units: HashMap::new(),
                }),
            }),
        }
    }

    pub fn with_source(name: impl Into<String>, source: impl Into<Value<T>>) -> Self {
        let texture = Self::new(name);
        texture.set(source);
        texture
    }

    pub fn id(&self) -> TextureId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Replace the image data. GPU textures are rebuilt on their next draw.
    pub fn set(&self, source: impl Into<Value<T>>) {
        let mut state = self.inner.state.write();
        state.source = Some(source.into());
        state.generation += 1;
    }

    pub fn has_source(&self) -> bool {
        self.inner.state.read().source.is_some()
    }

    /// GPU texture currently held for a context.
    pub fn handle(&self, context: ContextId) -> Option<TextureHandle> {
        self.inner
            .state
            .read()
            .contexts
            .get(&context)
            .map(|t| t.handle)
    }

    /// Whether this texture is a render target in a context.
    pub fn is_render_target(&self, context: ContextId) -> bool {
        self.inner
            .state
            .read()
            .contexts
            .get(&context)
            .is_some_and(|t| t.buffers.is_some())
    }

    /// Texture unit assigned for a program, if prepared.
    pub fn unit(&self, context: ContextId, program: ProgramHandle) -> Option<u32> {
        self.inner
            .state
            .read()
            .units
            .get(&(context, program))
            .copied()
    }

    /// Reserve a texture unit and (re)build the GPU texture from image data if needed.
    pub(crate) fn prepare<B: GlBackend>(
        &self,
        backend: &mut B,
        context: ContextId,
        program: ProgramHandle,
        units: &mut TextureUnits,
    ) -> Result<u32> {
        let mut state = self.inner.state.write();
        let unit = match state.units.get(&(context, program)) {
            Some(unit) => *unit,
            None => {
                let unit = units.reserve(program, &self.inner.name)?;
                state.units.insert((context, program), unit);
                unit
            }
        };

        let generation = state.generation;
        let existing = state.contexts.get(&context);
        if existing.is_some_and(|t| t.buffers.is_some()) {
            return Ok(unit);
        }
        let Some(source) = state.source.clone() else {
            return Ok(unit);
        };
        let data = source.get();
        let stale = existing.map_or(true, |t| t.generation != generation);
        if !stale && !data.is_streaming() {
            return Ok(unit);
        }

        let handle = data.upload(backend)?;
        if let Some(old) = state.contexts.insert(
            context,
            ContextTexture {
                handle,
                generation,
                buffers: None,
            },
        ) {
            backend.destroy_texture(old.handle);
        }
        log::trace!("Uploaded texture {} as {:?}", self.inner.name, handle);
        Ok(unit)
    }

    /// Bind the texture to its unit and point the sampler at it.
    pub(crate) fn send<B: GlBackend>(
        &self,
        backend: &mut B,
        context: ContextId,
        program: ProgramHandle,
    ) -> Result<()> {
        let state = self.inner.state.read();
        let unit = *state
            .units
            .get(&(context, program))
            .ok_or_else(|| Error::TextureNotPrepared(self.inner.name.clone()))?;
        let handle = state.contexts.get(&context).map(|t| t.handle);
        backend.bind_texture(unit, T::DIMENSION, handle);
        if !backend.set_uniform(program, &self.inner.name, UniformWrite::Sampler(unit)) {
            log::warn!("Uniform {} is not used by program {:?}", self.inner.name, program);
        }
        Ok(())
    }

    /// Off-screen buffers for rendering into this texture, created on first use.
    ///
    /// Any texture previously built from image data in this context is
    /// released; from here on the texture's content comes from rendering.
    pub(crate) fn buffers<B: GlBackend>(
        &self,
        backend: &mut B,
        context: ContextId,
        width: u32,
        height: u32,
    ) -> Result<T::Buffers> {
        let mut state = self.inner.state.write();
        if let Some(buffers) = state.contexts.get(&context).and_then(|t| t.buffers.clone()) {
            return Ok(buffers);
        }
        let (handle, buffers) = T::create_render_target(backend, width, height)?;
        let generation = state.generation;
        if let Some(old) = state.contexts.insert(
            context,
            ContextTexture {
                handle,
                generation,
                buffers: Some(buffers.clone()),
            },
        ) {
            backend.destroy_texture(old.handle);
        }
        log::debug!(
            "Created {}x{} render target for texture {} in context {:?}",
            width,
            height,
            self.inner.name,
            context
        );
        Ok(buffers)
    }

    /// Release everything held for a context.
    pub(crate) fn release<B: GlBackend>(&self, backend: &mut B, context: ContextId) {
        let mut state = self.inner.state.write();
        state.units.retain(|(ctx, _), _| *ctx != context);
        if let Some(texture) = state.contexts.remove(&context) {
            if let Some(buffers) = &texture.buffers {
                T::destroy_buffers(backend, buffers);
            }
            backend.destroy_texture(texture.handle);
        }
    }
}

impl CubeTextureUniform {
    /// Cube texture from named faces (`posx`, `negx`, `posy`, `negy`, `posz`, `negz`).
    pub fn from_faces<K: AsRef<str>>(
        name: impl Into<String>,
        faces: impl IntoIterator<Item = (K, ImageSource)>,
    ) -> Result<Self> {
        Ok(Self::with_source(name, Cube::from_named(faces)?))
    }
}

impl<T: TextureData> fmt::Debug for TextureUniform<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("TextureUniform")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("dimension", &T::DIMENSION)
            .field("generation", &state.generation)
            .field("contexts", &state.contexts.len())
            .finish()
    }
}
