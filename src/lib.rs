//! Declarative GL - declarative shaders over a WebGL-style rendering API
//!
//! Describe a draw as data (vertex attributes, uniforms, a vertex/fragment
//! source pair and a render target) and let the library manage contexts,
//! programs, buffers, framebuffers and textures across frames.
//!
//! # Features
//! - Typed uniforms with literal or computed values, resolved on every draw
//! - Derived matrices: model (`T * R * S`), normal, look-at view, perspective
//! - Lazy render-to-texture: drawing into a texture only happens when a later
//!   draw samples it
//! - Cube cameras that render a scene into the six faces of a cube texture
//! - A recording backend for headless tests, and a `glow` backend for real GL

pub mod attributes;
pub mod backend;
pub mod constants;
pub mod context;
pub mod error;
pub mod gl;
pub mod logging;
pub mod math;
pub mod pending;
pub mod renderer;
pub mod uniforms;

pub use attributes::Attribute;
pub use backend::{ContextAttributes, DummyBackend, GlBackend, HeadlessSurface, Surface, Viewport};
#[cfg(feature = "glow-backend")]
pub use backend::{GlowBackend, GlowSurface};
pub use error::{Error, Result};
pub use logging::{init_logging, LoggingConfig};
pub use renderer::{RenderTarget, Renderer, Shader, ShaderOptions};
pub use uniforms::{
    CubeCameraUniform, CubeTextureUniform, ImageSource, ModelMatrixUniform, ModelOptions,
    NormalMatrixUniform, PerspectiveMatrixUniform, ScalarUniform, SequenceUniform,
    Texture2DUniform, Uniform, Value, ViewMatrixUniform,
};

/// Configuration for a [`Renderer`]
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Color surfaces and render targets are cleared to
    pub clear_color: [f32; 4],
    /// Attributes of every context the renderer creates
    pub context: ContextAttributes,
    /// Texture units available to one program
    pub max_texture_units: u32,
    /// Fail draws that sample a texture while it is being rendered into
    pub detect_texture_cycles: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            context: ContextAttributes::default(),
            max_texture_units: gl::MAX_TEXTURE_UNITS,
            detect_texture_cycles: true,
        }
    }
}
