//! Common types used across backends

use crate::uniforms::CubeFace;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Primitive assembly mode for a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    #[default]
    TriangleStrip,
    TriangleFan,
}

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D2,
    Cube,
}

/// Image upload target: a 2D texture or one face of a cube texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexImageTarget {
    D2,
    CubeFace(CubeFace),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Texture parameters applied with `texParameteri`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl SamplerState {
    /// Clamped addressing with linear filtering and no mipmaps.
    pub const CLAMPED_LINEAR: Self = Self {
        wrap_s: WrapMode::ClampToEdge,
        wrap_t: WrapMode::ClampToEdge,
        min_filter: FilterMode::Linear,
        mag_filter: FilterMode::Linear,
    };

    /// Repeating addressing with trilinear filtering.
    pub const MIPMAPPED: Self = Self {
        wrap_s: WrapMode::Repeat,
        wrap_t: WrapMode::Repeat,
        min_filter: FilterMode::LinearMipmapLinear,
        mag_filter: FilterMode::Linear,
    };
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    Less,
    LessOrEqual,
    Always,
}

/// Viewport rectangle in pixels: x, y, width, height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport covering a whole surface of the given size.
    pub fn full(size: (u32, u32)) -> Self {
        Self::new(0, 0, size.0, size.1)
    }

    /// Largest square with the same origin that fits inside this viewport.
    pub fn square(self) -> Self {
        let side = self.width.min(self.height);
        Self::new(self.x, self.y, side, side)
    }
}

/// Attributes requested when a rendering context is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAttributes {
    /// Keep the drawing buffer after presenting so it can be read back or drawn over.
    pub preserve_drawing_buffer: bool,
    pub depth_test: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            preserve_drawing_buffer: true,
            depth_test: true,
        }
    }
}

/// A single uniform write, in the shape the GL `uniform*` calls take
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformWrite<'a> {
    Bool(bool),
    Float(f32),
    Int(i32),
    /// `uniform{2,3,4}fv`; the slice length is the vector dimension.
    Vector(&'a [f32]),
    /// `uniformMatrix{2,3,4}fv`, column-major, never transposed.
    Matrix { dimension: usize, data: &'a [f32] },
    /// Texture unit index for a sampler.
    Sampler(u32),
}
