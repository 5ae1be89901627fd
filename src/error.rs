//! Error types for the crate

use crate::backend::BackendError;
use crate::math::MathError;
use thiserror::Error;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Math(#[from] MathError),
    #[error("dimension mismatch for uniform {name}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("data for uniform {0} should be a number")]
    NotANumber(String),
    #[error("uniform {0} has no value")]
    MissingValue(String),
    #[error("uniform {name} has kind {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("cube texture data is missing the {0} face")]
    MissingCubeFace(&'static str),
    #[error("unknown cube face {0:?}, expected one of posx, negx, posy, negy, posz, negz")]
    UnknownCubeFace(String),
    #[error("invalid image data: {0}")]
    InvalidImageData(String),
    #[error("already at the maximum of {max} textures for this program (uniform {name})")]
    TextureUnitsExhausted { name: String, max: u32 },
    #[error("texture uniform {0} was sent before it was prepared")]
    TextureNotPrepared(String),
    #[error("shader requires at least one attribute")]
    NoAttributes,
    #[error("shader must render to a surface or a texture uniform, got {0} uniform")]
    InvalidRenderTarget(&'static str),
    #[error("cube camera uniform {0} gets its data from a shader and cannot be set")]
    CubeCameraIsShaderProduced(String),
    #[error("attribute {name} describes {actual} vertices, expected {expected}")]
    AttributeLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("texture {0} is sampled while it is being rendered")]
    TextureCycle(String),
    #[error("unknown rendering context {0:?}")]
    UnknownContext(crate::context::ContextId),
}

pub type Result<T> = std::result::Result<T, Error>;
