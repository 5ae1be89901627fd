//! Backend abstraction layer
//!
//! Provides the GL capability trait, the types it speaks in, a recording
//! dummy backend and, behind the `glow-backend` feature, an OpenGL/WebGL
//! backend built on `glow`.

pub mod dummy;
pub mod traits;
pub mod types;

#[cfg(feature = "glow-backend")]
pub mod glow_backend;

pub use dummy::{DummyBackend, GlCall, HeadlessSurface, RecordedUniform};
pub use traits::*;
pub use types::*;

#[cfg(feature = "glow-backend")]
pub use glow_backend::{GlowBackend, GlowSurface};
