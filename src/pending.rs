//! Deferred render-to-texture work
//!
//! Rendering a shader into a texture uniform doesn't draw anything. The
//! request is queued here against the texture and only executed when some
//! later draw samples that texture. A texture nobody samples is never
//! rendered.

use std::collections::HashMap;

use crate::renderer::Shader;
use crate::uniforms::{TextureId, Uniform};

/// A queued draw of `shader` into the texture `target`.
#[derive(Debug, Clone)]
pub struct PendingRender {
    pub shader: Shader,
    pub target: Uniform,
}

/// Queue of pending renders, keyed by target texture.
#[derive(Debug, Default)]
pub struct PendingRenders {
    queues: HashMap<TextureId, Vec<PendingRender>>,
}

impl PendingRenders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, texture: TextureId, render: PendingRender) {
        self.queues.entry(texture).or_default().push(render);
    }

    /// Remove and return everything queued for a texture, in submission order.
    pub fn take(&mut self, texture: TextureId) -> Vec<PendingRender> {
        self.queues.remove(&texture).unwrap_or_default()
    }

    pub fn is_pending(&self, texture: TextureId) -> bool {
        self.queues.contains_key(&texture)
    }

    /// Number of queued renders across all textures.
    pub fn len(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }
}
