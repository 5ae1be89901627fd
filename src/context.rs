//! Rendering contexts and their program caches
//!
//! Each surface gets exactly one context. Contexts are held in a registry and
//! referred to by [`ContextId`], which is never reused, so state cached
//! against a context elsewhere can't alias a later one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{ContextAttributes, DepthFunc, GlBackend, ProgramHandle, Surface, SurfaceId};
use crate::error::{Error, Result};
use crate::gl::{self, TextureUnits};

/// Handle to a context in a [`ContextRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A live context and everything cached against it.
pub struct ContextEntry<B> {
    id: ContextId,
    surface: SurfaceId,
    pub(crate) backend: B,
    pub(crate) units: TextureUnits,
    programs: HashMap<(String, String), ProgramHandle>,
}

impl<B: GlBackend> ContextEntry<B> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Number of programs compiled in this context.
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}

/// Registry of contexts, keyed by surface identity.
pub struct ContextRegistry<B> {
    entries: HashMap<ContextId, ContextEntry<B>>,
    by_surface: HashMap<SurfaceId, ContextId>,
    max_texture_units: u32,
}

impl<B: GlBackend> ContextRegistry<B> {
    pub fn new(max_texture_units: u32) -> Self {
        Self {
            entries: HashMap::new(),
            by_surface: HashMap::new(),
            max_texture_units,
        }
    }

    /// Context for `surface`, creating it with depth testing on first use.
    pub fn acquire(
        &mut self,
        surface: &dyn Surface<Backend = B>,
        attributes: &ContextAttributes,
    ) -> Result<ContextId> {
        let surface_id = surface.id();
        if let Some(id) = self.by_surface.get(&surface_id) {
            return Ok(*id);
        }

        let mut backend = surface.create_context(attributes)?;
        if attributes.depth_test {
            backend.enable_depth_test(DepthFunc::LessOrEqual);
        }
        let id = ContextId::next();
        log::debug!(
            "Created {} context {:?} for surface {:?}",
            backend.name(),
            id,
            surface_id
        );
        self.entries.insert(
            id,
            ContextEntry {
                id,
                surface: surface_id,
                backend,
                units: TextureUnits::new(self.max_texture_units),
                programs: HashMap::new(),
            },
        );
        self.by_surface.insert(surface_id, id);
        Ok(id)
    }

    /// Compiled program for the source pair, compiling and linking on first use.
    pub fn program(
        &mut self,
        id: ContextId,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle> {
        let entry = self.get_mut(id)?;
        let key = (vertex_source.to_string(), fragment_source.to_string());
        if let Some(program) = entry.programs.get(&key) {
            return Ok(*program);
        }
        let program = gl::compile_program(&mut entry.backend, vertex_source, fragment_source)?;
        log::debug!("Compiled program {:?} in context {:?}", program, id);
        entry.programs.insert(key, program);
        Ok(program)
    }

    pub fn get(&self, id: ContextId) -> Result<&ContextEntry<B>> {
        self.entries.get(&id).ok_or(Error::UnknownContext(id))
    }

    pub fn get_mut(&mut self, id: ContextId) -> Result<&mut ContextEntry<B>> {
        self.entries.get_mut(&id).ok_or(Error::UnknownContext(id))
    }

    /// Context previously created for a surface.
    pub fn for_surface(&self, surface: SurfaceId) -> Option<&ContextEntry<B>> {
        self.by_surface
            .get(&surface)
            .and_then(|id| self.entries.get(id))
    }

    pub fn for_surface_mut(&mut self, surface: SurfaceId) -> Option<&mut ContextEntry<B>> {
        let id = self.by_surface.get(&surface)?;
        self.entries.get_mut(id)
    }

    /// Tear down the context of a surface, releasing its programs.
    ///
    /// Returns false if the surface never had a context.
    pub fn destroy(&mut self, surface: SurfaceId) -> bool {
        let Some(id) = self.by_surface.remove(&surface) else {
            return false;
        };
        let Some(mut entry) = self.entries.remove(&id) else {
            return false;
        };
        for (_, program) in entry.programs.drain() {
            entry.units.forget(program);
            entry.backend.destroy_program(program);
        }
        log::debug!("Destroyed context {:?} of surface {:?}", id, surface);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
