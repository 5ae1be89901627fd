//! Vertex attributes

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{BufferHandle, BufferKind, GlBackend, ProgramHandle};
use crate::context::ContextId;
use crate::error::{Error, Result};
use crate::math::MathError;

/// Per-vertex layout of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeLayout {
    /// `float`, `vec2`, `vec3` or `vec4`.
    Vector(usize),
    /// `mat2`, `mat3` or `mat4`, bound as one vector attribute per column.
    Matrix(usize),
}

impl AttributeLayout {
    /// Floats per vertex.
    pub fn stride(self) -> usize {
        match self {
            AttributeLayout::Vector(d) => d,
            AttributeLayout::Matrix(d) => d * d,
        }
    }
}

struct AttributeInner {
    name: String,
    layout: AttributeLayout,
    // Matrix attributes hold one array per column.
    columns: Vec<Vec<f32>>,
    buffers: RwLock<HashMap<ContextId, Vec<BufferHandle>>>,
}

/// A named vertex buffer. Uploaded once per context and reused.
#[derive(Clone)]
pub struct Attribute {
    inner: Arc<AttributeInner>,
}

impl Attribute {
    /// Vector attribute of dimension 1 to 4.
    pub fn vector(name: impl Into<String>, dimension: usize, data: impl Into<Vec<f32>>) -> Result<Self> {
        if !(1..=4).contains(&dimension) {
            return Err(MathError::UnsupportedDimension(dimension).into());
        }
        let name = name.into();
        let data = data.into();
        check_len(&name, data.len(), dimension)?;
        Ok(Self::build(name, AttributeLayout::Vector(dimension), vec![data]))
    }

    /// Matrix attribute of dimension 2 to 4, given as one array per column.
    ///
    /// Column `i` is bound at the attribute's location plus `i`.
    pub fn matrix(name: impl Into<String>, dimension: usize, columns: Vec<Vec<f32>>) -> Result<Self> {
        if !(2..=4).contains(&dimension) {
            return Err(MathError::UnsupportedDimension(dimension).into());
        }
        let name = name.into();
        if columns.len() != dimension {
            return Err(Error::DimensionMismatch {
                name,
                expected: dimension,
                actual: columns.len(),
            });
        }
        let vertices = columns.first().map_or(0, |c| c.len() / dimension);
        for column in &columns {
            check_len(&name, column.len(), dimension)?;
            if column.len() / dimension != vertices {
                return Err(Error::AttributeLengthMismatch {
                    name,
                    expected: vertices,
                    actual: column.len() / dimension,
                });
            }
        }
        Ok(Self::build(name, AttributeLayout::Matrix(dimension), columns))
    }

    pub fn float(name: impl Into<String>, data: impl Into<Vec<f32>>) -> Result<Self> {
        Self::vector(name, 1, data)
    }

    pub fn vec2(name: impl Into<String>, data: impl Into<Vec<f32>>) -> Result<Self> {
        Self::vector(name, 2, data)
    }

    pub fn vec3(name: impl Into<String>, data: impl Into<Vec<f32>>) -> Result<Self> {
        Self::vector(name, 3, data)
    }

    pub fn vec4(name: impl Into<String>, data: impl Into<Vec<f32>>) -> Result<Self> {
        Self::vector(name, 4, data)
    }

    pub fn mat2(name: impl Into<String>, columns: Vec<Vec<f32>>) -> Result<Self> {
        Self::matrix(name, 2, columns)
    }

    pub fn mat3(name: impl Into<String>, columns: Vec<Vec<f32>>) -> Result<Self> {
        Self::matrix(name, 3, columns)
    }

    pub fn mat4(name: impl Into<String>, columns: Vec<Vec<f32>>) -> Result<Self> {
        Self::matrix(name, 4, columns)
    }

    fn build(name: String, layout: AttributeLayout, columns: Vec<Vec<f32>>) -> Self {
        Self {
            inner: Arc::new(AttributeInner {
                name,
                layout,
                columns,
                buffers: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn layout(&self) -> AttributeLayout {
        self.inner.layout
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        let components = match self.inner.layout {
            AttributeLayout::Vector(d) | AttributeLayout::Matrix(d) => d,
        };
        self.inner.columns.first().map_or(0, |c| c.len() / components)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upload (first time in this context) and bind to the program's attribute location.
    pub fn send<B: GlBackend>(
        &self,
        backend: &mut B,
        context: ContextId,
        program: ProgramHandle,
    ) -> Result<()> {
        let buffers = self.buffers(backend, context)?;
        let Some(location) = backend.attribute_location(program, &self.inner.name) else {
            log::warn!("Attribute {} is not used by program {:?}", self.inner.name, program);
            return Ok(());
        };
        let components = match self.inner.layout {
            AttributeLayout::Vector(d) | AttributeLayout::Matrix(d) => d as u32,
        };
        for (i, buffer) in buffers.into_iter().enumerate() {
            backend.bind_vertex_attribute(location + i as u32, buffer, components);
        }
        Ok(())
    }

    fn buffers<B: GlBackend>(&self, backend: &mut B, context: ContextId) -> Result<Vec<BufferHandle>> {
        if let Some(buffers) = self.inner.buffers.read().get(&context) {
            return Ok(buffers.clone());
        }
        let mut buffers = Vec::with_capacity(self.inner.columns.len());
        for column in &self.inner.columns {
            match backend.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(column)) {
                Ok(buffer) => buffers.push(buffer),
                Err(err) => {
                    for buffer in buffers {
                        backend.destroy_buffer(buffer);
                    }
                    return Err(err.into());
                }
            }
        }
        log::trace!(
            "Uploaded attribute {} ({} vertices) in context {:?}",
            self.inner.name,
            self.len(),
            context
        );
        self.inner.buffers.write().insert(context, buffers.clone());
        Ok(buffers)
    }

    pub(crate) fn release<B: GlBackend>(&self, backend: &mut B, context: ContextId) {
        if let Some(buffers) = self.inner.buffers.write().remove(&context) {
            for buffer in buffers {
                backend.destroy_buffer(buffer);
            }
        }
    }
}

fn check_len(name: &str, len: usize, dimension: usize) -> Result<()> {
    if len % dimension != 0 {
        return Err(Error::DimensionMismatch {
            name: name.to_string(),
            expected: len.next_multiple_of(dimension),
            actual: len,
        });
    }
    Ok(())
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.inner.name)
            .field("layout", &self.inner.layout)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ContextAttributes, DummyBackend, GlCall, HeadlessSurface};
    use crate::context::ContextRegistry;

    fn context() -> (ContextRegistry<DummyBackend>, ContextId, ProgramHandle) {
        let mut registry = ContextRegistry::new(32);
        let surface = HeadlessSurface::new(16, 16);
        let id = registry
            .acquire(&surface, &ContextAttributes::default())
            .unwrap();
        let program = registry.program(id, "vs", "fs").unwrap();
        (registry, id, program)
    }

    #[test]
    fn test_length_is_vertex_count() {
        let a = Attribute::vec2("aPosition", vec![0.0; 8]).unwrap();
        assert_eq!(a.len(), 4);
        assert!(matches!(
            Attribute::vec3("aNormal", vec![0.0; 8]),
            Err(Error::DimensionMismatch {
                expected: 9,
                actual: 8,
                ..
            })
        ));
        assert!(Attribute::vector("aBad", 5, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_matrix_needs_one_column_per_dimension() {
        assert!(matches!(
            Attribute::matrix("aInstance", 3, Vec::new()),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 0,
                ..
            })
        ));
        let m = Attribute::mat3("aInstance", vec![vec![0.0; 6]; 3]).unwrap();
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_buffer_is_uploaded_once_per_context() {
        let (mut registry, id, program) = context();
        let entry = registry.get_mut(id).unwrap();
        let a = Attribute::vec2("aPosition", crate::constants::PLANE_VERTICES.to_vec()).unwrap();
        a.send(&mut entry.backend, id, program).unwrap();
        a.send(&mut entry.backend, id, program).unwrap();

        let calls = entry.backend.calls();
        let created = calls
            .iter()
            .filter(|c| matches!(c, GlCall::CreateBuffer { kind: BufferKind::Vertex, size: 32, .. }))
            .count();
        let bound = calls
            .iter()
            .filter(|c| matches!(c, GlCall::BindVertexAttribute { components: 2, .. }))
            .count();
        assert_eq!((created, bound), (1, 2));
    }

    #[test]
    fn test_matrix_columns_use_consecutive_locations() {
        let (mut registry, id, program) = context();
        let entry = registry.get_mut(id).unwrap();
        let columns = vec![vec![1.0; 9], vec![2.0; 9], vec![3.0; 9]];
        let a = Attribute::mat3("aInstance", columns).unwrap();
        assert_eq!(a.len(), 3);
        a.send(&mut entry.backend, id, program).unwrap();

        let locations: Vec<u32> = entry
            .backend
            .calls()
            .iter()
            .filter_map(|c| match c {
                GlCall::BindVertexAttribute { location, .. } => Some(*location),
                _ => None,
            })
            .collect();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[1], locations[0] + 1);
        assert_eq!(locations[2], locations[0] + 2);
    }

    #[test]
    fn test_missing_location_is_not_an_error() {
        let mut registry = ContextRegistry::<DummyBackend>::new(32);
        let surface = HeadlessSurface::new(4, 4).with_missing_name("aUnused");
        let id = registry
            .acquire(&surface, &ContextAttributes::default())
            .unwrap();
        let program = registry.program(id, "vs", "fs").unwrap();
        let entry = registry.get_mut(id).unwrap();
        let a = Attribute::float("aUnused", vec![1.0, 2.0]).unwrap();
        a.send(&mut entry.backend, id, program).unwrap();
        assert!(!entry
            .backend
            .calls()
            .iter()
            .any(|c| matches!(c, GlCall::BindVertexAttribute { .. })));

        let live = entry.backend.live_objects();
        a.release(&mut entry.backend, id);
        assert_eq!(entry.backend.live_objects(), live - 1);
    }
}
