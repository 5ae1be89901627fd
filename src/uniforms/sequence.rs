use std::sync::Arc;

use parking_lot::RwLock;

use super::matrices::{MatrixTransform, ModelParts, PerspectiveParts, ViewParts};
use super::Value;
use crate::backend::{GlBackend, ProgramHandle, UniformWrite};
use crate::error::{Error, Result};
use crate::math::{self, Matrix, MathError};

/// Shape of a vector or matrix uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Vector(usize),
    Matrix(usize),
}

impl Shape {
    pub fn dimension(self) -> usize {
        match self {
            Shape::Vector(d) | Shape::Matrix(d) => d,
        }
    }

    /// Number of floats a value of this shape holds.
    pub fn len(self) -> usize {
        match self {
            Shape::Vector(d) => d,
            Shape::Matrix(d) => d * d,
        }
    }

    pub fn kind_name(self) -> &'static str {
        match self {
            Shape::Vector(_) => "vector",
            Shape::Matrix(_) => "matrix",
        }
    }
}

/// Where a sequence uniform's data comes from.
///
/// Derived sources are re-evaluated on every read, so they always reflect the
/// current state of whatever they were built from.
#[derive(Clone)]
pub enum SequenceSource {
    Unset,
    Value(Value<Vec<f32>>),
    /// `T * R * S` from independently mutable parts.
    Model(Arc<RwLock<ModelParts>>),
    /// Inverse-transpose of another matrix uniform's upper-left 3x3.
    Normal {
        model: SequenceUniform,
        dimension: usize,
    },
    /// Look-at from eye/at/up.
    View(Arc<RwLock<ViewParts>>),
    Perspective(Arc<RwLock<PerspectiveParts>>),
    /// Another source with a transform applied on top.
    Transformed {
        base: Box<SequenceSource>,
        dimension: usize,
        transform: Arc<dyn MatrixTransform>,
    },
}

impl SequenceSource {
    /// Whether both sources are the same literal, producer or derived state.
    pub fn same_as(&self, other: &SequenceSource) -> bool {
        match (self, other) {
            (SequenceSource::Unset, SequenceSource::Unset) => true,
            (SequenceSource::Value(a), SequenceSource::Value(b)) => a.same_source(b),
            (SequenceSource::Model(a), SequenceSource::Model(b)) => Arc::ptr_eq(a, b),
            (SequenceSource::View(a), SequenceSource::View(b)) => Arc::ptr_eq(a, b),
            (SequenceSource::Perspective(a), SequenceSource::Perspective(b)) => Arc::ptr_eq(a, b),
            (
                SequenceSource::Normal {
                    model: a,
                    dimension: da,
                },
                SequenceSource::Normal {
                    model: b,
                    dimension: db,
                },
            ) => a.ptr_eq(b) && da == db,
            (
                SequenceSource::Transformed {
                    base: a,
                    transform: ta,
                    ..
                },
                SequenceSource::Transformed {
                    base: b,
                    transform: tb,
                    ..
                },
            ) => Arc::ptr_eq(ta, tb) && a.same_as(b),
            _ => false,
        }
    }

    fn evaluate(&self, name: &str) -> Result<Vec<f32>> {
        match self {
            SequenceSource::Unset => Err(Error::MissingValue(name.to_string())),
            SequenceSource::Value(value) => Ok(value.get()),
            SequenceSource::Model(parts) => Ok(parts.read().matrix().into_vec()),
            SequenceSource::Normal { model, dimension } => {
                let m = model.matrix()?;
                Ok(math::normal_matrix(&m, *dimension)?.into_vec())
            }
            SequenceSource::View(parts) => Ok(parts.read().matrix().into_vec()),
            SequenceSource::Perspective(parts) => Ok(parts.read().matrix().into_vec()),
            SequenceSource::Transformed {
                base,
                dimension,
                transform,
            } => {
                let m = Matrix::from_column_major(*dimension, &base.evaluate(name)?)?;
                Ok(transform.transform(&m)?.into_vec())
            }
        }
    }
}

impl std::fmt::Debug for SequenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceSource::Unset => f.write_str("Unset"),
            SequenceSource::Value(v) => f.debug_tuple("Value").field(v).finish(),
            SequenceSource::Model(p) => f.debug_tuple("Model").field(&*p.read()).finish(),
            SequenceSource::Normal { model, dimension } => f
                .debug_struct("Normal")
                .field("model", &model.name())
                .field("dimension", dimension)
                .finish(),
            SequenceSource::View(p) => f.debug_tuple("View").field(&*p.read()).finish(),
            SequenceSource::Perspective(p) => {
                f.debug_tuple("Perspective").field(&*p.read()).finish()
            }
            SequenceSource::Transformed {
                base, transform, ..
            } => f
                .debug_struct("Transformed")
                .field("base", base)
                .field("transform", transform)
                .finish(),
        }
    }
}

struct SequenceInner {
    name: String,
    shape: Shape,
    source: RwLock<SequenceSource>,
}

/// A vector or matrix uniform. Matrices are column-major.
#[derive(Clone)]
pub struct SequenceUniform {
    inner: Arc<SequenceInner>,
}

impl SequenceUniform {
    /// Unset uniform of the given shape. Dimensions must be 2, 3 or 4.
    pub fn new(shape: Shape, name: impl Into<String>) -> Result<Self> {
        let dimension = shape.dimension();
        if !(2..=4).contains(&dimension) {
            return Err(MathError::UnsupportedDimension(dimension).into());
        }
        Ok(Self::with_source(shape, name, SequenceSource::Unset))
    }

    pub(crate) fn with_source(shape: Shape, name: impl Into<String>, source: SequenceSource) -> Self {
        Self {
            inner: Arc::new(SequenceInner {
                name: name.into(),
                shape,
                source: RwLock::new(source),
            }),
        }
    }

    fn sized(shape: Shape, name: impl Into<String>) -> Self {
        Self::with_source(shape, name, SequenceSource::Unset)
    }

    pub fn vec2(name: impl Into<String>) -> Self {
        Self::sized(Shape::Vector(2), name)
    }

    pub fn vec3(name: impl Into<String>) -> Self {
        Self::sized(Shape::Vector(3), name)
    }

    pub fn vec4(name: impl Into<String>) -> Self {
        Self::sized(Shape::Vector(4), name)
    }

    pub fn mat2(name: impl Into<String>) -> Self {
        Self::sized(Shape::Matrix(2), name)
    }

    pub fn mat3(name: impl Into<String>) -> Self {
        Self::sized(Shape::Matrix(3), name)
    }

    pub fn mat4(name: impl Into<String>) -> Self {
        Self::sized(Shape::Matrix(4), name)
    }

    /// Matrix uniform holding the identity.
    pub fn identity(name: impl Into<String>, dimension: usize) -> Result<Self> {
        let u = Self::new(Shape::Matrix(dimension), name)?;
        u.set(math::identity(dimension))?;
        Ok(u)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(self, value: impl Into<Value<Vec<f32>>>) -> Result<Self> {
        self.set(value)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn shape(&self) -> Shape {
        self.inner.shape
    }

    /// Whether both handles refer to the same uniform.
    pub fn ptr_eq(&self, other: &SequenceUniform) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn check(&self, data: &[f32]) -> Result<()> {
        let expected = self.inner.shape.len();
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                name: self.inner.name.clone(),
                expected,
                actual: data.len(),
            });
        }
        if data.iter().any(|v| v.is_nan()) {
            return Err(Error::NotANumber(self.inner.name.clone()));
        }
        Ok(())
    }

    /// Replace the value or producer. The data is validated before it is stored.
    pub fn set(&self, value: impl Into<Value<Vec<f32>>>) -> Result<()> {
        let value = value.into();
        self.check(&value.get())?;
        *self.inner.source.write() = SequenceSource::Value(value);
        Ok(())
    }

    /// Current data source.
    pub fn source(&self) -> SequenceSource {
        self.inner.source.read().clone()
    }

    /// Swap in a different source, returning the previous one.
    pub(crate) fn replace_source(&self, source: SequenceSource) -> SequenceSource {
        std::mem::replace(&mut *self.inner.source.write(), source)
    }

    /// Current value, evaluated and validated.
    pub fn value(&self) -> Result<Vec<f32>> {
        // Evaluate outside the lock: derived sources read other uniforms.
        let source = self.source();
        let data = source.evaluate(&self.inner.name)?;
        self.check(&data)?;
        Ok(data)
    }

    /// Current value as a matrix.
    pub fn matrix(&self) -> Result<Matrix> {
        let Shape::Matrix(dimension) = self.inner.shape else {
            return Err(Error::TypeMismatch {
                name: self.inner.name.clone(),
                expected: "matrix",
                actual: "vector",
            });
        };
        Ok(Matrix::from_column_major(dimension, &self.value()?)?)
    }

    /// Fail unless this is a matrix uniform of the given dimension.
    pub(crate) fn expect_matrix(&self, dimension: usize) -> Result<()> {
        match self.inner.shape {
            Shape::Matrix(d) if d == dimension => Ok(()),
            Shape::Matrix(d) => Err(Error::DimensionMismatch {
                name: self.inner.name.clone(),
                expected: dimension * dimension,
                actual: d * d,
            }),
            Shape::Vector(_) => Err(Error::TypeMismatch {
                name: self.inner.name.clone(),
                expected: "matrix",
                actual: "vector",
            }),
        }
    }

    pub fn send<B: GlBackend>(&self, backend: &mut B, program: ProgramHandle) -> Result<()> {
        let data = self.value()?;
        let write = match self.inner.shape {
            Shape::Vector(_) => UniformWrite::Vector(&data),
            Shape::Matrix(dimension) => UniformWrite::Matrix {
                dimension,
                data: &data,
            },
        };
        if !backend.set_uniform(program, &self.inner.name, write) {
            log::warn!("Uniform {} is not used by program {:?}", self.inner.name, program);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SequenceUniform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceUniform")
            .field("name", &self.inner.name)
            .field("shape", &self.inner.shape)
            .field("source", &*self.inner.source.read())
            .finish()
    }
}
