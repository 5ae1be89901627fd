use std::fmt;
use std::sync::Arc;

/// A uniform's data: either a literal, or a producer called on every read.
pub enum Value<T> {
    Literal(T),
    Computed(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> Value<T> {
    /// Wrap a producer closure.
    pub fn computed(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Value::Computed(Arc::new(f))
    }

    /// Current value. Producers are invoked fresh every time.
    pub fn get(&self) -> T {
        match self {
            Value::Literal(v) => v.clone(),
            Value::Computed(f) => f(),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Value::Computed(_))
    }
}

impl<T: PartialEq> Value<T> {
    /// Whether two values are the same source: equal literals, or the very same producer.
    pub fn same_source(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Literal(a), Value::Literal(b)) => a == b,
            (Value::Computed(a), Value::Computed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        match self {
            Value::Literal(v) => Value::Literal(v.clone()),
            Value::Computed(f) => Value::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Value::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<T> From<T> for Value<T> {
    fn from(value: T) -> Self {
        Value::Literal(value)
    }
}

impl From<i32> for Value<f64> {
    fn from(value: i32) -> Self {
        Value::Literal(value as f64)
    }
}

impl From<bool> for Value<f64> {
    fn from(value: bool) -> Self {
        Value::Literal(if value { 1.0 } else { 0.0 })
    }
}

impl<const N: usize> From<[f32; N]> for Value<Vec<f32>> {
    fn from(value: [f32; N]) -> Self {
        Value::Literal(value.to_vec())
    }
}

impl From<&[f32]> for Value<Vec<f32>> {
    fn from(value: &[f32]) -> Self {
        Value::Literal(value.to_vec())
    }
}

impl From<&[f64]> for Value<Vec<f32>> {
    fn from(value: &[f64]) -> Self {
        Value::Literal(value.iter().map(|v| *v as f32).collect())
    }
}

impl From<crate::math::Matrix> for Value<Vec<f32>> {
    fn from(value: crate::math::Matrix) -> Self {
        Value::Literal(value.into_vec())
    }
}

impl From<glam::Vec2> for Value<Vec<f32>> {
    fn from(value: glam::Vec2) -> Self {
        Value::Literal(value.to_array().to_vec())
    }
}

impl From<glam::Vec3> for Value<Vec<f32>> {
    fn from(value: glam::Vec3) -> Self {
        Value::Literal(value.to_array().to_vec())
    }
}

impl From<glam::Vec4> for Value<Vec<f32>> {
    fn from(value: glam::Vec4) -> Self {
        Value::Literal(value.to_array().to_vec())
    }
}

impl From<glam::Mat2> for Value<Vec<f32>> {
    fn from(value: glam::Mat2) -> Self {
        Value::Literal(value.to_cols_array().to_vec())
    }
}

impl From<glam::Mat3> for Value<Vec<f32>> {
    fn from(value: glam::Mat3) -> Self {
        Value::Literal(value.to_cols_array().to_vec())
    }
}

impl From<glam::Mat4> for Value<Vec<f32>> {
    fn from(value: glam::Mat4) -> Self {
        Value::Literal(value.to_cols_array().to_vec())
    }
}
