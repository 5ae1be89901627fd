use std::sync::Arc;

use parking_lot::RwLock;

use super::Value;
use crate::backend::{GlBackend, ProgramHandle, UniformWrite};
use crate::error::{Error, Result};

/// GLSL type of a scalar uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    Float,
    Integer,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Boolean => "boolean",
            ScalarKind::Float => "float",
            ScalarKind::Integer => "integer",
        }
    }
}

struct ScalarInner {
    name: String,
    kind: ScalarKind,
    value: RwLock<Option<Value<f64>>>,
}

/// A boolean, float or integer uniform.
#[derive(Clone)]
pub struct ScalarUniform {
    inner: Arc<ScalarInner>,
}

impl ScalarUniform {
    pub fn new(kind: ScalarKind, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ScalarInner {
                name: name.into(),
                kind,
                value: RwLock::new(None),
            }),
        }
    }

    pub fn boolean(name: impl Into<String>, value: impl Into<Value<f64>>) -> Self {
        Self::new(ScalarKind::Boolean, name).with_value(value)
    }

    pub fn float(name: impl Into<String>, value: impl Into<Value<f64>>) -> Self {
        Self::new(ScalarKind::Float, name).with_value(value)
    }

    pub fn integer(name: impl Into<String>, value: impl Into<Value<f64>>) -> Self {
        Self::new(ScalarKind::Integer, name).with_value(value)
    }

    fn with_value(self, value: impl Into<Value<f64>>) -> Self {
        *self.inner.value.write() = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> ScalarKind {
        self.inner.kind
    }

    /// Replace the value or producer.
    pub fn set(&self, value: impl Into<Value<f64>>) {
        *self.inner.value.write() = Some(value.into());
    }

    /// Current value, failing if unset or not a number.
    pub fn value(&self) -> Result<f64> {
        let value = self
            .inner
            .value
            .read()
            .clone()
            .ok_or_else(|| Error::MissingValue(self.inner.name.clone()))?;
        let v = value.get();
        if v.is_nan() {
            return Err(Error::NotANumber(self.inner.name.clone()));
        }
        Ok(v)
    }

    pub fn send<B: GlBackend>(&self, backend: &mut B, program: ProgramHandle) -> Result<()> {
        let v = self.value()?;
        let write = match self.inner.kind {
            ScalarKind::Boolean => UniformWrite::Bool(v != 0.0),
            ScalarKind::Float => UniformWrite::Float(v as f32),
            ScalarKind::Integer => UniformWrite::Int(v as i32),
        };
        if !backend.set_uniform(program, &self.inner.name, write) {
            log::warn!("Uniform {} is not used by program {:?}", self.inner.name, program);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ScalarUniform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarUniform")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, RecordedUniform};

    #[test]
    fn test_scalar_kinds_write_the_right_type() {
        let mut backend = DummyBackend::new();
        let program = ProgramHandle(1);
        ScalarUniform::boolean("uOn", true).send(&mut backend, program).unwrap();
        ScalarUniform::float("uT", 0.5).send(&mut backend, program).unwrap();
        ScalarUniform::integer("uN", 3).send(&mut backend, program).unwrap();
        assert_eq!(backend.last_uniform("uOn"), Some(&RecordedUniform::Bool(true)));
        assert_eq!(backend.last_uniform("uT"), Some(&RecordedUniform::Float(0.5)));
        assert_eq!(backend.last_uniform("uN"), Some(&RecordedUniform::Int(3)));
    }

    #[test]
    fn test_nan_is_rejected_at_send() {
        let mut backend = DummyBackend::new();
        let u = ScalarUniform::float("uT", f64::NAN);
        assert!(matches!(
            u.send(&mut backend, ProgramHandle(1)),
            Err(Error::NotANumber(_))
        ));
        assert!(matches!(
            ScalarUniform::new(ScalarKind::Float, "uX").value(),
            Err(Error::MissingValue(_))
        ));
    }

    #[test]
    fn test_set_from_event_handler() {
        let u = ScalarUniform::integer("uMode", 0);
        let handle = u.clone();
        handle.set(2);
        assert_eq!(u.value().unwrap(), 2.0);
    }
}
