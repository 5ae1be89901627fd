//! Derived matrix uniforms and transform combinators.

use std::sync::Arc;

use parking_lot::RwLock;

use super::sequence::{SequenceSource, SequenceUniform, Shape};
use crate::error::{Error, Result};
use crate::math::{self, Matrix, Vector3};

/// Independently mutable parts of a model matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParts {
    scale: Matrix,
    rotation: Matrix,
    translation: Vector3,
}

impl ModelParts {
    /// `T * R * S`.
    pub fn matrix(&self) -> Matrix {
        let t = math::translation(self.translation[0], self.translation[1], self.translation[2]);
        math::mul(&t, &math::mul(&self.rotation, &self.scale))
    }
}

impl Default for ModelParts {
    fn default() -> Self {
        Self {
            scale: math::identity(4),
            rotation: math::identity(4),
            translation: [0.0; 3],
        }
    }
}

/// Initial transform of a [`ModelMatrixUniform`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOptions {
    /// One factor for uniform scale, three or four for per-axis scale.
    pub scale: Option<Vec<f32>>,
    /// Angle in radians and rotation axis.
    pub rotate: Option<(f32, Vector3)>,
    pub translate: Option<Vector3>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(mut self, factors: impl Into<Vec<f32>>) -> Self {
        self.scale = Some(factors.into());
        self
    }

    pub fn rotate(mut self, theta: f32, axis: Vector3) -> Self {
        self.rotate = Some((theta, axis));
        self
    }

    pub fn translate(mut self, x: f32, y: f32, z: f32) -> Self {
        self.translate = Some([x, y, z]);
        self
    }
}

/// Model matrix uniform that applies a scale, a rotation and a translation, in that order.
#[derive(Debug, Clone)]
pub struct ModelMatrixUniform {
    uniform: SequenceUniform,
    parts: Arc<RwLock<ModelParts>>,
}

impl ModelMatrixUniform {
    pub fn new(name: impl Into<String>, options: ModelOptions) -> Result<Self> {
        let mut parts = ModelParts::default();
        if let Some(factors) = &options.scale {
            parts.scale = math::scale(&parts.scale, factors)?;
        }
        if let Some((theta, axis)) = options.rotate {
            parts.rotation = math::rotation(4, theta, axis)?;
        }
        if let Some(t) = options.translate {
            parts.translation = t;
        }
        let parts = Arc::new(RwLock::new(parts));
        let uniform = SequenceUniform::with_source(
            Shape::Matrix(4),
            name,
            SequenceSource::Model(Arc::clone(&parts)),
        );
        Ok(Self { uniform, parts })
    }

    pub fn uniform(&self) -> &SequenceUniform {
        &self.uniform
    }

    /// Current `T * R * S`.
    pub fn matrix(&self) -> Matrix {
        self.parts.read().matrix()
    }

    /// Compose a further rotation on top of the current one.
    pub fn rotate(&self, theta: f32, axis: Vector3) -> Result<()> {
        let r = math::rotation(4, theta, axis)?;
        let mut parts = self.parts.write();
        parts.rotation = math::mul(&r, &parts.rotation);
        Ok(())
    }

    /// Replace the rotation.
    pub fn set_rotation(&self, theta: f32, axis: Vector3) -> Result<()> {
        self.parts.write().rotation = math::rotation(4, theta, axis)?;
        Ok(())
    }

    /// Compose a further scale on top of the current one.
    pub fn scale(&self, factors: &[f32]) -> Result<()> {
        let mut parts = self.parts.write();
        parts.scale = math::scale(&parts.scale, factors)?;
        Ok(())
    }

    /// Replace the scale.
    pub fn set_scale(&self, factors: &[f32]) -> Result<()> {
        self.parts.write().scale = math::scale(&math::identity(4), factors)?;
        Ok(())
    }

    /// Add to the translation.
    pub fn translate(&self, x: f32, y: f32, z: f32) {
        let mut parts = self.parts.write();
        parts.translation = math::add(parts.translation, [x, y, z]);
    }

    /// Replace the translation.
    pub fn set_translation(&self, x: f32, y: f32, z: f32) {
        self.parts.write().translation = [x, y, z];
    }

    pub fn translation(&self) -> Vector3 {
        self.parts.read().translation
    }
}

/// Normal matrix that tracks a model matrix uniform.
///
/// Holds no state of its own: every read recomputes the inverse-transpose of
/// the model's current upper-left 3x3.
#[derive(Debug, Clone)]
pub struct NormalMatrixUniform {
    uniform: SequenceUniform,
}

impl NormalMatrixUniform {
    /// 4x4 normal matrix (the 3x3 result embedded in an identity).
    pub fn new(name: impl Into<String>, model: impl AsRef<SequenceUniform>) -> Result<Self> {
        Self::with_dimension(name, model.as_ref(), 4)
    }

    /// 3x3 normal matrix, for shaders declaring `uniform mat3`.
    pub fn mat3(name: impl Into<String>, model: impl AsRef<SequenceUniform>) -> Result<Self> {
        Self::with_dimension(name, model.as_ref(), 3)
    }

    fn with_dimension(
        name: impl Into<String>,
        model: &SequenceUniform,
        dimension: usize,
    ) -> Result<Self> {
        if model.expect_matrix(4).is_err() {
            model.expect_matrix(3)?;
        }
        let uniform = SequenceUniform::with_source(
            Shape::Matrix(dimension),
            name,
            SequenceSource::Normal {
                model: model.clone(),
                dimension,
            },
        );
        Ok(Self { uniform })
    }

    pub fn uniform(&self) -> &SequenceUniform {
        &self.uniform
    }
}

/// Camera placement for a [`ViewMatrixUniform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParts {
    pub eye: Vector3,
    pub at: Vector3,
    pub up: Vector3,
}

impl ViewParts {
    pub fn matrix(&self) -> Matrix {
        math::look_at(self.eye, self.at, self.up)
    }
}

/// View matrix recomputed from eye/at/up on every read.
#[derive(Debug, Clone)]
pub struct ViewMatrixUniform {
    uniform: SequenceUniform,
    parts: Arc<RwLock<ViewParts>>,
}

fn check_finite(name: &str, v: &[f32]) -> Result<()> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(Error::NotANumber(name.to_string()))
    }
}

impl ViewMatrixUniform {
    pub fn new(name: impl Into<String>, eye: Vector3, at: Vector3, up: Vector3) -> Result<Self> {
        let name = name.into();
        for v in [&eye, &at, &up] {
            check_finite(&name, v)?;
        }
        let parts = Arc::new(RwLock::new(ViewParts { eye, at, up }));
        let uniform = SequenceUniform::with_source(
            Shape::Matrix(4),
            name,
            SequenceSource::View(Arc::clone(&parts)),
        );
        Ok(Self { uniform, parts })
    }

    pub fn uniform(&self) -> &SequenceUniform {
        &self.uniform
    }

    pub fn eye(&self) -> Vector3 {
        self.parts.read().eye
    }

    pub fn at(&self) -> Vector3 {
        self.parts.read().at
    }

    pub fn up(&self) -> Vector3 {
        self.parts.read().up
    }

    pub fn set_eye(&self, eye: Vector3) -> Result<()> {
        check_finite(self.uniform.name(), &eye)?;
        self.parts.write().eye = eye;
        Ok(())
    }

    pub fn set_at(&self, at: Vector3) -> Result<()> {
        check_finite(self.uniform.name(), &at)?;
        self.parts.write().at = at;
        Ok(())
    }

    pub fn set_up(&self, up: Vector3) -> Result<()> {
        check_finite(self.uniform.name(), &up)?;
        self.parts.write().up = up;
        Ok(())
    }
}

/// Projection parameters for a [`PerspectiveMatrixUniform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveParts {
    pub fovy: f32,
    pub aspect: f32,
    pub near: f32,
    /// `None` for an infinite far plane.
    pub far: Option<f32>,
}

impl PerspectiveParts {
    pub fn matrix(&self) -> Matrix {
        math::perspective(self.fovy, self.aspect, self.near, self.far)
    }
}

/// Perspective projection recomputed from its parameters on every read.
#[derive(Debug, Clone)]
pub struct PerspectiveMatrixUniform {
    uniform: SequenceUniform,
    parts: Arc<RwLock<PerspectiveParts>>,
}

impl PerspectiveMatrixUniform {
    pub fn new(
        name: impl Into<String>,
        fovy: f32,
        aspect: f32,
        near: f32,
        far: Option<f32>,
    ) -> Self {
        let parts = Arc::new(RwLock::new(PerspectiveParts {
            fovy,
            aspect,
            near,
            far,
        }));
        let uniform = SequenceUniform::with_source(
            Shape::Matrix(4),
            name,
            SequenceSource::Perspective(Arc::clone(&parts)),
        );
        Self { uniform, parts }
    }

    pub fn uniform(&self) -> &SequenceUniform {
        &self.uniform
    }

    pub fn params(&self) -> PerspectiveParts {
        *self.parts.read()
    }

    pub fn set_fovy(&self, fovy: f32) {
        self.parts.write().fovy = fovy;
    }

    pub fn set_aspect(&self, aspect: f32) {
        self.parts.write().aspect = aspect;
    }

    pub fn set_near(&self, near: f32) {
        self.parts.write().near = near;
    }

    pub fn set_far(&self, far: Option<f32>) {
        self.parts.write().far = far;
    }
}

macro_rules! impl_as_sequence {
    ($($ty:ty),*) => {
        $(
            impl AsRef<SequenceUniform> for $ty {
                fn as_ref(&self) -> &SequenceUniform {
                    &self.uniform
                }
            }
        )*
    };
}

impl_as_sequence!(
    ModelMatrixUniform,
    NormalMatrixUniform,
    ViewMatrixUniform,
    PerspectiveMatrixUniform
);

impl AsRef<SequenceUniform> for SequenceUniform {
    fn as_ref(&self) -> &SequenceUniform {
        self
    }
}

/// A transform layered over a matrix uniform's current source.
///
/// [`apply`](Self::apply) does not bake the result in: the uniform keeps
/// reading its previous source (a producer, a model, a view, ...) and the
/// transform is applied to whatever that yields on every read.
pub trait MatrixTransform: std::fmt::Debug + Send + Sync {
    /// The transformed copy of `m`.
    fn transform(&self, m: &Matrix) -> Result<Matrix>;

    fn apply<'a>(&self, uniform: &'a SequenceUniform) -> Result<&'a SequenceUniform>
    where
        Self: Clone + Sized + 'static,
    {
        let Shape::Matrix(dimension) = uniform.shape() else {
            return Err(Error::TypeMismatch {
                name: uniform.name().to_string(),
                expected: "matrix",
                actual: "vector",
            });
        };
        // Reject transforms that can never fit this dimension up front.
        self.transform(&math::identity(dimension))?;
        let base = uniform.source();
        uniform.replace_source(SequenceSource::Transformed {
            base: Box::new(base),
            dimension,
            transform: Arc::new(self.clone()),
        });
        Ok(uniform)
    }
}

/// Add a 3D translation to a 4x4 matrix uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translate(pub f32, pub f32, pub f32);

impl MatrixTransform for Translate {
    fn transform(&self, m: &Matrix) -> Result<Matrix> {
        Ok(math::translate(m, self.0, self.1, self.2)?)
    }
}

/// Scale a matrix uniform by one, three or four factors.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale(pub Vec<f32>);

impl Scale {
    pub fn uniform(factor: f32) -> Self {
        Self(vec![factor])
    }
}

impl MatrixTransform for Scale {
    fn transform(&self, m: &Matrix) -> Result<Matrix> {
        Ok(math::scale(m, &self.0)?)
    }
}

/// Rotate a matrix uniform by `theta` radians around an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotate {
    pub theta: f32,
    pub axis: Vector3,
}

impl Rotate {
    pub fn new(theta: f32, axis: Vector3) -> Self {
        Self { theta, axis }
    }
}

impl MatrixTransform for Rotate {
    fn transform(&self, m: &Matrix) -> Result<Matrix> {
        Ok(math::rotate(m, self.theta, self.axis)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_model_matrix_is_translate_rotate_scale() {
        let model = ModelMatrixUniform::new(
            "uModel",
            ModelOptions::new()
                .scale([2.0])
                .rotate(FRAC_PI_2, [0.0, 0.0, 1.0])
                .translate(1.0, 0.0, 0.0),
        )
        .unwrap();
        let m = model.uniform().matrix().unwrap();
        assert_close(
            &math::multiply_vector(&m, &[0.0, 0.0, 0.0, 1.0]).unwrap(),
            &[1.0, 0.0, 0.0, 1.0],
        );
        assert_close(
            &math::multiply_vector(&m, &[0.0, 1.0, 0.0, 1.0]).unwrap(),
            &[-1.0, 0.0, 0.0, 1.0],
        );
    }

    #[test]
    fn test_normal_matrix_follows_model() {
        let model = ModelMatrixUniform::new("uModel", ModelOptions::new().scale([1.0, 2.0, 4.0]))
            .unwrap();
        let normal = NormalMatrixUniform::new("uNormal", &model).unwrap();
        let before = normal.uniform().value().unwrap();
        assert_close(&before[..3], &[1.0, 0.0, 0.0]);
        assert_close(&before[4..7], &[0.0, 0.5, 0.0]);

        model.rotate(FRAC_PI_2, [0.0, 0.0, 1.0]).unwrap();
        let after = normal.uniform().matrix().unwrap();
        let expected =
            math::normal_matrix(&model.matrix(), 4).unwrap();
        assert_close(after.as_slice(), expected.as_slice());
        assert_ne!(before, after.into_vec());
    }

    #[test]
    fn test_normal_matrix_requires_matrix_model() {
        let v = SequenceUniform::vec4("uV");
        assert!(matches!(
            NormalMatrixUniform::new("uN", &v),
            Err(Error::TypeMismatch { .. })
        ));
        let m = SequenceUniform::identity("uM", 3).unwrap();
        assert_eq!(
            NormalMatrixUniform::mat3("uN", &m).unwrap().uniform().shape(),
            Shape::Matrix(3)
        );
    }

    #[test]
    fn test_view_matrix_setters() {
        let view = ViewMatrixUniform::new("uView", [0.0, 0.0, 5.0], [0.0; 3], [0.0, 1.0, 0.0])
            .unwrap();
        let before = view.uniform().value().unwrap();
        assert_eq!(before[14], -5.0);
        view.set_eye([0.0, 0.0, 3.0]).unwrap();
        assert_eq!(view.uniform().value().unwrap()[14], -3.0);
        assert!(matches!(
            view.set_at([f32::NAN, 0.0, 0.0]),
            Err(Error::NotANumber(_))
        ));
        assert_eq!(view.at(), [0.0; 3]);
    }

    #[test]
    fn test_perspective_infinite_far() {
        let p = PerspectiveMatrixUniform::new("uProj", 1.0, 1.5, 0.1, None);
        assert!(p.uniform().value().unwrap().iter().all(|v| v.is_finite()));
        p.set_far(Some(10.0));
        assert_eq!(p.params().far, Some(10.0));
    }

    #[test]
    fn test_transform_combinators() {
        let u = SequenceUniform::identity("uM", 4).unwrap();
        Scale::uniform(2.0).apply(&u).unwrap();
        Rotate::new(FRAC_PI_2, [0.0, 0.0, 1.0]).apply(&u).unwrap();
        Translate(1.0, 0.0, 0.0).apply(&u).unwrap();
        let m = u.matrix().unwrap();
        assert_close(
            &math::multiply_vector(&m, &[1.0, 0.0, 0.0, 1.0]).unwrap(),
            &[1.0, 2.0, 0.0, 1.0],
        );

        let m3 = SequenceUniform::identity("uM3", 3).unwrap();
        assert!(Translate(1.0, 0.0, 0.0).apply(&m3).is_err());
        assert!(Scale(vec![1.0, 2.0]).apply(&m3).is_err());
        // A rejected transform leaves the source alone.
        assert!(matches!(m3.source(), SequenceSource::Value(_)));
        assert!(Translate(0.0, 0.0, 0.0).apply(&SequenceUniform::vec4("uV")).is_err());
    }

    #[test]
    fn test_transform_tracks_model_parts() {
        let model = ModelMatrixUniform::new("uModel", ModelOptions::new()).unwrap();
        Translate(0.0, 0.0, -2.0)
            .apply(model.uniform())
            .unwrap();
        model.scale(&[3.0]).unwrap();
        let m = model.uniform().matrix().unwrap();
        let expected = math::translate(&model.matrix(), 0.0, 0.0, -2.0).unwrap();
        assert_close(m.as_slice(), expected.as_slice());
        assert_eq!(m.get(0, 0), 3.0);
    }
}
