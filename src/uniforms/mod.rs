//! Uniforms
//!
//! Every uniform is a cheap handle over shared state, so the same uniform can
//! be listed by several shaders and mutated between frames. Values are
//! resolved on every send; producers passed as [`Value::Computed`] are called
//! fresh each time.

mod cube;
mod cube_camera;
mod matrices;
mod scalar;
mod sequence;
mod texture;
mod value;

pub use cube::{Cube, CubeFace};
pub use cube_camera::CubeCameraUniform;
pub use matrices::{
    MatrixTransform, ModelMatrixUniform, ModelOptions, ModelParts, NormalMatrixUniform,
    PerspectiveMatrixUniform, PerspectiveParts, Rotate, Scale, Translate, ViewMatrixUniform,
    ViewParts,
};
pub use scalar::{ScalarKind, ScalarUniform};
pub use sequence::{SequenceSource, SequenceUniform, Shape};
pub use texture::{
    CubeTextureUniform, ImageSource, Texture2DUniform, TextureData, TextureId, TextureUniform,
};
pub use value::Value;

use crate::backend::{GlBackend, ProgramHandle, TextureHandle};
use crate::context::ContextId;
use crate::error::{Error, Result};
use crate::gl::TextureUnits;

/// Any uniform a shader can be given.
#[derive(Debug, Clone)]
pub enum Uniform {
    Scalar(ScalarUniform),
    /// A vector or matrix; which one is carried by its [`Shape`].
    Sequence(SequenceUniform),
    Texture2D(Texture2DUniform),
    CubeTexture(CubeTextureUniform),
    CubeCamera(CubeCameraUniform),
}

/// Data for [`Uniform::set`].
#[derive(Debug, Clone)]
pub enum UniformData {
    Scalar(Value<f64>),
    Sequence(Value<Vec<f32>>),
    Image(Value<ImageSource>),
    Cube(Value<Cube<ImageSource>>),
}

impl UniformData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            UniformData::Scalar(_) => "scalar",
            UniformData::Sequence(_) => "sequence",
            UniformData::Image(_) => "texture2d",
            UniformData::Cube(_) => "cube texture",
        }
    }
}

impl Uniform {
    pub fn name(&self) -> &str {
        match self {
            Uniform::Scalar(u) => u.name(),
            Uniform::Sequence(u) => u.name(),
            Uniform::Texture2D(u) => u.name(),
            Uniform::CubeTexture(u) => u.name(),
            Uniform::CubeCamera(u) => u.name(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Uniform::Scalar(u) => u.kind().name(),
            Uniform::Sequence(u) => u.shape().kind_name(),
            Uniform::Texture2D(_) => "texture2d",
            Uniform::CubeTexture(_) => "cube texture",
            Uniform::CubeCamera(_) => "cube camera",
        }
    }

    /// Identity of the texture behind a texture uniform.
    pub fn texture_id(&self) -> Option<TextureId> {
        match self {
            Uniform::Texture2D(u) => Some(u.id()),
            Uniform::CubeTexture(u) => Some(u.id()),
            Uniform::CubeCamera(u) => Some(u.id()),
            _ => None,
        }
    }

    /// GPU texture a texture uniform holds in a context.
    pub fn texture_handle(&self, context: ContextId) -> Option<TextureHandle> {
        match self {
            Uniform::Texture2D(u) => u.handle(context),
            Uniform::CubeTexture(u) => u.handle(context),
            Uniform::CubeCamera(u) => u.texture().handle(context),
            _ => None,
        }
    }

    /// Replace the uniform's data, checking that it fits the uniform's kind.
    pub fn set(&self, data: UniformData) -> Result<()> {
        match (self, data) {
            (Uniform::CubeCamera(u), _) => {
                Err(Error::CubeCameraIsShaderProduced(u.name().to_string()))
            }
            (Uniform::Scalar(u), UniformData::Scalar(v)) => {
                u.set(v);
                Ok(())
            }
            (Uniform::Sequence(u), UniformData::Sequence(v)) => u.set(v),
            (Uniform::Texture2D(u), UniformData::Image(v)) => {
                u.set(v);
                Ok(())
            }
            (Uniform::CubeTexture(u), UniformData::Cube(v)) => {
                u.set(v);
                Ok(())
            }
            (uniform, data) => Err(Error::TypeMismatch {
                name: uniform.name().to_string(),
                expected: uniform.kind_name(),
                actual: data.kind_name(),
            }),
        }
    }

    /// Texture preparation; a no-op for non-texture uniforms.
    pub(crate) fn prepare<B: GlBackend>(
        &self,
        backend: &mut B,
        context: ContextId,
        program: ProgramHandle,
        units: &mut TextureUnits,
    ) -> Result<()> {
        match self {
            Uniform::Texture2D(u) => u.prepare(backend, context, program, units).map(|_| ()),
            Uniform::CubeTexture(u) => u.prepare(backend, context, program, units).map(|_| ()),
            Uniform::CubeCamera(u) => u
                .texture()
                .prepare(backend, context, program, units)
                .map(|_| ()),
            _ => Ok(()),
        }
    }

    pub(crate) fn send<B: GlBackend>(
        &self,
        backend: &mut B,
        context: ContextId,
        program: ProgramHandle,
    ) -> Result<()> {
        match self {
            Uniform::Scalar(u) => u.send(backend, program),
            Uniform::Sequence(u) => u.send(backend, program),
            Uniform::Texture2D(u) => u.send(backend, context, program),
            Uniform::CubeTexture(u) => u.send(backend, context, program),
            Uniform::CubeCamera(u) => u.texture().send(backend, context, program),
        }
    }

    /// Release texture state held for a context.
    pub(crate) fn release<B: GlBackend>(&self, backend: &mut B, context: ContextId) {
        match self {
            Uniform::Texture2D(u) => u.release(backend, context),
            Uniform::CubeTexture(u) => u.release(backend, context),
            Uniform::CubeCamera(u) => u.texture().release(backend, context),
            _ => {}
        }
    }
}

impl From<ScalarUniform> for Uniform {
    fn from(u: ScalarUniform) -> Self {
        Uniform::Scalar(u)
    }
}

impl From<SequenceUniform> for Uniform {
    fn from(u: SequenceUniform) -> Self {
        Uniform::Sequence(u)
    }
}

impl From<&SequenceUniform> for Uniform {
    fn from(u: &SequenceUniform) -> Self {
        u.clone().into()
    }
}

macro_rules! impl_matrix_uniform {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Uniform {
                fn from(u: $ty) -> Self {
                    Uniform::Sequence(u.uniform().clone())
                }
            }

            impl From<&$ty> for Uniform {
                fn from(u: &$ty) -> Self {
                    Uniform::Sequence(u.uniform().clone())
                }
            }
        )*
    };
}

impl_matrix_uniform!(
    ModelMatrixUniform,
    NormalMatrixUniform,
    ViewMatrixUniform,
    PerspectiveMatrixUniform
);

impl From<Texture2DUniform> for Uniform {
    fn from(u: Texture2DUniform) -> Self {
        Uniform::Texture2D(u)
    }
}

impl From<CubeTextureUniform> for Uniform {
    fn from(u: CubeTextureUniform) -> Self {
        Uniform::CubeTexture(u)
    }
}

impl From<CubeCameraUniform> for Uniform {
    fn from(u: CubeCameraUniform) -> Self {
        Uniform::CubeCamera(u)
    }
}

impl From<&ScalarUniform> for Uniform {
    fn from(u: &ScalarUniform) -> Self {
        Uniform::Scalar(u.clone())
    }
}

impl From<&Texture2DUniform> for Uniform {
    fn from(u: &Texture2DUniform) -> Self {
        Uniform::Texture2D(u.clone())
    }
}

impl From<&CubeTextureUniform> for Uniform {
    fn from(u: &CubeTextureUniform) -> Self {
        Uniform::CubeTexture(u.clone())
    }
}

impl From<&CubeCameraUniform> for Uniform {
    fn from(u: &CubeCameraUniform) -> Self {
        Uniform::CubeCamera(u.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_uniform_kind_follows_shape() {
        assert_eq!(Uniform::from(SequenceUniform::vec3("uColor")).kind_name(), "vector");
        assert_eq!(Uniform::from(SequenceUniform::mat3("uM")).kind_name(), "matrix");
        let model = ModelMatrixUniform::new("uModel", ModelOptions::new()).unwrap();
        assert!(matches!(
            Uniform::from(&model),
            Uniform::Sequence(u) if u.shape() == Shape::Matrix(4)
        ));
    }

    #[test]
    fn test_set_checks_kind() {
        let color: Uniform = SequenceUniform::vec3("uColor").into();
        color
            .set(UniformData::Sequence(vec![1.0_f32, 0.0, 0.0].into()))
            .unwrap();
        assert!(matches!(
            color.set(UniformData::Scalar(1.0_f64.into())),
            Err(Error::TypeMismatch {
                expected: "vector",
                actual: "scalar",
                ..
            })
        ));

        let tex: Uniform = Texture2DUniform::new("uTex").into();
        tex.set(UniformData::Image(ImageSource::solid_color([0, 0, 0, 255]).into()))
            .unwrap();
    }

    #[test]
    fn test_cube_camera_cannot_be_set() {
        let view = SequenceUniform::identity("uView", 4).unwrap();
        let camera: Uniform = CubeCameraUniform::new("uEnv", [0.0; 3], &view)
            .unwrap()
            .into();
        let faces = Cube::from_fn(|_| ImageSource::solid_color([0; 4]));
        assert!(matches!(
            camera.set(UniformData::Cube(faces.into())),
            Err(Error::CubeCameraIsShaderProduced(_))
        ));
        assert!(camera.texture_id().is_some());
        assert_eq!(camera.kind_name(), "cube camera");
    }
}
