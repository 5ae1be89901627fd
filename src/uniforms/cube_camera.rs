//! Cube camera: render a scene into the six faces of a cube texture

use std::f32::consts::FRAC_PI_2;

use super::matrices::{PerspectiveMatrixUniform, PerspectiveParts};
use super::sequence::{SequenceSource, SequenceUniform};
use super::texture::{CubeTextureUniform, TextureId};
use super::{CubeFace, Value};
use crate::error::Result;
use crate::math::{self, Matrix, Vector3};

/// A cube texture whose content is the scene seen from a point.
///
/// The camera borrows another shader's view matrix: for each face it points
/// that view down the face's axis, runs the render callback, and puts the
/// original view back afterwards. When a model matrix is attached, the
/// camera position and its six axes move with the model.
#[derive(Debug, Clone)]
pub struct CubeCameraUniform {
    texture: CubeTextureUniform,
    position: Vector3,
    view: SequenceUniform,
    model: Option<SequenceUniform>,
    perspective: Option<PerspectiveMatrixUniform>,
}

impl CubeCameraUniform {
    /// `view` must be a 4x4 matrix uniform.
    pub fn new(
        name: impl Into<String>,
        position: Vector3,
        view: impl AsRef<SequenceUniform>,
    ) -> Result<Self> {
        let view = view.as_ref();
        view.expect_matrix(4)?;
        Ok(Self {
            texture: CubeTextureUniform::new(name),
            position,
            view: view.clone(),
            model: None,
            perspective: None,
        })
    }

    /// Attach the model matrix the camera rides on. Must be 4x4.
    pub fn with_model(mut self, model: impl AsRef<SequenceUniform>) -> Result<Self> {
        let model = model.as_ref();
        model.expect_matrix(4)?;
        self.model = Some(model.clone());
        Ok(self)
    }

    /// Attach the projection that is switched to a 90 degree square frustum while rendering.
    pub fn with_perspective(mut self, perspective: &PerspectiveMatrixUniform) -> Self {
        self.perspective = Some(perspective.clone());
        self
    }

    pub fn name(&self) -> &str {
        self.texture.name()
    }

    pub fn id(&self) -> TextureId {
        self.texture.id()
    }

    pub fn texture(&self) -> &CubeTextureUniform {
        &self.texture
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// View matrix looking at `face` from the camera's current position.
    pub fn face_view(&self, face: CubeFace) -> Result<Matrix> {
        let Some(model) = &self.model else {
            let eye = self.position;
            return Ok(math::look_at(eye, math::add(eye, face.direction()), face.up()));
        };
        let m = model.matrix()?;
        let p = self.position;
        let eye = math::multiply_vector(&m, &[p[0], p[1], p[2], 1.0])?;
        let eye = [eye[0], eye[1], eye[2]];
        let linear = m.upper_left(3)?;
        let dir = math::multiply_vector(&linear, &face.direction())?;
        let normal = math::normal_matrix(&m, 3)?;
        let up = math::multiply_vector(&normal, &face.up())?;
        Ok(math::look_at(
            eye,
            math::add(eye, [dir[0], dir[1], dir[2]]),
            [up[0], up[1], up[2]],
        ))
    }

    /// Run `per_face` once per cube face with the linked view pointed at that face.
    ///
    /// The view source and the perspective parameters are restored when this
    /// returns, including when `per_face` fails.
    pub fn render(&self, mut per_face: impl FnMut(CubeFace) -> Result<()>) -> Result<()> {
        let _restore = Restore {
            view: &self.view,
            source: Some(self.view.source()),
            perspective: self
                .perspective
                .as_ref()
                .map(|p| (p, p.params())),
        };
        if let Some(perspective) = &self.perspective {
            perspective.set_fovy(FRAC_PI_2);
            perspective.set_aspect(1.0);
        }
        for face in CubeFace::ALL {
            let view = self.face_view(face)?;
            self.view
                .replace_source(SequenceSource::Value(Value::Literal(view.into_vec())));
            log::trace!("Rendering cube camera {} face {}", self.name(), face);
            per_face(face)?;
        }
        Ok(())
    }
}

struct Restore<'a> {
    view: &'a SequenceUniform,
    source: Option<SequenceSource>,
    perspective: Option<(&'a PerspectiveMatrixUniform, PerspectiveParts)>,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            self.view.replace_source(source);
        }
        if let Some((uniform, params)) = self.perspective {
            uniform.set_fovy(params.fovy);
            uniform.set_aspect(params.aspect);
        }
    }
}
