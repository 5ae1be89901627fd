//! Integration tests for lazy render-to-texture.
//!
//! Drawing into a texture uniform is deferred until a later draw samples the
//! texture; these tests follow the resulting GL command stream.

mod common;

use std::f32::consts::FRAC_PI_4;

use rstest::rstest;

use common::{count_calls, plane_shader, plane_shader_with, renderer, solid};
use declarative_gl::backend::{GlCall, RecordedUniform, TexImageTarget, TextureDimension};
use declarative_gl::uniforms::CubeFace;
use declarative_gl::{
    CubeCameraUniform, CubeTextureUniform, Error, HeadlessSurface, PerspectiveMatrixUniform,
    Surface, Texture2DUniform, Uniform, ViewMatrixUniform,
};

const SCENE_FRAGMENT: &str = "
precision mediump float;
uniform mat4 uView;
uniform mat4 uProjection;
void main() { gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0); }";

const ENV_FRAGMENT: &str = "
precision mediump float;
uniform samplerCube uEnv;
void main() { gl_FragColor = textureCube(uEnv, vec3(0.0, 0.0, 1.0)); }";

fn no_uniforms() -> Vec<Uniform> {
    Vec::new()
}

#[test]
fn test_unsampled_render_never_runs() {
    let surface = HeadlessSurface::new(32, 32);
    let mut renderer = renderer();
    let texture = Texture2DUniform::new("uState");

    plane_shader(no_uniforms())
        .render(&mut renderer, texture.clone())
        .unwrap();
    plane_shader_with("void main() {}", no_uniforms())
        .render(&mut renderer, &surface)
        .unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.draw_count(), 1);
    assert_eq!(
        count_calls(backend.calls(), |c| matches!(c, GlCall::BindFramebuffer(Some(_)))),
        0
    );
    assert!(renderer.pending().is_pending(texture.id()));
}

#[test]
fn test_sampled_render_runs_first_and_once() {
    let surface = HeadlessSurface::new(32, 16);
    let mut renderer = renderer();
    let scene = Texture2DUniform::new("uState");

    plane_shader_with("void main() { gl_FragColor = vec4(1.0); }", no_uniforms())
        .render(&mut renderer, scene.clone())
        .unwrap();
    let display = plane_shader([&scene]);
    display.render(&mut renderer, &surface).unwrap();

    let context = renderer.context_id(surface.id()).unwrap();
    let backend = renderer.backend(surface.id()).unwrap();
    let calls = backend.calls();
    assert_eq!(backend.draw_count(), 2);
    assert!(renderer.pending().is_empty());
    assert!(scene.is_render_target(context));

    // Off-screen draw happens first, into a buffer sized like the surface.
    let offscreen = calls
        .iter()
        .position(|c| matches!(c, GlCall::BindFramebuffer(Some(_))))
        .unwrap();
    let onscreen = calls
        .iter()
        .position(|c| matches!(c, GlCall::BindFramebuffer(None)))
        .unwrap();
    assert!(offscreen < onscreen);
    assert!(calls.iter().any(|c| matches!(
        c,
        GlCall::TexImage {
            target: TexImageTarget::D2,
            width: 32,
            height: 16,
            has_pixels: false,
            ..
        }
    )));
    assert!(matches!(
        backend.last_uniform("uState"),
        Some(RecordedUniform::Sampler(0))
    ));

    // The queue was consumed: the next frame only redraws the display.
    display.render(&mut renderer, &surface).unwrap();
    assert_eq!(renderer.backend(surface.id()).unwrap().draw_count(), 3);
}

#[test]
fn test_nested_renders_run_innermost_first() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let inner = Texture2DUniform::new("uInner");
    let outer = Texture2DUniform::new("uOuter");

    plane_shader_with("void main() { gl_FragColor = vec4(0.5); }", no_uniforms())
        .render(&mut renderer, inner.clone())
        .unwrap();
    plane_shader_with("uniform sampler2D uInner; void main() {}", [&inner])
        .render(&mut renderer, outer.clone())
        .unwrap();
    assert_eq!(renderer.pending().len(), 2);

    plane_shader_with("uniform sampler2D uOuter; void main() {}", [&outer])
        .render(&mut renderer, &surface)
        .unwrap();

    let context = renderer.context_id(surface.id()).unwrap();
    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.draw_count(), 3);
    assert!(renderer.pending().is_empty());
    assert!(inner.is_render_target(context) && outer.is_render_target(context));
    assert_eq!(backend.programs_linked(), 3);
}

#[test]
fn test_sampling_own_target_is_a_cycle() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let state = Texture2DUniform::new("uState");

    plane_shader([&state])
        .render(&mut renderer, state.clone())
        .unwrap();
    let result = plane_shader_with("uniform sampler2D uState; void main() {}", [&state])
        .render(&mut renderer, &surface);
    assert!(matches!(result, Err(Error::TextureCycle(name)) if name == "uState"));
}

#[test]
fn test_ping_pong_across_frames() {
    let surface = HeadlessSurface::new(16, 16);
    let mut renderer = renderer();
    // Both buffers are bound under the same sampler name.
    let front = Texture2DUniform::with_source("uState", solid([255, 255, 255, 255]));
    let back = Texture2DUniform::new("uState");

    let step_into_back = plane_shader([&front]);
    let step_into_front = plane_shader([&back]);
    let show_back = plane_shader([&back]);
    let show_front = plane_shader([&front]);

    for frame in 0..4 {
        if frame % 2 == 0 {
            step_into_back.render(&mut renderer, back.clone()).unwrap();
            show_back.render(&mut renderer, &surface).unwrap();
        } else {
            step_into_front.render(&mut renderer, front.clone()).unwrap();
            show_front.render(&mut renderer, &surface).unwrap();
        }
    }

    let context = renderer.context_id(surface.id()).unwrap();
    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.draw_count(), 8);
    assert_eq!(backend.programs_linked(), 1);
    assert!(front.is_render_target(context) && back.is_render_target(context));
    // The uploaded image was replaced by a render target.
    assert_eq!(backend.live_textures(), 2);
    assert!(renderer.pending().is_empty());
}

#[rstest]
#[case::plane_size(None, 16)]
#[case::own_viewport(Some(64), 64)]
fn test_cube_target_draws_every_face(#[case] viewport: Option<u32>, #[case] size: u32) {
    use declarative_gl::backend::Viewport;
    use declarative_gl::{Shader, ShaderOptions};

    let surface = HeadlessSurface::new(16, 16);
    let mut renderer = renderer();
    let cube = CubeTextureUniform::new("uEnv");

    let mut options = ShaderOptions::new()
        .attribute(common::plane())
        .attribute(common::plane_tex_coords());
    if let Some(side) = viewport {
        options = options.viewport(Viewport::new(0, 0, side, side));
    }
    Shader::new(common::VERTEX_SOURCE, SCENE_FRAGMENT, options)
        .unwrap()
        .render(&mut renderer, cube.clone())
        .unwrap();
    plane_shader_with(ENV_FRAGMENT, [&cube])
        .render(&mut renderer, &surface)
        .unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    let calls = backend.calls();
    assert_eq!(backend.draw_count(), 7);
    for face in CubeFace::ALL {
        assert!(calls.iter().any(|c| matches!(
            c,
            GlCall::AttachColorTexture { target: TexImageTarget::CubeFace(f), .. } if *f == face
        )));
    }
    assert!(calls.iter().any(|c| matches!(
        c,
        GlCall::TexImage { target: TexImageTarget::CubeFace(CubeFace::PosX), width, height, .. }
            if *width == size && *height == size
    )));
    assert_eq!(
        count_calls(calls, |c| matches!(c, GlCall::CreateTexture(_, TextureDimension::Cube))),
        1
    );
}

#[rstest]
#[case::wide_surface((48, 20), None, 20)]
#[case::tall_surface((12, 30), None, 12)]
#[case::wide_viewport((64, 64), Some((40, 24)), 24)]
fn test_cube_faces_are_square(
    #[case] surface_size: (u32, u32),
    #[case] viewport: Option<(u32, u32)>,
    #[case] side: u32,
) {
    use declarative_gl::backend::Viewport;
    use declarative_gl::{Shader, ShaderOptions};

    let surface = HeadlessSurface::new(surface_size.0, surface_size.1);
    let mut renderer = renderer();
    let view = ViewMatrixUniform::new("uView", [0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]).unwrap();
    let projection = PerspectiveMatrixUniform::new("uProjection", FRAC_PI_4, 2.0, 0.1, None);
    let camera = CubeCameraUniform::new("uEnv", [0.0; 3], &view)
        .unwrap()
        .with_perspective(&projection);

    let mut options = ShaderOptions::new()
        .attribute(common::plane())
        .attribute(common::plane_tex_coords())
        .uniform(&view)
        .uniform(&projection);
    if let Some((w, h)) = viewport {
        options = options.viewport(Viewport::new(0, 0, w, h));
    }
    Shader::new(common::VERTEX_SOURCE, SCENE_FRAGMENT, options)
        .unwrap()
        .render(&mut renderer, camera.clone())
        .unwrap();
    plane_shader_with(ENV_FRAGMENT, [&camera])
        .render(&mut renderer, &surface)
        .unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    let calls = backend.calls();
    let faces: Vec<(u32, u32)> = calls
        .iter()
        .filter_map(|c| match c {
            GlCall::TexImage {
                target: TexImageTarget::CubeFace(_),
                width,
                height,
                ..
            } => Some((*width, *height)),
            _ => None,
        })
        .collect();
    assert_eq!(faces, vec![(side, side); 6]);
    // Each face is drawn with a square viewport matching the storage.
    assert_eq!(
        count_calls(calls, |c| *c == GlCall::Viewport(Viewport::new(0, 0, side, side))),
        6
    );
}

#[test]
fn test_cube_camera_renders_scene_per_face() {
    let surface = HeadlessSurface::new(32, 32);
    let mut renderer = renderer();
    let view = ViewMatrixUniform::new("uView", [0.0, 0.0, 5.0], [0.0; 3], [0.0, 1.0, 0.0]).unwrap();
    let projection = PerspectiveMatrixUniform::new("uProjection", FRAC_PI_4, 2.0, 0.1, None);
    let camera = CubeCameraUniform::new("uEnv", [0.0, 1.0, 0.0], &view)
        .unwrap()
        .with_perspective(&projection);
    let original = view.uniform().source();

    plane_shader_with(SCENE_FRAGMENT, [Uniform::from(&view), Uniform::from(&projection)])
        .render(&mut renderer, camera.clone())
        .unwrap();
    plane_shader_with(ENV_FRAGMENT, [&camera])
        .render(&mut renderer, &surface)
        .unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.draw_count(), 7);

    let views: Vec<&Vec<f32>> = backend
        .calls()
        .iter()
        .filter_map(|c| match c {
            GlCall::SetUniform {
                name,
                value: RecordedUniform::Matrix { data, .. },
                ..
            } if name == "uView" => Some(data),
            _ => None,
        })
        .collect();
    assert_eq!(views.len(), 6);
    for (face, data) in CubeFace::ALL.into_iter().zip(&views) {
        assert_eq!(**data, camera.face_view(face).unwrap().into_vec());
    }

    // The scene's own camera is back in place.
    assert!(view.uniform().source().same_as(&original));
    assert_eq!(projection.params().fovy, FRAC_PI_4);
    assert_eq!(projection.params().aspect, 2.0);
}

#[test]
fn test_cube_camera_restores_view_on_failure() {
    let view = ViewMatrixUniform::new("uView", [0.0, 0.0, 5.0], [0.0; 3], [0.0, 1.0, 0.0]).unwrap();
    let camera = CubeCameraUniform::new("uEnv", [0.0; 3], &view).unwrap();
    let original = view.uniform().source();

    let mut faces = Vec::new();
    camera
        .render(|face| {
            faces.push(face);
            Ok(())
        })
        .unwrap();
    assert_eq!(faces, CubeFace::ALL.to_vec());
    assert!(view.uniform().source().same_as(&original));

    let failed = camera.render(|face| match face {
        CubeFace::PosY => Err(Error::MissingValue("uView".into())),
        _ => Ok(()),
    });
    assert!(failed.is_err());
    assert!(view.uniform().source().same_as(&original));
}

#[test]
fn test_texture_units_run_out() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let textures: Vec<Texture2DUniform> = (0..33)
        .map(|i| Texture2DUniform::with_source(format!("uTex{}", i), solid([0, 0, 0, 255])))
        .collect();

    let result = plane_shader(&textures).render(&mut renderer, &surface);
    assert!(matches!(
        result,
        Err(Error::TextureUnitsExhausted { name, max: 32 }) if name == "uTex32"
    ));
    assert_eq!(renderer.backend(surface.id()).unwrap().draw_count(), 0);

    // 32 fit.
    plane_shader_with("void main() {}", &textures[..32])
        .render(&mut renderer, &surface)
        .unwrap();
}
