//! Integration tests for drawing shaders to surfaces.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rstest::rstest;

use common::{
    count_calls, plane, plane_shader, plane_shader_with, renderer, solid, FRAGMENT_SOURCE,
    VERTEX_SOURCE,
};
use declarative_gl::backend::{
    BackendError, BufferKind, GlCall, PrimitiveMode, RecordedUniform, ShaderStage,
    TextureDimension,
};
use declarative_gl::constants::{CUBE_INDICES, CUBE_N_VERTICES, CUBE_NORMALS, CUBE_VERTICES};
use declarative_gl::{
    Attribute, Error, HeadlessSurface, ModelMatrixUniform, ModelOptions, NormalMatrixUniform,
    RenderTarget, ScalarUniform, SequenceUniform, Shader, ShaderOptions, Surface,
    Texture2DUniform, Uniform, Value, Viewport,
};

fn no_uniforms() -> Vec<Uniform> {
    Vec::new()
}

#[rstest]
#[case::vertex("aBroken", ShaderStage::Vertex)]
#[case::fragment("uBroken", ShaderStage::Fragment)]
fn test_compile_error_reports_stage_and_log(#[case] marker: &str, #[case] expected: ShaderStage) {
    let surface = HeadlessSurface::new(8, 8).with_compile_error(marker);
    let mut renderer = renderer();
    let vertex = format!("{}\nattribute vec2 {};", VERTEX_SOURCE, marker);
    let fragment = format!("{}\nuniform float {};", FRAGMENT_SOURCE, marker);
    let (vs, fs) = match expected {
        ShaderStage::Vertex => (vertex.as_str(), FRAGMENT_SOURCE),
        ShaderStage::Fragment => (VERTEX_SOURCE, fragment.as_str()),
    };
    let shader = Shader::new(vs, fs, ShaderOptions::new().attribute(plane())).unwrap();

    let err = shader.render(&mut renderer, &surface).unwrap_err();
    match err {
        Error::Backend(BackendError::ShaderCompilationFailed { stage, log }) => {
            assert_eq!(stage, expected);
            assert!(log.contains(marker));
        }
        other => panic!("unexpected error: {}", other),
    }
    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.programs_linked(), 0);
    // Nothing compiled is left behind.
    assert_eq!(backend.live_objects(), 0);
}

#[test]
fn test_programs_are_cached_per_source_pair() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let first = plane_shader(no_uniforms());
    let same_sources = plane_shader(no_uniforms());
    let other = plane_shader_with("void main() {}", no_uniforms());

    for shader in [&first, &same_sources, &first, &other] {
        shader.render(&mut renderer, &surface).unwrap();
    }
    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.programs_linked(), 2);
    assert_eq!(backend.draw_count(), 4);
}

#[test]
fn test_each_surface_gets_its_own_context() {
    let a = HeadlessSurface::new(8, 8);
    let b = HeadlessSurface::new(16, 4);
    let mut renderer = renderer();
    let shader = plane_shader(no_uniforms());

    shader.render(&mut renderer, &a).unwrap();
    shader.render(&mut renderer, &b).unwrap();
    assert_eq!(renderer.contexts().len(), 2);
    assert_ne!(renderer.context_id(a.id()), renderer.context_id(b.id()));
    assert!(renderer
        .backend(b.id())
        .unwrap()
        .calls()
        .contains(&GlCall::Viewport(Viewport::new(0, 0, 16, 4))));
    // Depth testing is switched on when a context is created.
    assert!(matches!(
        renderer.backend(a.id()).unwrap().calls().first(),
        Some(GlCall::EnableDepthTest(_))
    ));
}

#[test]
fn test_render_returns_target_for_chaining() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let texture = Texture2DUniform::new("uState");

    let target = plane_shader(no_uniforms())
        .render(&mut renderer, texture.clone())
        .unwrap();
    assert!(matches!(&target, RenderTarget::Uniform(Uniform::Texture2D(t)) if t.id() == texture.id()));

    let target = plane_shader([&texture]).render(&mut renderer, &surface).unwrap();
    assert!(matches!(target, RenderTarget::Surface(s) if s.id() == surface.id()));
}

#[test]
fn test_attribute_lengths_must_agree() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let shader = Shader::new(
        VERTEX_SOURCE,
        FRAGMENT_SOURCE,
        ShaderOptions::new()
            .attribute(plane())
            .attribute(Attribute::vec2("aTexCoord", vec![0.0; 10]).unwrap()),
    )
    .unwrap();
    assert!(matches!(
        shader.render(&mut renderer, &surface),
        Err(Error::AttributeLengthMismatch { expected: 4, actual: 5, .. })
    ));
}

#[test]
fn test_indexed_cube_draw() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let model = ModelMatrixUniform::new("uModel", ModelOptions::new().rotate(0.5, [1.0, 1.0, 0.0]))
        .unwrap();
    let normal = NormalMatrixUniform::mat3("uNormalMatrix", &model).unwrap();
    let shader = Shader::new(
        "attribute vec3 aPosition; attribute vec3 aNormal; void main() {}",
        "void main() {}",
        ShaderOptions::new()
            .attribute(Attribute::vec3("aPosition", CUBE_VERTICES.to_vec()).unwrap())
            .attribute(Attribute::vec3("aNormal", CUBE_NORMALS.to_vec()).unwrap())
            .uniform(&model)
            .uniform(&normal)
            .indices(CUBE_INDICES)
            .mode(PrimitiveMode::Triangles),
    )
    .unwrap();

    shader.render(&mut renderer, &surface).unwrap();
    shader.render(&mut renderer, &surface).unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    let calls = backend.calls();
    assert_eq!(
        count_calls(calls, |c| *c == GlCall::DrawElements(PrimitiveMode::Triangles, CUBE_N_VERTICES)),
        2
    );
    // Index and vertex data are uploaded once.
    assert_eq!(
        count_calls(calls, |c| matches!(c, GlCall::CreateBuffer { kind: BufferKind::Index, size: 72, .. })),
        1
    );
    assert_eq!(
        count_calls(calls, |c| matches!(c, GlCall::CreateBuffer { kind: BufferKind::Vertex, .. })),
        2
    );
    assert!(matches!(
        backend.last_uniform("uNormalMatrix"),
        Some(RecordedUniform::Matrix { dimension: 3, .. })
    ));
}

#[test]
fn test_matrix_attribute_spans_locations() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let instance = Attribute::mat3(
        "aInstance",
        vec![vec![1.0; 12], vec![2.0; 12], vec![3.0; 12]],
    )
    .unwrap();
    let shader = Shader::new(
        VERTEX_SOURCE,
        FRAGMENT_SOURCE,
        ShaderOptions::new().attribute(plane()).attribute(instance),
    )
    .unwrap();
    shader.render(&mut renderer, &surface).unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    let locations: Vec<u32> = backend
        .calls()
        .iter()
        .filter_map(|c| match c {
            GlCall::BindVertexAttribute { location, components: 3, .. } => Some(*location),
            _ => None,
        })
        .collect();
    assert_eq!(locations, vec![4, 5, 6]);
}

#[rstest]
#[case::cleared(true, 1)]
#[case::accumulated(false, 0)]
fn test_clear_option(#[case] clear: bool, #[case] expected: usize) {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let shader = Shader::new(
        VERTEX_SOURCE,
        FRAGMENT_SOURCE,
        ShaderOptions::new().attribute(plane()).clear(clear),
    )
    .unwrap();
    shader.render(&mut renderer, &surface).unwrap();
    let calls = renderer.backend(surface.id()).unwrap().calls();
    assert_eq!(count_calls(calls, |c| *c == GlCall::Clear), expected);
}

#[test]
fn test_uniforms_are_resolved_every_draw() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let frames = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&frames);
    let time = ScalarUniform::float(
        "uTime",
        Value::computed(move || counter.fetch_add(1, Ordering::Relaxed) as f64 * 0.5),
    );
    let color = SequenceUniform::vec3("uColor").with([1.0, 0.0, 0.0]).unwrap();
    let shader = plane_shader([Uniform::from(&time), Uniform::from(&color)]);

    shader.render(&mut renderer, &surface).unwrap();
    color.set([0.0, 1.0, 0.0]).unwrap();
    shader.render(&mut renderer, &surface).unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.last_uniform("uTime"), Some(&RecordedUniform::Float(0.5)));
    assert_eq!(
        backend.last_uniform("uColor"),
        Some(&RecordedUniform::Vector(vec![0.0, 1.0, 0.0]))
    );
}

#[test]
fn test_unset_uniform_fails_the_draw() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let shader = plane_shader([SequenceUniform::vec4("uTint")]);
    assert!(matches!(
        shader.render(&mut renderer, &surface),
        Err(Error::MissingValue(name)) if name == "uTint"
    ));
}

#[test]
fn test_unused_names_are_skipped() {
    let surface = HeadlessSurface::new(8, 8)
        .with_missing_name("aTexCoord")
        .with_missing_name("uTime");
    let mut renderer = renderer();
    let shader = plane_shader([ScalarUniform::float("uTime", 1.0)]);
    shader.render(&mut renderer, &surface).unwrap();

    let backend = renderer.backend(surface.id()).unwrap();
    assert_eq!(backend.draw_count(), 1);
    assert_eq!(backend.last_uniform("uTime"), None);
    assert_eq!(
        count_calls(backend.calls(), |c| matches!(c, GlCall::BindVertexAttribute { .. })),
        1
    );
}

#[rstest]
#[case::static_image(false, 1)]
#[case::streaming(true, 3)]
fn test_texture_uploads(#[case] streaming: bool, #[case] uploads: usize) {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let image = if streaming {
        solid([10, 20, 30, 255]).streaming()
    } else {
        solid([10, 20, 30, 255])
    };
    let texture = Texture2DUniform::with_source("uState", image);
    let shader = plane_shader([&texture]);
    for _ in 0..3 {
        shader.render(&mut renderer, &surface).unwrap();
    }

    let backend = renderer.backend(surface.id()).unwrap();
    let created = count_calls(backend.calls(), |c| {
        matches!(c, GlCall::CreateTexture(_, TextureDimension::D2))
    });
    assert_eq!(created, uploads);
    assert_eq!(backend.live_textures(), 1);
    // Only power-of-two, non-streaming images get mipmaps.
    let mipmapped = count_calls(backend.calls(), |c| matches!(c, GlCall::GenerateMipmap(_)));
    assert_eq!(mipmapped, if streaming { 0 } else { 1 });
}

#[test]
fn test_new_image_replaces_texture() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let texture = Texture2DUniform::with_source("uState", solid([255, 0, 0, 255]));
    let shader = plane_shader([&texture]);
    shader.render(&mut renderer, &surface).unwrap();
    let context = renderer.context_id(surface.id()).unwrap();
    let first = texture.handle(context).unwrap();

    texture.set(solid([0, 255, 0, 255]));
    shader.render(&mut renderer, &surface).unwrap();
    let second = texture.handle(context).unwrap();
    assert_ne!(first, second);
    assert_eq!(renderer.backend(surface.id()).unwrap().live_textures(), 1);
}

#[test]
fn test_destroy_surface_releases_everything() {
    let surface = HeadlessSurface::new(8, 8);
    let mut renderer = renderer();
    let texture = Texture2DUniform::with_source("uState", solid([255; 4]));
    let scene = Texture2DUniform::new("uScene");
    plane_shader_with("void main() {}", no_uniforms())
        .render(&mut renderer, scene.clone())
        .unwrap();
    plane_shader([&texture, &scene]).render(&mut renderer, &surface).unwrap();

    let context = renderer.context_id(surface.id()).unwrap();
    assert!(texture.handle(context).is_some() && scene.is_render_target(context));
    assert!(renderer.backend(surface.id()).unwrap().live_objects() > 0);

    assert!(renderer.destroy_surface(surface.id()));
    assert!(renderer.contexts().is_empty());
    assert!(texture.handle(context).is_none());
    assert!(!scene.is_render_target(context));
    assert!(!renderer.destroy_surface(surface.id()));

    // Drawing again starts from a fresh context.
    plane_shader([&texture]).render(&mut renderer, &surface).unwrap();
    let fresh = renderer.context_id(surface.id()).unwrap();
    assert_ne!(fresh, context);
    assert!(texture.handle(fresh).is_some());
}
