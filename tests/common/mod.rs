//! Common utilities for renderer integration tests.
//!
//! Everything here runs against the recording [`DummyBackend`], so tests
//! inspect the GL command stream instead of pixels.

#![allow(dead_code)]

use declarative_gl::backend::{DummyBackend, GlCall};
use declarative_gl::constants::{PLANE_TEX_COORDS, PLANE_VERTICES};
use declarative_gl::{
    init_logging, Attribute, ImageSource, LoggingConfig, Renderer, Shader, ShaderOptions, Uniform,
};

pub const VERTEX_SOURCE: &str = "
attribute vec2 aPosition;
attribute vec2 aTexCoord;
varying vec2 vTexCoord;
void main() {
    vTexCoord = aTexCoord;
    gl_Position = vec4(aPosition, 0.0, 1.0);
}";

pub const FRAGMENT_SOURCE: &str = "
precision mediump float;
uniform sampler2D uState;
varying vec2 vTexCoord;
void main() {
    gl_FragColor = texture2D(uState, vTexCoord);
}";

/// Compare two float slices element-wise.
pub fn assert_close(actual: &[f32], expected: &[f32], epsilon: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= epsilon,
            "element {}: {} != {} (in {:?})",
            i,
            a,
            e,
            actual
        );
    }
}

/// Renderer over the dummy backend, with test logging installed.
pub fn renderer() -> Renderer<DummyBackend> {
    init_logging(LoggingConfig::for_tests());
    Renderer::default()
}

pub fn plane() -> Attribute {
    Attribute::vec2("aPosition", PLANE_VERTICES.to_vec()).unwrap()
}

pub fn plane_tex_coords() -> Attribute {
    Attribute::vec2("aTexCoord", PLANE_TEX_COORDS.to_vec()).unwrap()
}

/// Full-view plane shader with the given uniforms.
pub fn plane_shader<U: Into<Uniform>>(uniforms: impl IntoIterator<Item = U>) -> Shader {
    plane_shader_with(FRAGMENT_SOURCE, uniforms)
}

/// Full-view plane shader with its own fragment source, so it links a separate program.
pub fn plane_shader_with<U: Into<Uniform>>(
    fragment_source: &str,
    uniforms: impl IntoIterator<Item = U>,
) -> Shader {
    Shader::new(
        VERTEX_SOURCE,
        fragment_source,
        ShaderOptions::new()
            .attribute(plane())
            .attribute(plane_tex_coords())
            .uniforms(uniforms),
    )
    .unwrap()
}

/// 2x2 opaque image.
pub fn solid(color: [u8; 4]) -> ImageSource {
    ImageSource::from_rgba8(2, 2, color.repeat(4)).unwrap()
}

pub fn count_calls(calls: &[GlCall], pred: impl Fn(&GlCall) -> bool) -> usize {
    calls.iter().filter(|c| pred(c)).count()
}
