//! Geometry constants
//!
//! Plane coordinates cover the whole viewport. Vertex order is upper left,
//! upper right, lower left, lower right, which draws as a
//! [`PrimitiveMode::TriangleStrip`](crate::backend::PrimitiveMode::TriangleStrip).

/// Full-view plane positions, two floats per vertex.
pub const PLANE_VERTICES: [f32; 8] = [-1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0];

/// Texture coordinates matching [`PLANE_VERTICES`].
pub const PLANE_TEX_COORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

pub const PLANE_N_VERTICES: u32 = 4;

/// Full-view plane as two separate triangles, for `Triangles` mode.
pub const PLANE_TRIANGLE_VERTICES: [f32; 12] = [
    -1.0, 1.0, 1.0, 1.0, -1.0, -1.0, //
    -1.0, -1.0, 1.0, 1.0, 1.0, -1.0,
];

pub const PLANE_TRIANGLE_TEX_COORDS: [f32; 12] = [
    0.0, 0.0, 1.0, 0.0, 0.0, 1.0, //
    0.0, 1.0, 1.0, 0.0, 1.0, 1.0,
];

pub const PLANE_TRIANGLE_N_VERTICES: u32 = 6;

/// Unit cube centered at the origin, four vertices per face (+X, -X, +Y, -Y, +Z, -Z).
#[rustfmt::skip]
pub const CUBE_VERTICES: [f32; 72] = [
    // +X
    1.0, -1.0, -1.0,   1.0, 1.0, -1.0,   1.0, 1.0, 1.0,   1.0, -1.0, 1.0,
    // -X
    -1.0, -1.0, 1.0,   -1.0, 1.0, 1.0,   -1.0, 1.0, -1.0,   -1.0, -1.0, -1.0,
    // +Y
    -1.0, 1.0, -1.0,   -1.0, 1.0, 1.0,   1.0, 1.0, 1.0,   1.0, 1.0, -1.0,
    // -Y
    -1.0, -1.0, 1.0,   -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,   1.0, -1.0, 1.0,
    // +Z
    -1.0, -1.0, 1.0,   1.0, -1.0, 1.0,   1.0, 1.0, 1.0,   -1.0, 1.0, 1.0,
    // -Z
    1.0, -1.0, -1.0,   -1.0, -1.0, -1.0,   -1.0, 1.0, -1.0,   1.0, 1.0, -1.0,
];

#[rustfmt::skip]
pub const CUBE_NORMALS: [f32; 72] = [
    1.0, 0.0, 0.0,   1.0, 0.0, 0.0,   1.0, 0.0, 0.0,   1.0, 0.0, 0.0,
    -1.0, 0.0, 0.0,   -1.0, 0.0, 0.0,   -1.0, 0.0, 0.0,   -1.0, 0.0, 0.0,
    0.0, 1.0, 0.0,   0.0, 1.0, 0.0,   0.0, 1.0, 0.0,   0.0, 1.0, 0.0,
    0.0, -1.0, 0.0,   0.0, -1.0, 0.0,   0.0, -1.0, 0.0,   0.0, -1.0, 0.0,
    0.0, 0.0, 1.0,   0.0, 0.0, 1.0,   0.0, 0.0, 1.0,   0.0, 0.0, 1.0,
    0.0, 0.0, -1.0,   0.0, 0.0, -1.0,   0.0, 0.0, -1.0,   0.0, 0.0, -1.0,
];

#[rustfmt::skip]
pub const CUBE_TEX_COORDS: [f32; 48] = [
    0.0, 1.0,   0.0, 0.0,   1.0, 0.0,   1.0, 1.0,
    0.0, 1.0,   0.0, 0.0,   1.0, 0.0,   1.0, 1.0,
    0.0, 1.0,   0.0, 0.0,   1.0, 0.0,   1.0, 1.0,
    0.0, 1.0,   0.0, 0.0,   1.0, 0.0,   1.0, 1.0,
    0.0, 1.0,   0.0, 0.0,   1.0, 0.0,   1.0, 1.0,
    0.0, 1.0,   0.0, 0.0,   1.0, 0.0,   1.0, 1.0,
];

/// Two counter-clockwise triangles per face, for indexed `Triangles` drawing.
#[rustfmt::skip]
pub const CUBE_INDICES: [u16; 36] = [
    0, 1, 2,   0, 2, 3,
    4, 5, 6,   4, 6, 7,
    8, 9, 10,   8, 10, 11,
    12, 13, 14,   12, 14, 15,
    16, 17, 18,   16, 18, 19,
    20, 21, 22,   20, 22, 23,
];

pub const CUBE_N_VERTICES: u32 = 36;
