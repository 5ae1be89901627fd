//! Linear algebra over flat, column-major vectors and matrices.
//!
//! Matrices are stored the way the GL consumes them: element `(row, col)` of an
//! `n x n` matrix lives at index `col * n + row`. Every function here is pure.

use thiserror::Error;

/// Errors produced by the math module.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("cannot combine a {left}-dimensional operand with a {right}-dimensional operand")]
    DimensionMismatch { left: usize, right: usize },
    #[error("cannot invert a singular matrix")]
    SingularMatrix,
    #[error("cannot normalize a vector with no length")]
    ZeroLengthVector,
    #[error("cannot scale a {dimension}x{dimension} matrix with {count} arguments")]
    InvalidScaleArguments { dimension: usize, count: usize },
    #[error("unsupported matrix dimension {0}")]
    UnsupportedDimension(usize),
}

pub type MathResult<T> = Result<T, MathError>;

/// A 3-component vector.
pub type Vector3 = [f32; 3];

/// A 4-component vector.
pub type Vector4 = [f32; 4];

/// Tolerance used by [`look_at`] to detect a camera looking at itself.
pub const LOOK_AT_EPSILON: f32 = 1e-6;

/// Square matrix with column-major storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    dimension: usize,
    elements: Vec<f32>,
}

impl Matrix {
    /// All-zero matrix.
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            elements: vec![0.0; dimension * dimension],
        }
    }

    /// Build a matrix from column-major elements.
    pub fn from_column_major(dimension: usize, elements: &[f32]) -> MathResult<Self> {
        if !(1..=4).contains(&dimension) {
            return Err(MathError::UnsupportedDimension(dimension));
        }
        if elements.len() != dimension * dimension {
            return Err(MathError::DimensionMismatch {
                left: dimension * dimension,
                right: elements.len(),
            });
        }
        Ok(Self {
            dimension,
            elements: elements.to_vec(),
        })
    }

    /// Build a matrix, inferring the dimension from the element count (4, 9 or 16).
    pub fn from_slice(elements: &[f32]) -> MathResult<Self> {
        let dimension = match elements.len() {
            1 => 1,
            4 => 2,
            9 => 3,
            16 => 4,
            n => return Err(MathError::UnsupportedDimension(n)),
        };
        Self::from_column_major(dimension, elements)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.elements
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.elements
    }

    /// Element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.elements[col * self.dimension + row]
    }

    fn set(&mut self, row: usize, col: usize, value: f32) {
        self.elements[col * self.dimension + row] = value;
    }

    /// The top-left `dimension x dimension` block.
    pub fn upper_left(&self, dimension: usize) -> MathResult<Matrix> {
        if dimension > self.dimension || dimension == 0 {
            return Err(MathError::DimensionMismatch {
                left: self.dimension,
                right: dimension,
            });
        }
        let mut out = Matrix::zeros(dimension);
        for col in 0..dimension {
            for row in 0..dimension {
                out.set(row, col, self.get(row, col));
            }
        }
        Ok(out)
    }

    /// Place this matrix in the top-left corner of a larger identity matrix.
    pub fn embed(&self, dimension: usize) -> MathResult<Matrix> {
        if dimension < self.dimension {
            return Err(MathError::DimensionMismatch {
                left: self.dimension,
                right: dimension,
            });
        }
        let mut out = identity(dimension);
        for col in 0..self.dimension {
            for row in 0..self.dimension {
                out.set(row, col, self.get(row, col));
            }
        }
        Ok(out)
    }

    /// Convert to a glam matrix if this is a 4x4 matrix.
    pub fn to_mat4(&self) -> Option<glam::Mat4> {
        (self.dimension == 4).then(|| glam::Mat4::from_cols_slice(&self.elements))
    }
}

impl From<glam::Mat2> for Matrix {
    fn from(m: glam::Mat2) -> Self {
        Self {
            dimension: 2,
            elements: m.to_cols_array().to_vec(),
        }
    }
}

impl From<glam::Mat3> for Matrix {
    fn from(m: glam::Mat3) -> Self {
        Self {
            dimension: 3,
            elements: m.to_cols_array().to_vec(),
        }
    }
}

impl From<glam::Mat4> for Matrix {
    fn from(m: glam::Mat4) -> Self {
        Self {
            dimension: 4,
            elements: m.to_cols_array().to_vec(),
        }
    }
}

/// Returns true if `n` is a power of two.
pub fn is_power_of_two(n: u32) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Identity matrix of the given dimension.
pub fn identity(dimension: usize) -> Matrix {
    let mut m = Matrix::zeros(dimension);
    for i in 0..dimension {
        m.set(i, i, 1.0);
    }
    m
}

/// Matrix product `a * b`.
pub fn multiply(a: &Matrix, b: &Matrix) -> MathResult<Matrix> {
    if a.dimension != b.dimension {
        return Err(MathError::DimensionMismatch {
            left: a.dimension,
            right: b.dimension,
        });
    }
    Ok(mul(a, b))
}

// Callers guarantee equal dimensions.
pub(crate) fn mul(a: &Matrix, b: &Matrix) -> Matrix {
    debug_assert_eq!(a.dimension, b.dimension);
    let d = a.dimension;
    let mut out = Matrix::zeros(d);
    for col in 0..d {
        for row in 0..d {
            let mut sum = 0.0;
            for k in 0..d {
                sum += a.get(row, k) * b.get(k, col);
            }
            out.set(row, col, sum);
        }
    }
    out
}

/// Matrix-vector product `m * v`.
pub fn multiply_vector(m: &Matrix, v: &[f32]) -> MathResult<Vec<f32>> {
    if m.dimension != v.len() {
        return Err(MathError::DimensionMismatch {
            left: m.dimension,
            right: v.len(),
        });
    }
    let d = m.dimension;
    Ok((0..d)
        .map(|row| (0..d).map(|k| m.get(row, k) * v[k]).sum())
        .collect())
}

/// 4x4 translation matrix.
pub fn translation(x: f32, y: f32, z: f32) -> Matrix {
    let mut m = identity(4);
    m.elements[12] = x;
    m.elements[13] = y;
    m.elements[14] = z;
    m
}

/// Add a 3D translation to the translation column of a 4x4 matrix.
pub fn translate(m: &Matrix, x: f32, y: f32, z: f32) -> MathResult<Matrix> {
    if m.dimension != 4 {
        return Err(MathError::DimensionMismatch {
            left: m.dimension,
            right: 4,
        });
    }
    let mut out = m.clone();
    out.elements[12] += x;
    out.elements[13] += y;
    out.elements[14] += z;
    Ok(out)
}

/// Left-multiply `m` by a scale matrix.
///
/// One argument scales uniformly. For a 4x4 matrix, one or three arguments
/// leave the fourth diagonal element at 1; four arguments set it too.
pub fn scale(m: &Matrix, args: &[f32]) -> MathResult<Matrix> {
    let d = m.dimension;
    let spatial = d.min(3);
    let factors: Vec<f32> = match args.len() {
        1 => (0..d)
            .map(|i| if i < spatial { args[0] } else { 1.0 })
            .collect(),
        n if n == d => args.to_vec(),
        3 if d == 4 => vec![args[0], args[1], args[2], 1.0],
        count => {
            return Err(MathError::InvalidScaleArguments {
                dimension: d,
                count,
            })
        }
    };
    let mut s = identity(d);
    for (i, factor) in factors.into_iter().enumerate() {
        s.set(i, i, factor);
    }
    Ok(mul(&s, m))
}

fn quaternion_to_rotation(q: [f32; 4]) -> Matrix {
    let [w, x, y, z] = q;
    Matrix {
        dimension: 3,
        elements: vec![
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + z * w),
            2.0 * (x * z - y * w),
            2.0 * (x * y - z * w),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + x * w),
            2.0 * (x * z + y * w),
            2.0 * (y * z - x * w),
            1.0 - 2.0 * (x * x + y * y),
        ],
    }
}

/// Rotation matrix of `theta` radians around `axis`, with the given dimension.
pub fn rotation(dimension: usize, theta: f32, axis: Vector3) -> MathResult<Matrix> {
    match dimension {
        2 => {
            let (s, c) = theta.sin_cos();
            Ok(Matrix {
                dimension: 2,
                elements: vec![c, s, -s, c],
            })
        }
        3 | 4 => {
            let axis = normalize(axis)?;
            let (s, c) = (theta / 2.0).sin_cos();
            let r = quaternion_to_rotation([c, axis[0] * s, axis[1] * s, axis[2] * s]);
            r.embed(dimension)
        }
        d => Err(MathError::UnsupportedDimension(d)),
    }
}

/// Left-multiply `m` by a rotation of `theta` radians around `axis`.
///
/// 2x2 matrices get a plane rotation and the axis is ignored.
pub fn rotate(m: &Matrix, theta: f32, axis: Vector3) -> MathResult<Matrix> {
    let r = rotation(m.dimension, theta, axis)?;
    Ok(mul(&r, m))
}

pub fn add(a: Vector3, b: Vector3) -> Vector3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn subtract(a: Vector3, b: Vector3) -> Vector3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn dot(a: Vector3, b: Vector3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vector3, b: Vector3) -> Vector3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn normalize(v: Vector3) -> MathResult<Vector3> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return Err(MathError::ZeroLengthVector);
    }
    Ok([v[0] / len, v[1] / len, v[2] / len])
}

/// View matrix for a camera at `eye` looking at `at`, oriented by `up`.
///
/// Returns the identity when `eye` and `at` coincide.
pub fn look_at(eye: Vector3, at: Vector3, up: Vector3) -> Matrix {
    let z = subtract(eye, at);
    if z.iter().all(|c| c.abs() < LOOK_AT_EPSILON) {
        return identity(4);
    }
    let z = normalize(z).unwrap_or([0.0; 3]);
    let x = normalize(cross(up, z)).unwrap_or_else(|_| {
        log::warn!("look_at: up {:?} is parallel to the view direction", up);
        [0.0; 3]
    });
    let y = normalize(cross(z, x)).unwrap_or([0.0; 3]);

    Matrix {
        dimension: 4,
        elements: vec![
            x[0],
            y[0],
            z[0],
            0.0,
            x[1],
            y[1],
            z[1],
            0.0,
            x[2],
            y[2],
            z[2],
            0.0,
            -dot(x, eye),
            -dot(y, eye),
            -dot(z, eye),
            1.0,
        ],
    }
}

/// Perspective projection. `far = None` (or an infinite value) gives an
/// infinite far plane.
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: Option<f32>) -> Matrix {
    let f = 1.0 / (fovy / 2.0).tan();
    let (m22, m32) = match far {
        Some(far) if far.is_finite() => {
            let nf = 1.0 / (near - far);
            ((near + far) * nf, 2.0 * far * near * nf)
        }
        _ => (-1.0, -2.0 * near),
    };

    Matrix {
        dimension: 4,
        elements: vec![
            f / aspect, 0.0, 0.0, 0.0, //
            0.0, f, 0.0, 0.0, //
            0.0, 0.0, m22, -1.0, //
            0.0, 0.0, m32, 0.0,
        ],
    }
}

/// The minor obtained by deleting `row` and `col`.
pub fn cofactor(m: &Matrix, row: usize, col: usize) -> MathResult<Matrix> {
    if m.dimension == 0 {
        return Err(MathError::UnsupportedDimension(0));
    }
    if row >= m.dimension || col >= m.dimension {
        return Err(MathError::DimensionMismatch {
            left: m.dimension,
            right: row.max(col) + 1,
        });
    }
    Ok(minor(m, row, col))
}

// Callers guarantee a non-empty matrix and in-range indices.
fn minor(m: &Matrix, row: usize, col: usize) -> Matrix {
    let d = m.dimension;
    let mut out = Matrix::zeros(d - 1);
    let mut i = 0;
    for c in (0..d).filter(|&c| c != col) {
        for r in (0..d).filter(|&r| r != row) {
            out.elements[i] = m.get(r, c);
            i += 1;
        }
    }
    out
}

/// Determinant by cofactor expansion along the first column.
pub fn determinant(m: &Matrix) -> f32 {
    match m.dimension {
        0 => 1.0,
        1 => m.elements[0],
        2 => m.elements[0] * m.elements[3] - m.elements[2] * m.elements[1],
        d => (0..d)
            .filter(|&row| m.get(row, 0) != 0.0)
            .map(|row| {
                let sign = if row % 2 == 0 { 1.0 } else { -1.0 };
                sign * m.get(row, 0) * determinant(&minor(m, row, 0))
            })
            .sum(),
    }
}

/// Transpose of the cofactor matrix.
pub fn adjoint(m: &Matrix) -> Matrix {
    let d = m.dimension;
    if d == 1 {
        return identity(1);
    }
    let mut out = Matrix::zeros(d);
    for row in 0..d {
        for col in 0..d {
            let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
            out.set(col, row, sign * determinant(&minor(m, row, col)));
        }
    }
    out
}

/// Inverse via the adjoint. Fails when the determinant is exactly zero.
pub fn inverse(m: &Matrix) -> MathResult<Matrix> {
    let det = determinant(m);
    if det == 0.0 {
        return Err(MathError::SingularMatrix);
    }
    let mut out = adjoint(m);
    for e in &mut out.elements {
        *e /= det;
    }
    Ok(out)
}

pub fn transpose(m: &Matrix) -> Matrix {
    let d = m.dimension;
    let mut out = Matrix::zeros(d);
    for col in 0..d {
        for row in 0..d {
            out.set(col, row, m.get(row, col));
        }
    }
    out
}

/// Inverse-transpose of the upper-left 3x3 block of a 3x3 or 4x4 matrix,
/// returned with the requested dimension (3 or 4).
pub fn normal_matrix(m: &Matrix, dimension: usize) -> MathResult<Matrix> {
    if m.dimension < 3 {
        return Err(MathError::DimensionMismatch {
            left: m.dimension,
            right: 3,
        });
    }
    let linear = m.upper_left(3)?;
    let n = transpose(&inverse(&linear)?);
    match dimension {
        3 => Ok(n),
        4 => n.embed(4),
        d => Err(MathError::UnsupportedDimension(d)),
    }
}
