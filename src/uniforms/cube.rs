use std::collections::HashMap;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::{Error, Result};

/// One face of a cube texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CubeFace {
    /// All faces in GL order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CubeFace::PosX => "posx",
            CubeFace::NegX => "negx",
            CubeFace::PosY => "posy",
            CubeFace::NegY => "negy",
            CubeFace::PosZ => "posz",
            CubeFace::NegZ => "negz",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Direction a camera looks in to see this face.
    pub fn direction(self) -> [f32; 3] {
        match self {
            CubeFace::PosX => [1.0, 0.0, 0.0],
            CubeFace::NegX => [-1.0, 0.0, 0.0],
            CubeFace::PosY => [0.0, 1.0, 0.0],
            CubeFace::NegY => [0.0, -1.0, 0.0],
            CubeFace::PosZ => [0.0, 0.0, 1.0],
            CubeFace::NegZ => [0.0, 0.0, -1.0],
        }
    }

    /// Up vector of this face in the GL cube-map convention.
    pub fn up(self) -> [f32; 3] {
        match self {
            CubeFace::PosY => [0.0, 0.0, 1.0],
            CubeFace::NegY => [0.0, 0.0, -1.0],
            _ => [0.0, -1.0, 0.0],
        }
    }
}

impl std::fmt::Display for CubeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CubeFace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CubeFace::ALL
            .into_iter()
            .find(|face| face.name() == s)
            .ok_or_else(|| Error::UnknownCubeFace(s.to_string()))
    }
}

/// One value per cube face.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube<T> {
    // Always six entries, in `CubeFace::ALL` order.
    faces: Vec<T>,
}

impl<T> Cube<T> {
    pub fn from_fn(f: impl FnMut(CubeFace) -> T) -> Self {
        Self {
            faces: CubeFace::ALL.into_iter().map(f).collect(),
        }
    }

    pub fn try_from_fn<E>(
        f: impl FnMut(CubeFace) -> std::result::Result<T, E>,
    ) -> std::result::Result<Self, E> {
        Ok(Self {
            faces: CubeFace::ALL
                .into_iter()
                .map(f)
                .collect::<std::result::Result<_, E>>()?,
        })
    }

    /// Build a cube from named faces (`posx`, `negx`, ...), failing on a
    /// missing or unknown face.
    pub fn from_named<K: AsRef<str>>(named: impl IntoIterator<Item = (K, T)>) -> Result<Self> {
        let mut slots: HashMap<CubeFace, T> = HashMap::new();
        for (name, value) in named {
            slots.insert(name.as_ref().parse()?, value);
        }
        Self::try_from_fn(|face| slots.remove(&face).ok_or(Error::MissingCubeFace(face.name())))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CubeFace, &T)> {
        CubeFace::ALL.into_iter().zip(self.faces.iter())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Cube<U> {
        Cube {
            faces: self.faces.into_iter().map(f).collect(),
        }
    }
}

impl<T> Index<CubeFace> for Cube<T> {
    type Output = T;

    fn index(&self, face: CubeFace) -> &T {
        &self.faces[face.index()]
    }
}

impl<T> IndexMut<CubeFace> for Cube<T> {
    fn index_mut(&mut self, face: CubeFace) -> &mut T {
        &mut self.faces[face.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_face_names() {
        assert_eq!("negy".parse::<CubeFace>().unwrap(), CubeFace::NegY);
        assert!(matches!(
            "left".parse::<CubeFace>(),
            Err(Error::UnknownCubeFace(_))
        ));
    }

    #[test]
    fn test_from_named_requires_all_faces() {
        let cube = Cube::from_named(CubeFace::ALL.map(|f| (f.name(), f.index()))).unwrap();
        assert_eq!(cube[CubeFace::PosZ], 4);

        let missing = Cube::from_named([("posx", 0), ("negx", 1), ("posy", 2), ("negy", 3), ("posz", 4)]);
        assert!(matches!(missing, Err(Error::MissingCubeFace("negz"))));
    }

    #[test]
    fn test_up_is_perpendicular_to_direction() {
        for face in CubeFace::ALL {
            let d = face.direction();
            let u = face.up();
            assert_eq!(d[0] * u[0] + d[1] * u[1] + d[2] * u[2], 0.0);
        }
    }
}
