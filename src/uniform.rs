//! Typed uniform payloads.

use std::fmt;
use std::ops::Deref;

/// A uniform value, stored inline.
///
/// Booleans are uploaded as integers, which is how GLSL expects `bool`
/// and `bvecN` uniforms to be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Bool(bool),
    BVec2([bool; 2]),
    BVec3([bool; 3]),
    BVec4([bool; 4]),
    /// Column-major 4x4 float matrix.
    Mat4([f32; 16]),
}

/// Element type of a uniform value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Float,
    Int,
    Bool,
}

impl UniformValue {
    /// Builds a float uniform from one to four components.
    ///
    /// Returns `None` for an empty slice or more than four components.
    pub fn from_floats(values: &[f32]) -> Option<Self> {
        match *values {
            [x] => Some(UniformValue::Float(x)),
            [x, y] => Some(UniformValue::Vec2([x, y])),
            [x, y, z] => Some(UniformValue::Vec3([x, y, z])),
            [x, y, z, w] => Some(UniformValue::Vec4([x, y, z, w])),
            _ => None,
        }
    }

    /// Number of components (16 for `Mat4`).
    pub fn arity(&self) -> usize {
        match self {
            UniformValue::Float(_) | UniformValue::Int(_) | UniformValue::Bool(_) => 1,
            UniformValue::Vec2(_) | UniformValue::IVec2(_) | UniformValue::BVec2(_) => 2,
            UniformValue::Vec3(_) | UniformValue::IVec3(_) | UniformValue::BVec3(_) => 3,
            UniformValue::Vec4(_) | UniformValue::IVec4(_) | UniformValue::BVec4(_) => 4,
            UniformValue::Mat4(_) => 16,
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            UniformValue::Float(_)
            | UniformValue::Vec2(_)
            | UniformValue::Vec3(_)
            | UniformValue::Vec4(_)
            | UniformValue::Mat4(_) => ScalarType::Float,
            UniformValue::Int(_)
            | UniformValue::IVec2(_)
            | UniformValue::IVec3(_)
            | UniformValue::IVec4(_) => ScalarType::Int,
            UniformValue::Bool(_)
            | UniformValue::BVec2(_)
            | UniformValue::BVec3(_)
            | UniformValue::BVec4(_) => ScalarType::Bool,
        }
    }

    /// Integer view used when uploading `int`/`bool` kinds.
    /// Empty for float kinds.
    pub fn as_ints(&self) -> IntComponents {
        fn bools<const N: usize>(v: &[bool; N]) -> IntComponents {
            let mut values = [0; 4];
            for (dst, b) in values.iter_mut().zip(v) {
                *dst = *b as i32;
            }
            IntComponents { values, len: N }
        }
        fn ints<const N: usize>(v: &[i32; N]) -> IntComponents {
            let mut values = [0; 4];
            values[..N].copy_from_slice(v);
            IntComponents { values, len: N }
        }
        match self {
            UniformValue::Int(x) => ints(&[*x]),
            UniformValue::IVec2(v) => ints(v),
            UniformValue::IVec3(v) => ints(v),
            UniformValue::IVec4(v) => ints(v),
            UniformValue::Bool(b) => bools(&[*b]),
            UniformValue::BVec2(v) => bools(v),
            UniformValue::BVec3(v) => bools(v),
            UniformValue::BVec4(v) => bools(v),
            _ => IntComponents::default(),
        }
    }

    /// Float view used when uploading float kinds. Empty for `int`/`bool` kinds.
    pub fn as_floats(&self) -> &[f32] {
        match self {
            UniformValue::Float(x) => std::slice::from_ref(x),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Vec4(v) => v,
            UniformValue::Mat4(m) => m,
            _ => &[],
        }
    }
}

/// Up to four integer components, stored inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntComponents {
    values: [i32; 4],
    len: usize,
}

impl IntComponents {
    pub fn as_slice(&self) -> &[i32] {
        &self.values[..self.len]
    }
}

impl Deref for IntComponents {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        self.as_slice()
    }
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scalar_type() {
            ScalarType::Float => write!(f, "{:?}", self.as_floats()),
            ScalarType::Int => write!(f, "{:?}", self.as_ints().as_slice()),
            ScalarType::Bool => {
                let bools: Vec<bool> = self.as_ints().iter().map(|i| *i != 0).collect();
                write!(f, "{:?}", bools)
            }
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<[i32; 2]> for UniformValue {
    fn from(value: [i32; 2]) -> Self {
        UniformValue::IVec2(value)
    }
}

impl From<[i32; 3]> for UniformValue {
    fn from(value: [i32; 3]) -> Self {
        UniformValue::IVec3(value)
    }
}

impl From<[i32; 4]> for UniformValue {
    fn from(value: [i32; 4]) -> Self {
        UniformValue::IVec4(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Bool(value)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(value: [f32; 16]) -> Self {
        UniformValue::Mat4(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_floats_picks_arity() {
        assert_eq!(UniformValue::from_floats(&[1.0]), Some(UniformValue::Float(1.0)));
        assert_eq!(
            UniformValue::from_floats(&[1.0, 0.5, 0.25]),
            Some(UniformValue::Vec3([1.0, 0.5, 0.25]))
        );
        assert_eq!(UniformValue::from_floats(&[]), None);
        assert_eq!(UniformValue::from_floats(&[0.0; 5]), None);
    }

    #[test]
    fn test_bools_upload_as_ints() {
        let value = UniformValue::BVec3([true, false, true]);
        assert_eq!(value.as_ints().as_slice(), &[1, 0, 1]);
        assert_eq!(UniformValue::IVec4([1, 2, 3, 4]).as_ints().len(), 4);
        assert!(UniformValue::Vec2([0.0, 1.0]).as_ints().is_empty());
        assert!(value.as_floats().is_empty());
        assert_eq!(value.scalar_type(), ScalarType::Bool);
    }

    #[test]
    fn test_matrix_is_sixteen_floats() {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        let value = UniformValue::from(m);
        assert_eq!(value.arity(), 16);
        assert_eq!(value.as_floats()[0], 1.0);
    }
}
