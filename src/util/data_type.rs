//! DataType - combines a scalar type with an arity (components per element).

use super::ScalarType;
use std::fmt;

/// DataType describes how one element of an attribute stream is stored.
///
/// A position is `float32` with arity 3, a 4x4 transform is `float32`
/// with arity 16, an index buffer is `int32` with arity 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// The scalar type of each component
    pub scalar: ScalarType,
    /// Number of components per element
    pub arity: u32,
}

impl DataType {
    /// Create a new DataType with given scalar and arity.
    #[inline]
    pub const fn new(scalar: ScalarType, arity: u32) -> Self {
        Self { scalar, arity }
    }

    /// Create a scalar DataType (arity = 1).
    #[inline]
    pub const fn scalar(scalar: ScalarType) -> Self {
        Self { scalar, arity: 1 }
    }

    /// Returns the total size in bytes for one element.
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.scalar.num_bytes() * self.arity as usize
    }

    /// Returns true if `byte_len` is a whole number of elements.
    #[inline]
    pub const fn fits(&self, byte_len: usize) -> bool {
        let stride = self.num_bytes();
        stride != 0 && byte_len % stride == 0
    }

    pub const INT32: Self = Self::scalar(ScalarType::Int32);
    pub const UINT32: Self = Self::scalar(ScalarType::Uint32);
    pub const FLOAT32: Self = Self::scalar(ScalarType::Float32);
    pub const VEC2F: Self = Self::new(ScalarType::Float32, 2);
    pub const VEC3F: Self = Self::new(ScalarType::Float32, 3);
    pub const VEC4F: Self = Self::new(ScalarType::Float32, 4);
    pub const MAT44F: Self = Self::new(ScalarType::Float32, 16);
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arity == 1 {
            write!(f, "{}", self.scalar.name())
        } else {
            write!(f, "{}[{}]", self.scalar.name(), self.arity)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::INT32.num_bytes(), 4);
        assert_eq!(DataType::VEC3F.num_bytes(), 12);
        assert_eq!(DataType::MAT44F.num_bytes(), 64);
        assert_eq!(DataType::new(ScalarType::Float64, 3).num_bytes(), 24);
    }

    #[test]
    fn test_data_type_fits() {
        assert!(DataType::VEC3F.fits(0));
        assert!(DataType::VEC3F.fits(36));
        assert!(!DataType::VEC3F.fits(40));
        assert!(!DataType::new(ScalarType::Int8, 0).fits(4));
    }

    #[test]
    fn test_data_type_display() {
        assert_eq!(format!("{}", DataType::FLOAT32), "float32");
        assert_eq!(format!("{}", DataType::VEC3F), "float32[3]");
    }
}
