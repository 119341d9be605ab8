//! Bounding box over glam vectors.
//!
//! Only what the geometry view needs; general 3D math lives in `glam`.

pub use glam::{Mat4, Vec3};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// 3D axis-aligned bounding box with single precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Bounds3f {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds3f {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounding box of a packed `[x, y, z, x, y, z, ...]` slice.
    ///
    /// A trailing partial triple is ignored.
    pub fn from_positions(positions: &[f32]) -> Self {
        let mut bounds = Self::EMPTY;
        for p in positions.chunks_exact(3) {
            bounds.expand_by_point(Vec3::new(p[0], p[1], p[2]));
        }
        bounds
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    ///
    /// Each axis is compared against the same axis of the running bounds.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Union of two boxes.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Transform all eight corners and return their bounds.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_by_point(matrix.transform_point3(corner));
        }
        out
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents) of the box.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Default for Bounds3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Bounds3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bounds3f({:?} - {:?})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_per_axis() {
        // Points chosen so that mixing axes would give a different answer.
        let b = Bounds3f::from_positions(&[5.0, -1.0, 2.0, -3.0, 4.0, 10.0]);
        assert_eq!(b.min, Vec3::new(-3.0, -1.0, 2.0));
        assert_eq!(b.max, Vec3::new(5.0, 4.0, 10.0));
    }

    #[test]
    fn test_bounds_union() {
        let a = Bounds3f::new(Vec3::ZERO, Vec3::ONE);
        let b = Bounds3f::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(0.5, 2.0, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(a.union(&Bounds3f::EMPTY), a);
        assert_eq!(Bounds3f::EMPTY.union(&a), a);
    }

    #[test]
    fn test_bounds_transformed() {
        let a = Bounds3f::new(Vec3::ZERO, Vec3::ONE);
        let t = a.transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(t.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(t.max, Vec3::new(11.0, 1.0, 1.0));
        assert!(Bounds3f::EMPTY.transformed(&Mat4::IDENTITY).is_empty());
    }
}
