//! Geometry attributes: descriptor grammar, assembly, and a container view.
//!
//! [`Geometry`] collects every descriptor-named buffer of a container and
//! assembles logical attributes (all positions, all indices, ...) from
//! them on demand.

mod descriptor;
mod assembler;

pub use descriptor::*;
pub use assembler::*;

use crate::bfast::Container;
use crate::util::{AssemblyError, Bounds3f, Mat4};

/// Geometry attributes of one container.
#[derive(Clone, Debug)]
pub struct Geometry {
    attributes: Vec<GeometryAttribute>,
    min_zero_copy_bytes: usize,
}

impl Geometry {
    /// Collect all attribute buffers of `container`.
    ///
    /// Buffers whose names do not have the descriptor shape (tables, the
    /// string pool, nested containers) are skipped; descriptor-shaped
    /// names that fail to parse or to validate are errors.
    pub fn from_container(container: &Container, min_zero_copy_bytes: usize) -> Result<Self, AssemblyError> {
        let mut attributes = Vec::new();
        for buffer in container.buffers() {
            if AttributeDescriptor::looks_like(buffer.name()) {
                attributes.push(GeometryAttribute::from_buffer(buffer.clone())?);
            }
        }
        tracing::debug!(attributes = attributes.len(), "collected geometry attributes");
        Ok(Self { attributes, min_zero_copy_bytes })
    }

    /// All attributes in directory order.
    #[inline]
    pub fn attributes(&self) -> &[GeometryAttribute] {
        &self.attributes
    }

    /// True if no attribute buffers were found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attributes with the given association and semantic, ordered by index
    /// (directory order among equal indices).
    pub fn find(&self, association: &Association, semantic: &Semantic) -> Vec<GeometryAttribute> {
        let mut found: Vec<_> = self
            .attributes
            .iter()
            .filter(|a| &a.descriptor().association == association && &a.descriptor().semantic == semantic)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.descriptor().index);
        found
    }

    /// Assemble the logical attribute for an association and semantic.
    pub fn assemble(&self, association: Association, semantic: Semantic) -> Result<Option<AttributeBuffer>, AssemblyError> {
        assemble(&self.find(&association, &semantic), self.min_zero_copy_bytes)
    }

    /// Vertex positions (`vertex:position`).
    pub fn positions(&self) -> Result<Option<AttributeBuffer>, AssemblyError> {
        self.assemble(Association::Vertex, Semantic::Position)
    }

    /// Triangle indices (`corner:index`).
    pub fn indices(&self) -> Result<Option<AttributeBuffer>, AssemblyError> {
        self.assemble(Association::Corner, Semantic::Index)
    }

    /// Vertex normals (`vertex:normal`).
    pub fn normals(&self) -> Result<Option<AttributeBuffer>, AssemblyError> {
        self.assemble(Association::Vertex, Semantic::Normal)
    }

    /// Per-instance 4x4 transforms (`instance:transform`).
    pub fn instance_transforms(&self) -> Result<Option<AttributeBuffer>, AssemblyError> {
        self.assemble(Association::Instance, Semantic::Transform)
    }

    /// Per-instance mesh indices (`instance:mesh`).
    pub fn instance_meshes(&self) -> Result<Option<AttributeBuffer>, AssemblyError> {
        self.assemble(Association::Instance, Semantic::Mesh)
    }

    /// Material colors (`material:color`).
    pub fn material_colors(&self) -> Result<Option<AttributeBuffer>, AssemblyError> {
        self.assemble(Association::Material, Semantic::Color)
    }

    /// Bounds of all `float32` vertex positions, in model space.
    ///
    /// Empty when there are no positions or they are not `float32` triples.
    pub fn bounds(&self) -> Result<Bounds3f, AssemblyError> {
        let Some(positions) = self.positions()? else {
            return Ok(Bounds3f::EMPTY);
        };
        if positions.descriptor().data_type != crate::util::DataType::VEC3F {
            return Ok(Bounds3f::EMPTY);
        }
        Ok(Bounds3f::from_positions(&positions.typed::<f32>()?))
    }

    /// Bounds of the positions under every instance transform.
    ///
    /// Falls back to [`Geometry::bounds`] when no transforms are present.
    pub fn instanced_bounds(&self) -> Result<Bounds3f, AssemblyError> {
        let local = self.bounds()?;
        let Some(transforms) = self.instance_transforms()? else {
            return Ok(local);
        };
        if transforms.descriptor().data_type != crate::util::DataType::MAT44F {
            return Ok(local);
        }
        let mut out = Bounds3f::EMPTY;
        for m in transforms.typed::<f32>()?.chunks_exact(16) {
            // Stored row-major; glam is column-major.
            let matrix = Mat4::from_cols_slice(m).transpose();
            out = out.union(&local.transformed(&matrix));
        }
        Ok(out)
    }
}
