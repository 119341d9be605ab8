//! Attribute descriptor grammar.
//!
//! Geometry buffers are named
//! `"<association>:<semantic>:<index>:<dataType>:<arity>"`, for example
//! `vertex:position:0:float32:3`. A leading `g3d:` tag is tolerated.

use std::fmt;
use std::str::FromStr;

use crate::util::{AssemblyError, DataType, ScalarType};

/// Number of colon-separated fields in a descriptor.
pub const DESCRIPTOR_FIELDS: usize = 5;

/// Optional leading tag some writers prepend to descriptors.
const G3D_TAG: &str = "g3d";

/// What element kind an attribute is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Association {
    All,
    Vertex,
    Face,
    Corner,
    Edge,
    Instance,
    Shape,
    Mesh,
    Submesh,
    Material,
    Unknown(String),
}

impl Association {
    fn parse(s: &str) -> Self {
        match s {
            "all" => Self::All,
            "vertex" => Self::Vertex,
            "face" => Self::Face,
            "corner" => Self::Corner,
            "edge" => Self::Edge,
            "instance" => Self::Instance,
            "shape" => Self::Shape,
            "mesh" => Self::Mesh,
            "submesh" => Self::Submesh,
            "material" => Self::Material,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Name as written in descriptors.
    pub fn name(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Vertex => "vertex",
            Self::Face => "face",
            Self::Corner => "corner",
            Self::Edge => "edge",
            Self::Instance => "instance",
            Self::Shape => "shape",
            Self::Mesh => "mesh",
            Self::Submesh => "submesh",
            Self::Material => "material",
            Self::Unknown(s) => s,
        }
    }
}

/// What an attribute means.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Semantic {
    Position,
    Index,
    Normal,
    Uv,
    Color,
    Transform,
    Parent,
    Flags,
    Mesh,
    Submesh,
    Material,
    IndexOffset,
    VertexOffset,
    Unknown(String),
}

impl Semantic {
    fn parse(s: &str) -> Self {
        match s {
            "position" => Self::Position,
            "index" => Self::Index,
            "normal" => Self::Normal,
            "uv" => Self::Uv,
            "color" => Self::Color,
            "transform" => Self::Transform,
            "parent" => Self::Parent,
            "flags" => Self::Flags,
            "mesh" => Self::Mesh,
            "submesh" => Self::Submesh,
            "material" => Self::Material,
            "indexoffset" => Self::IndexOffset,
            "vertexoffset" => Self::VertexOffset,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Name as written in descriptors.
    pub fn name(&self) -> &str {
        match self {
            Self::Position => "position",
            Self::Index => "index",
            Self::Normal => "normal",
            Self::Uv => "uv",
            Self::Color => "color",
            Self::Transform => "transform",
            Self::Parent => "parent",
            Self::Flags => "flags",
            Self::Mesh => "mesh",
            Self::Submesh => "submesh",
            Self::Material => "material",
            Self::IndexOffset => "indexoffset",
            Self::VertexOffset => "vertexoffset",
            Self::Unknown(s) => s,
        }
    }
}

/// Parsed attribute buffer name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributeDescriptor {
    pub association: Association,
    pub semantic: Semantic,
    /// Distinguishes several attributes with the same association and semantic
    pub index: u32,
    pub data_type: DataType,
}

impl AttributeDescriptor {
    /// Create a descriptor.
    pub fn new(association: Association, semantic: Semantic, index: u32, data_type: DataType) -> Self {
        Self { association, semantic, index, data_type }
    }

    /// True if `name` has the shape of a descriptor (five fields, optionally tagged).
    ///
    /// Shape only; [`AttributeDescriptor::parse`] still validates the fields.
    pub fn looks_like(name: &str) -> bool {
        let n = name.split(':').count();
        n == DESCRIPTOR_FIELDS || (n == DESCRIPTOR_FIELDS + 1 && name.starts_with("g3d:"))
    }

    /// Parse a buffer name.
    pub fn parse(name: &str) -> Result<Self, AssemblyError> {
        let invalid = |reason: String| AssemblyError::InvalidDescriptor {
            name: name.to_string(),
            reason,
        };

        let mut fields: Vec<&str> = name.split(':').collect();
        if fields.len() == DESCRIPTOR_FIELDS + 1 && fields[0] == G3D_TAG {
            fields.remove(0);
        }
        let [association, semantic, index, data_type, arity] = fields[..] else {
            return Err(invalid(format!(
                "expected {DESCRIPTOR_FIELDS} colon-separated fields, found {}",
                fields.len()
            )));
        };

        if association.is_empty() || semantic.is_empty() {
            return Err(invalid("empty association or semantic".into()));
        }
        let index: u32 = index
            .parse()
            .map_err(|_| invalid(format!("index '{index}' is not a number")))?;
        let scalar = ScalarType::from_name(data_type)
            .ok_or_else(|| invalid(format!("unknown data type '{data_type}'")))?;
        let arity: u32 = arity
            .parse()
            .map_err(|_| invalid(format!("arity '{arity}' is not a number")))?;
        if arity == 0 {
            return Err(invalid("arity must be at least 1".into()));
        }

        Ok(Self {
            association: Association::parse(association),
            semantic: Semantic::parse(semantic),
            index,
            data_type: DataType::new(scalar, arity),
        })
    }

    /// Check that `byte_len` holds a whole number of elements.
    pub fn validate_len(&self, name: &str, byte_len: usize) -> Result<(), AssemblyError> {
        if self.data_type.fits(byte_len) {
            Ok(())
        } else {
            Err(AssemblyError::InconsistentAttributeSize {
                name: name.to_string(),
                byte_len,
                stride: self.data_type.num_bytes(),
            })
        }
    }
}

impl FromStr for AttributeDescriptor {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.association.name(),
            self.semantic.name(),
            self.index,
            self.data_type.scalar.name(),
            self.data_type.arity
        )
    }
}
