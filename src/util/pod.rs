//! Scalar storage types shared by geometry attributes and table columns.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Fixed-size scalar type of one component in a buffer.
///
/// Every numeric buffer in a container (attribute streams and table
/// columns alike) is a packed little-endian array of one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ScalarType {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 32-bit integer
    Int32 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 64-bit integer
    Int64 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// 32-bit floating point
    Float32 = 8,
    /// 64-bit floating point
    Float64 = 9,
}

impl ScalarType {
    /// All scalar types, in tag order.
    pub const ALL: [Self; 10] = [
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the size in bytes of a single value of this type.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Returns the name used in buffer names (`"float32"`, `"int32"`, ...).
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse a scalar type from its buffer-name spelling.
    ///
    /// `byte` is accepted as an alias of `uint8`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int8" => Self::Int8,
            "uint8" | "byte" => Self::Uint8,
            "int16" => Self::Int16,
            "uint16" => Self::Uint16,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => return None,
        })
    }

    /// Decode the value at `index` from a packed little-endian slice as `f64`.
    pub fn read_f64(self, bytes: &[u8], index: usize) -> Option<f64> {
        let size = self.num_bytes();
        let raw = bytes.get(index * size..(index + 1) * size)?;
        Some(match self {
            Self::Float32 => f32::from_le_bytes(raw.try_into().ok()?) as f64,
            Self::Float64 => f64::from_le_bytes(raw.try_into().ok()?),
            _ => self.read_i64(bytes, index)? as f64,
        })
    }

    /// Decode the value at `index` from a packed little-endian slice as `i64`.
    ///
    /// Floats are truncated toward zero; `uint64` values above `i64::MAX` wrap.
    pub fn read_i64(self, bytes: &[u8], index: usize) -> Option<i64> {
        let size = self.num_bytes();
        let raw = bytes.get(index * size..(index + 1) * size)?;
        Some(match self {
            Self::Int8 => raw[0] as i8 as i64,
            Self::Uint8 => raw[0] as i64,
            Self::Int16 => i16::from_le_bytes(raw.try_into().ok()?) as i64,
            Self::Uint16 => u16::from_le_bytes(raw.try_into().ok()?) as i64,
            Self::Int32 => i32::from_le_bytes(raw.try_into().ok()?) as i64,
            Self::Uint32 => u32::from_le_bytes(raw.try_into().ok()?) as i64,
            Self::Int64 => i64::from_le_bytes(raw.try_into().ok()?),
            Self::Uint64 => u64::from_le_bytes(raw.try_into().ok()?) as i64,
            Self::Float32 => f32::from_le_bytes(raw.try_into().ok()?) as i64,
            Self::Float64 => f64::from_le_bytes(raw.try_into().ok()?) as i64,
        })
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === POD Trait for typed views ===

/// Trait for Rust types that can view a container buffer.
pub trait VimPod: Pod + Zeroable + Copy + Default {
    /// The corresponding scalar type.
    const SCALAR: ScalarType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

macro_rules! impl_vim_pod {
    ($($ty:ty => $scalar:ident),* $(,)?) => {
        $(impl VimPod for $ty {
            const SCALAR: ScalarType = ScalarType::$scalar;
        })*
    };
}

impl_vim_pod! {
    i8 => Int8,
    u8 => Uint8,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
}
