//! Typed table columns.

use std::fmt;

use crate::bfast::NamedBuffer;
use crate::util::ScalarType;

/// Prefix shared by all table column buffers.
pub const TABLE_PREFIX: &str = "table/";

/// Row index meaning "no row".
pub const EMPTY_INDEX: i32 = -1;

/// Storage type of a column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Packed numeric values
    Scalar(ScalarType),
    /// i32 indices into the container string pool
    String,
    /// i32 row indices into another table
    Index { target: String },
}

impl ColumnType {
    /// Parse the data type part of a column buffer name.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(target) = s.strip_prefix("index:") {
            return (!target.is_empty()).then(|| Self::Index { target: target.to_string() });
        }
        match s {
            "string" => Some(Self::String),
            other => ScalarType::from_name(other).map(Self::Scalar),
        }
    }

    /// Bytes per row.
    #[inline]
    pub fn num_bytes(&self) -> usize {
        match self {
            Self::Scalar(s) => s.num_bytes(),
            Self::String | Self::Index { .. } => 4,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::String => write!(f, "string"),
            Self::Index { target } => write!(f, "index:{target}"),
        }
    }
}

/// Components of a column buffer name `table/<table>/<column>:<type>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnName<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub data_type: &'a str,
}

impl<'a> ColumnName<'a> {
    /// Split a buffer name; `None` if it is not a table column.
    pub fn split(name: &'a str) -> Option<Self> {
        let rest = name.strip_prefix(TABLE_PREFIX)?;
        let (table, field) = rest.split_once('/')?;
        let (column, data_type) = field.split_once(':')?;
        if table.is_empty() || column.is_empty() {
            return None;
        }
        Some(Self { table, column, data_type })
    }
}

/// One column: a typed view over a container buffer.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    buffer: NamedBuffer,
}

impl Column {
    pub(crate) fn new(name: impl Into<String>, column_type: ColumnType, buffer: NamedBuffer) -> Self {
        Self { name: name.into(), column_type, buffer }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    #[inline]
    pub fn buffer(&self) -> &NamedBuffer {
        &self.buffer
    }

    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.buffer.len() / self.column_type.num_bytes()
    }

    /// Target table of an index column.
    pub fn target(&self) -> Option<&str> {
        match &self.column_type {
            ColumnType::Index { target } => Some(target),
            _ => None,
        }
    }

    /// Integer value of a numeric column (floats truncate).
    pub fn int(&self, row: usize) -> Option<i64> {
        match self.column_type {
            ColumnType::Scalar(s) => s.read_i64(self.buffer.bytes(), row),
            _ => None,
        }
    }

    /// Float value of a numeric column.
    pub fn float(&self, row: usize) -> Option<f64> {
        match self.column_type {
            ColumnType::Scalar(s) => s.read_f64(self.buffer.bytes(), row),
            _ => None,
        }
    }

    /// Raw i32 of a string or index column.
    pub fn raw_index(&self, row: usize) -> Option<i32> {
        match self.column_type {
            ColumnType::String | ColumnType::Index { .. } => {
                ScalarType::Int32.read_i64(self.buffer.bytes(), row).map(|v| v as i32)
            }
            ColumnType::Scalar(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_parse() {
        assert_eq!(ColumnType::parse("int32"), Some(ColumnType::Scalar(ScalarType::Int32)));
        assert_eq!(ColumnType::parse("string"), Some(ColumnType::String));
        assert_eq!(
            ColumnType::parse("index:Family"),
            Some(ColumnType::Index { target: "Family".into() })
        );
        assert_eq!(ColumnType::parse("index:"), None);
        assert_eq!(ColumnType::parse("bool"), None);
        assert_eq!(ColumnType::parse("index:Family").unwrap().to_string(), "index:Family");
    }

    #[test]
    fn test_column_name_split() {
        let n = ColumnName::split("table/Element/Family:index:Family").unwrap();
        assert_eq!(n.table, "Element");
        assert_eq!(n.column, "Family");
        assert_eq!(n.data_type, "index:Family");

        let n = ColumnName::split("table/Level/Elevation:float64").unwrap();
        assert_eq!((n.table, n.column, n.data_type), ("Level", "Elevation", "float64"));

        assert!(ColumnName::split("vertex:position:0:float32:3").is_none());
        assert!(ColumnName::split("table/Element").is_none());
        assert!(ColumnName::split("table//Name:string").is_none());
    }
}
