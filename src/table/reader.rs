//! Reading columnar tables out of a container.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Column, ColumnName, ColumnType, StringPool};
use crate::bfast::{Container, NamedBuffer, STRINGS_BUFFER};
use crate::util::TableError;

/// A table: ordered, equal-length, immutable columns.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    row_count: usize,
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
    strings: Option<Arc<StringPool>>,
}

impl Table {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows (equal for every column).
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Columns in directory order.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in directory order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(Column::name)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    /// Integer cell of a numeric column.
    pub fn int(&self, column: &str, row: usize) -> Option<i64> {
        self.column(column)?.int(row)
    }

    /// Float cell of a numeric column.
    pub fn float(&self, column: &str, row: usize) -> Option<f64> {
        self.column(column)?.float(row)
    }

    /// Boolean cell of a numeric column (non-zero is true).
    pub fn bool(&self, column: &str, row: usize) -> Option<bool> {
        self.int(column, row).map(|v| v != 0)
    }

    /// String cell, borrowed from the string pool.
    pub fn string(&self, column: &str, row: usize) -> Option<&str> {
        let col = self.column(column)?;
        if !matches!(col.column_type(), ColumnType::String) {
            return None;
        }
        let index = col.raw_index(row)?;
        self.strings.as_ref()?.get(index as i64)
    }

    /// Row index stored in an index column; `None` for the empty sentinel
    /// (any negative value).
    pub fn index(&self, column: &str, row: usize) -> Option<usize> {
        let col = self.column(column)?;
        col.target()?;
        usize::try_from(col.raw_index(row)?).ok()
    }
}

/// Groups a container's column buffers by table.
#[derive(Clone, Debug)]
pub struct TableReader {
    tables: Vec<(String, Vec<NamedBuffer>)>,
    strings: Option<Arc<StringPool>>,
}

impl TableReader {
    /// Scan `container` for table columns and its string pool.
    pub fn new(container: &Container) -> Self {
        let mut tables: Vec<(String, Vec<NamedBuffer>)> = Vec::new();
        for buffer in container.buffers() {
            let Some(name) = ColumnName::split(buffer.name()) else {
                continue;
            };
            match tables.iter_mut().find(|(t, _)| t == name.table) {
                Some((_, cols)) => cols.push(buffer.clone()),
                None => tables.push((name.table.to_string(), vec![buffer.clone()])),
            }
        }
        let strings = container
            .get(STRINGS_BUFFER)
            .map(|b| Arc::new(StringPool::new(b.clone())));

        tracing::debug!(tables = tables.len(), strings = strings.as_ref().map_or(0, |s| s.len()), "scanned tables");
        Self { tables, strings }
    }

    /// Table names in directory order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.iter().map(|(name, _)| name.as_str())
    }

    /// True if the container has columns for `name`.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|(t, _)| t == name)
    }

    /// The container's string pool, if any.
    pub fn strings(&self) -> Option<&Arc<StringPool>> {
        self.strings.as_ref()
    }

    /// Read and validate one table.
    pub fn read_table(&self, name: &str) -> Result<Table, TableError> {
        let (_, buffers) = self
            .tables
            .iter()
            .find(|(t, _)| t == name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;

        let mut columns = Vec::with_capacity(buffers.len());
        let mut by_name = HashMap::with_capacity(buffers.len());
        let mut row_count: Option<usize> = None;

        for buffer in buffers {
            // Grouping already proved the name splits.
            let Some(parts) = ColumnName::split(buffer.name()) else {
                continue;
            };
            let column_type = ColumnType::parse(parts.data_type).ok_or_else(|| {
                TableError::UnsupportedColumnType {
                    table: name.to_string(),
                    column: parts.column.to_string(),
                    data_type: parts.data_type.to_string(),
                }
            })?;
            if column_type == ColumnType::String && self.strings.is_none() {
                return Err(TableError::MissingStringPool {
                    table: name.to_string(),
                    column: parts.column.to_string(),
                });
            }

            let size = column_type.num_bytes();
            let rows = buffer.len() / size;
            let expected = *row_count.get_or_insert(rows);
            if rows != expected || buffer.len() % size != 0 {
                return Err(TableError::InconsistentRowCount {
                    table: name.to_string(),
                    column: parts.column.to_string(),
                    expected,
                    actual: rows,
                });
            }

            by_name.entry(parts.column.to_string()).or_insert(columns.len());
            columns.push(Column::new(parts.column, column_type, buffer.clone()));
        }

        let row_count = row_count.unwrap_or(0);
        tracing::trace!(table = name, rows = row_count, columns = columns.len(), "read table");
        Ok(Table {
            name: name.to_string(),
            row_count,
            columns,
            by_name,
            strings: self.strings.clone(),
        })
    }
}
