//! Reference resolution for one table.

use std::collections::HashMap;

use crate::entity::{EntityKind, Reference};
use crate::table::{ColumnType, Table};
use crate::util::ImportError;

/// Tables read for an import, indexed by [`EntityKind::ordinal`].
pub type TableSet = [Option<Table>; 9];

/// `refs[i][row]` is the resolved target row of reference field `i`.
pub type ResolvedReferences = Vec<Vec<Option<usize>>>;

/// Reverse name indexes, built lazily for the targets of one table and
/// dropped with it.
struct NameIndexes<'a> {
    tables: &'a TableSet,
    built: HashMap<EntityKind, HashMap<&'a str, usize>>,
}

impl<'a> NameIndexes<'a> {
    fn new(tables: &'a TableSet) -> Self {
        Self { tables, built: HashMap::new() }
    }

    /// Name -> first row with that name, in `target`'s table.
    fn get(&mut self, target: EntityKind) -> &HashMap<&'a str, usize> {
        let tables = self.tables;
        self.built.entry(target).or_insert_with(|| {
            let mut index = HashMap::new();
            if let Some(table) = &tables[target.ordinal()] {
                for row in 0..table.row_count() {
                    if let Some(name) = table.string("Name", row) {
                        index.entry(name).or_insert(row);
                    }
                }
            }
            tracing::debug!(target = %target, names = index.len(), "built name index");
            index
        })
    }
}

/// Resolve every reference field of `kind` for all rows of `table`.
///
/// An index column pointing at a different table than the field's target
/// fails on the first row that holds a real index. Negative and
/// out-of-range indices resolve to `None`, as do names with no match.
pub fn resolve_references(
    kind: EntityKind,
    table: &Table,
    tables: &TableSet,
) -> Result<ResolvedReferences, ImportError> {
    let mut names = NameIndexes::new(tables);
    kind.references()
        .iter()
        .map(|reference| resolve_field(kind, reference, table, tables, &mut names))
        .collect()
}

fn resolve_field<'a>(
    kind: EntityKind,
    reference: &Reference,
    table: &Table,
    tables: &'a TableSet,
    names: &mut NameIndexes<'a>,
) -> Result<Vec<Option<usize>>, ImportError> {
    let rows = table.row_count();
    let expected = reference.target.table_name();

    if let Some(actual) = table.column(reference.field).and_then(|c| c.target()) {
        if actual != expected {
            if let Some(row) = (0..rows).find(|&r| table.index(reference.field, r).is_some()) {
                return Err(ImportError::ReferenceTypeMismatch {
                    table: kind.table_name().to_string(),
                    column: reference.field.to_string(),
                    row,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
            return Ok(vec![None; rows]);
        }
        let target_rows = tables[reference.target.ordinal()]
            .as_ref()
            .map_or(0, Table::row_count);
        return Ok((0..rows)
            .map(|r| table.index(reference.field, r).filter(|&i| i < target_rows))
            .collect());
    }

    let name_column = format!("{}.Name", reference.field);
    let is_string = table
        .column(&name_column)
        .is_some_and(|c| *c.column_type() == ColumnType::String);
    if is_string {
        let index = names.get(reference.target);
        return Ok((0..rows)
            .map(|r| table.string(&name_column, r).and_then(|name| index.get(name).copied()))
            .collect());
    }

    Ok(vec![None; rows])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfast::test_util::ContainerBuilder;
    use crate::bfast::{Container, SourceBytes};
    use crate::table::TableReader;
    use std::sync::Arc;

    fn ints(v: &[i32]) -> Vec<u8> {
        bytemuck::cast_slice(v).to_vec()
    }

    fn tables(builder: ContainerBuilder) -> TableSet {
        let c = Container::decode(Arc::new(SourceBytes::from_vec(builder.build()))).unwrap();
        let reader = TableReader::new(&c);
        EntityKind::IMPORT_ORDER.map(|k| reader.read_table(k.table_name()).ok())
    }

    #[test]
    fn test_index_sentinel_and_range() {
        let set = tables(
            ContainerBuilder::new()
                .add("table/Family/IsSystemFamily:uint8", &[0, 0])
                .add("table/Element/Family:index:Family", &ints(&[1, -1, 5, -7])),
        );
        let element = set[EntityKind::Element.ordinal()].as_ref().unwrap();
        let refs = resolve_references(EntityKind::Element, element, &set).unwrap();
        // Category, Family, Level, Workset
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0], vec![None; 4]);
        assert_eq!(refs[1], vec![Some(1), None, None, None]);
    }

    #[test]
    fn test_name_reference() {
        let set = tables(
            ContainerBuilder::new()
                .add("strings", b"L1\0L2\0Ghost\0")
                .add("table/Level/Name:string", &ints(&[0, 1, 0]))
                .add("table/Element/Level.Name:string", &ints(&[1, 0, 2, -1])),
        );
        let element = set[EntityKind::Element.ordinal()].as_ref().unwrap();
        let refs = resolve_references(EntityKind::Element, element, &set).unwrap();
        assert_eq!(refs[2], vec![Some(1), Some(0), None, None]);
    }

    #[test]
    fn test_wrong_target_is_mismatch() {
        let set = tables(
            ContainerBuilder::new()
                .add("table/Level/Elevation:float64", &[0u8; 8])
                .add("table/Element/Family:index:Level", &ints(&[-1, 0])),
        );
        let element = set[EntityKind::Element.ordinal()].as_ref().unwrap();
        match resolve_references(EntityKind::Element, element, &set) {
            Err(ImportError::ReferenceTypeMismatch { table, column, row, expected, actual }) => {
                assert_eq!((table.as_str(), column.as_str(), row), ("Element", "Family", 1));
                assert_eq!((expected.as_str(), actual.as_str()), ("Family", "Level"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wrong_target_all_empty_is_fine() {
        let set = tables(ContainerBuilder::new().add("table/Element/Family:index:Level", &ints(&[-1, -1])));
        let element = set[EntityKind::Element.ordinal()].as_ref().unwrap();
        let refs = resolve_references(EntityKind::Element, element, &set).unwrap();
        assert_eq!(refs[1], vec![None, None]);
    }
}
