//! Materialized entity records.

use serde::Serialize;

use super::EntityKind;
use crate::table::Table;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Category {
    pub name: Option<String>,
    pub built_in_category: Option<String>,
    pub parent: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Family {
    pub name: Option<String>,
    pub is_system_family: bool,
    pub category: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Workset {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub is_open: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Level {
    pub name: Option<String>,
    pub elevation: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Camera {
    pub is_perspective: bool,
    pub vertical_extent: f64,
    pub horizontal_extent: f64,
    pub near_distance: f64,
    pub far_distance: f64,
}

/// A building element. `id` is the authoring tool's element id.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Element {
    pub id: i64,
    pub unique_id: Option<String>,
    pub name: Option<String>,
    pub category: Option<usize>,
    pub family: Option<usize>,
    pub level: Option<usize>,
    pub workset: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct View {
    pub title: Option<String>,
    pub view_type: Option<String>,
    pub camera: Option<usize>,
    pub element: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Parameter {
    pub name: Option<String>,
    pub value: Option<String>,
    pub element: Option<usize>,
}

/// A geometry instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Node {
    pub element: Option<usize>,
}

/// One imported row of any kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Entity {
    Category(Category),
    Family(Family),
    Workset(Workset),
    Level(Level),
    Camera(Camera),
    Element(Element),
    View(View),
    Parameter(Parameter),
    Node(Node),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Category(_) => EntityKind::Category,
            Self::Family(_) => EntityKind::Family,
            Self::Workset(_) => EntityKind::Workset,
            Self::Level(_) => EntityKind::Level,
            Self::Camera(_) => EntityKind::Camera,
            Self::Element(_) => EntityKind::Element,
            Self::View(_) => EntityKind::View,
            Self::Parameter(_) => EntityKind::Parameter,
            Self::Node(_) => EntityKind::Node,
        }
    }

    /// Build the record for one row. References come from `row`, which
    /// holds them already resolved in [`EntityKind::references`] order.
    pub fn from_row(kind: EntityKind, row: &Row<'_>) -> Self {
        match kind {
            EntityKind::Category => Self::Category(Category {
                name: row.string("Name"),
                built_in_category: row.string("BuiltInCategory"),
                parent: row.reference(0),
            }),
            EntityKind::Family => Self::Family(Family {
                name: row.string("Name"),
                is_system_family: row.bool("IsSystemFamily"),
                category: row.reference(0),
            }),
            EntityKind::Workset => Self::Workset(Workset {
                name: row.string("Name"),
                kind: row.string("Kind"),
                is_open: row.bool("IsOpen"),
            }),
            EntityKind::Level => Self::Level(Level {
                name: row.string("Name"),
                elevation: row.float("Elevation"),
            }),
            EntityKind::Camera => Self::Camera(Camera {
                is_perspective: row.bool("IsPerspective"),
                vertical_extent: row.float("VerticalExtent"),
                horizontal_extent: row.float("HorizontalExtent"),
                near_distance: row.float("NearDistance"),
                far_distance: row.float("FarDistance"),
            }),
            EntityKind::Element => Self::Element(Element {
                id: row.int("Id"),
                unique_id: row.string("UniqueId"),
                name: row.string("Name"),
                category: row.reference(0),
                family: row.reference(1),
                level: row.reference(2),
                workset: row.reference(3),
            }),
            EntityKind::View => Self::View(View {
                title: row.string("Title"),
                view_type: row.string("ViewType"),
                camera: row.reference(0),
                element: row.reference(1),
            }),
            EntityKind::Parameter => Self::Parameter(Parameter {
                name: row.string("Name"),
                value: row.string("Value"),
                element: row.reference(0),
            }),
            EntityKind::Node => Self::Node(Node { element: row.reference(0) }),
        }
    }
}

/// One table row plus its resolved references.
///
/// Missing columns read as `None`, `0` or `false`.
pub struct Row<'a> {
    table: &'a Table,
    row: usize,
    references: &'a [Vec<Option<usize>>],
}

impl<'a> Row<'a> {
    /// `references[i][row]` is the resolved target of reference field `i`.
    pub fn new(table: &'a Table, row: usize, references: &'a [Vec<Option<usize>>]) -> Self {
        Self { table, row, references }
    }

    pub fn string(&self, column: &str) -> Option<String> {
        self.table.string(column, self.row).map(str::to_string)
    }

    pub fn int(&self, column: &str) -> i64 {
        self.table.int(column, self.row).unwrap_or(0)
    }

    pub fn float(&self, column: &str) -> f64 {
        self.table.float(column, self.row).unwrap_or(0.0)
    }

    pub fn bool(&self, column: &str) -> bool {
        self.table.bool(column, self.row).unwrap_or(false)
    }

    /// Resolved target of reference field `field`.
    pub fn reference(&self, field: usize) -> Option<usize> {
        self.references.get(field)?.get(self.row).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfast::test_util::ContainerBuilder;
    use crate::bfast::{Container, SourceBytes};
    use crate::table::TableReader;
    use std::sync::Arc;

    #[test]
    fn test_element_from_row() {
        let bytes = ContainerBuilder::new()
            .add("strings", b"Door 1\0")
            .add("table/Element/Id:int64", bytemuck::cast_slice(&[101i64, 102]))
            .add("table/Element/Name:string", bytemuck::cast_slice(&[0i32, -1]))
            .build();
        let c = Container::decode(Arc::new(SourceBytes::from_vec(bytes))).unwrap();
        let table = TableReader::new(&c).read_table("Element").unwrap();
        let refs = vec![vec![Some(4), None], vec![None, None]];

        let e = Entity::from_row(EntityKind::Element, &Row::new(&table, 0, &refs));
        assert_eq!(e.kind(), EntityKind::Element);
        assert_eq!(
            e,
            Entity::Element(Element {
                id: 101,
                name: Some("Door 1".into()),
                category: Some(4),
                ..Default::default()
            })
        );

        let Entity::Element(e) = Entity::from_row(EntityKind::Element, &Row::new(&table, 1, &refs)) else {
            panic!("wrong kind");
        };
        assert_eq!((e.id, e.name, e.category, e.level), (102, None, None, None));
    }
}
