//! Entity graph: the record kinds an import produces and how they map onto
//! container tables.
//!
//! Every kind reads one table named after it. References between kinds
//! are row indices into the target table, stored in a column
//! `<Field>:index:<Target>`; when that column is absent a
//! `<Field>.Name:string` column is matched against the target's `Name`
//! column instead.

mod records;

pub use records::*;

use std::fmt;

/// Kinds of entity, in import (dependency) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum EntityKind {
    Category,
    Family,
    Workset,
    Level,
    Camera,
    Element,
    View,
    Parameter,
    /// Geometry instance, attached to an element
    Node,
}

/// A foreign-key field of an entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    /// Column name (and name-reference prefix)
    pub field: &'static str,
    /// Kind whose table the field points into
    pub target: EntityKind,
}

const CATEGORY_REFS: &[Reference] = &[Reference { field: "Parent", target: EntityKind::Category }];
const FAMILY_REFS: &[Reference] = &[Reference { field: "Category", target: EntityKind::Category }];
const ELEMENT_REFS: &[Reference] = &[
    Reference { field: "Category", target: EntityKind::Category },
    Reference { field: "Family", target: EntityKind::Family },
    Reference { field: "Level", target: EntityKind::Level },
    Reference { field: "Workset", target: EntityKind::Workset },
];
const VIEW_REFS: &[Reference] = &[
    Reference { field: "Camera", target: EntityKind::Camera },
    Reference { field: "Element", target: EntityKind::Element },
];
const ELEMENT_OWNED_REFS: &[Reference] = &[Reference { field: "Element", target: EntityKind::Element }];

impl EntityKind {
    /// All kinds in the order they are imported. Every kind comes after
    /// the kinds it references (except self references).
    pub const IMPORT_ORDER: [EntityKind; 9] = [
        Self::Category,
        Self::Family,
        Self::Workset,
        Self::Level,
        Self::Camera,
        Self::Element,
        Self::View,
        Self::Parameter,
        Self::Node,
    ];

    /// Table holding this kind's rows.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Family => "Family",
            Self::Workset => "Workset",
            Self::Level => "Level",
            Self::Camera => "Camera",
            Self::Element => "Element",
            Self::View => "View",
            Self::Parameter => "Parameter",
            Self::Node => "Node",
        }
    }

    /// Kind stored in `table`, if any.
    pub fn from_table_name(table: &str) -> Option<Self> {
        Self::IMPORT_ORDER.into_iter().find(|k| k.table_name() == table)
    }

    /// Reference fields, in the order records receive them.
    pub const fn references(self) -> &'static [Reference] {
        match self {
            Self::Category => CATEGORY_REFS,
            Self::Family => FAMILY_REFS,
            Self::Workset | Self::Level | Self::Camera => &[],
            Self::Element => ELEMENT_REFS,
            Self::View => VIEW_REFS,
            Self::Parameter | Self::Node => ELEMENT_OWNED_REFS,
        }
    }

    /// Position of the kind in [`EntityKind::IMPORT_ORDER`].
    #[inline]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
