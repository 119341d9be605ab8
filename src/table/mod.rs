//! Columnar entity tables.
//!
//! A table is the set of container buffers named
//! `table/<Table>/<Column>:<type>`. Cells are read in place from the
//! container arena; string cells borrow from the shared string pool.

mod column;
mod strings;
mod reader;

pub use column::*;
pub use strings::*;
pub use reader::*;
