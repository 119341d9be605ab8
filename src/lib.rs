//! # vimkit
//!
//! Reader for BFast scene containers as used by building-model viewers.
//!
//! A container is a directory of named byte ranges over one arena (a
//! memory-mapped file or a cached download). From it this crate produces
//! renderer-ready geometry buffers, without copying where possible, and
//! imports the entity tables (elements, families, categories, levels, ...)
//! into an external store with progress reporting and cancellation.
//!
//! ## Modules
//!
//! - [`bfast`] - Container decoding and the shared byte arena
//! - [`geometry`] - Attribute descriptors and buffer assembly
//! - [`cache`] - Disk-backed, content-addressed byte range cache
//! - [`table`] - Columnar entity tables and the string pool
//! - [`entity`] - Entity kinds, records and their table schema
//! - [`import`] - Chunked import pipeline, load states, entity sinks
//! - [`tree`] - Name hierarchies with aggregated id sets
//! - [`document`] - Local/remote loading orchestration
//! - [`config`] - Persistent settings
//! - [`util`] - Scalar types, data types, bounds, errors
//!
//! ## Example
//!
//! ```ignore
//! use vimkit::prelude::*;
//!
//! let doc = Document::open("model.vim", &Settings::load_default())?;
//! let positions = doc.geometry().unwrap().positions()?;
//!
//! let mut store = MemoryStore::new();
//! doc.import(ImportOptions::default(), &mut store, &AtomicBool::new(false))?;
//! let tree = Tree::by_category(&store);
//! ```

pub mod util;
pub mod bfast;
pub mod geometry;
pub mod cache;
pub mod table;
pub mod entity;
pub mod import;
pub mod tree;
pub mod document;
pub mod config;

// Re-export commonly used types
pub use util::{DataType, ScalarType, Error, Result};
pub use bfast::Container;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::atomic::AtomicBool;

    pub use crate::util::{Bounds3f, DataType, Error, FailureKind, Result, ScalarType};
    pub use crate::bfast::{Container, NamedBuffer, SourceBytes};
    pub use crate::geometry::{AttributeBuffer, Geometry};
    pub use crate::cache::ByteRangeCache;
    pub use crate::table::{Table, TableReader};
    pub use crate::entity::{Entity, EntityKind};
    pub use crate::import::{
        EntitySink, ImportOptions, ImportPipeline, ImportProgress, ImportState, MemoryStore,
    };
    pub use crate::tree::Tree;
    pub use crate::document::{Document, DocumentSource};
    pub use crate::config::Settings;
}
