//! Import pipeline: container tables into an entity sink.
//!
//! ```text
//! Pending -> ReadingTables -> ResolvingReferences -> WritingEntities -> Finished
//!     \____________\_________________\______________________\________> Failed
//! ```
//!
//! Tables are read in parallel, references resolved one table at a time,
//! then rows written in fixed-size chunks, one sink transaction each.
//! Progress is published through a [`ProgressCell`] and optional
//! [`ImportEvent`] channel; cancellation is a shared flag checked between
//! chunks.

mod progress;
mod state;
mod sink;
mod resolve;
mod pipeline;

pub use progress::*;
pub use state::*;
pub use sink::*;
pub use resolve::*;
pub use pipeline::*;
