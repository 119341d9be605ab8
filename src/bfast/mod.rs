//! BFast container format: a flat directory of named byte ranges.
//!
//! ## File Structure
//!
//! ```text
//! +----------------------------+
//! | Magic: "BFAST\0\0\x01"     |  8 bytes
//! +----------------------------+
//! | Version                    |  4 bytes (u32 LE)
//! +----------------------------+
//! | Entry count                |  4 bytes (u32 LE)
//! +----------------------------+
//! | Directory, per entry:      |
//! |   name length              |  4 bytes (u32 LE)
//! |   name                     |  UTF-8
//! |   data start               |  8 bytes (u64 LE)
//! |   data end                 |  8 bytes (u64 LE)
//! +----------------------------+
//! | ... Data (may be padded)   |
//! +----------------------------+
//! ```
//!
//! A sub-buffer may itself be a container (see [`Container::nested`]).

mod format;
mod source;
mod buffer;
mod reader;

#[cfg(test)]
pub(crate) mod test_util;

pub use format::*;
pub use source::*;
pub use buffer::*;
pub use reader::*;
