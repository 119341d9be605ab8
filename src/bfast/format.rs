//! BFast container constants.

/// Magic bytes at the start of every container.
pub const BFAST_MAGIC: &[u8; 8] = b"BFAST\0\0\x01";

/// Size of the fixed preamble: magic, version, entry count.
pub const PREAMBLE_SIZE: usize = 16;

/// Offset of the version (u32 LE) in the preamble.
pub const VERSION_OFFSET: usize = 8;

/// Offset of the entry count (u32 LE) in the preamble.
pub const COUNT_OFFSET: usize = 12;

/// Newest container version this decoder understands.
pub const CURRENT_VERSION: u32 = 1;

/// Fixed bytes per directory record, excluding the name itself:
/// name length (u32) + data start (u64) + data end (u64).
pub const ENTRY_FIXED_SIZE: usize = 4 + 8 + 8;

/// Name of the buffer holding the NUL-separated string pool.
pub const STRINGS_BUFFER: &str = "strings";

/// Name of the nested container holding geometry attributes.
pub const GEOMETRY_BUFFER: &str = "geometry";

/// Name of the nested container holding entity tables.
pub const ENTITIES_BUFFER: &str = "entities";
