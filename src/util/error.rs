//! Error types for the vimkit library.
//!
//! Each stage has its own error enum so callers can match precisely;
//! [`Error`] wraps them all and classifies any failure into a
//! [`FailureKind`] for retry decisions.

use std::path::PathBuf;
use thiserror::Error;

use super::{DataType, ScalarType};

/// Container decoding failures. All of them mean the file is malformed
/// except [`DecodeError::Io`].
#[derive(Error, Debug)]
pub enum DecodeError {
    /// First eight bytes are not the BFast magic
    #[error("Invalid container: expected BFast magic bytes, found {0:02x?}")]
    BadMagic([u8; 8]),

    /// Container written by a newer format revision
    #[error("Unsupported container version: {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Preamble, directory or a data range runs past the end of the source
    #[error("Truncated container: {0}")]
    TruncatedContainer(String),

    /// I/O error while opening or mapping the source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Create a truncation error.
    pub fn truncated(msg: impl Into<String>) -> Self {
        Self::TruncatedContainer(msg.into())
    }
}

/// Geometry attribute failures.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// Byte length is not a whole number of elements
    #[error("Attribute '{name}': {byte_len} bytes is not a multiple of the {stride}-byte element size")]
    InconsistentAttributeSize {
        name: String,
        byte_len: usize,
        stride: usize,
    },

    /// Parts of one logical attribute disagree on element layout
    #[error("Attribute '{name}': expected {expected}, found {found}")]
    MismatchedDescriptor {
        name: String,
        expected: DataType,
        found: DataType,
    },

    /// A typed view was requested with a scalar type the data is not stored as
    #[error("Attribute '{name}' holds {stored}, requested {requested}")]
    ScalarMismatch {
        name: String,
        stored: ScalarType,
        requested: ScalarType,
    },

    /// Buffer name does not follow the attribute grammar
    #[error("Invalid attribute descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

/// Table reading failures.
#[derive(Error, Debug)]
pub enum TableError {
    /// A column's row count disagrees with the rest of its table
    #[error("Table '{table}': column '{column}' has {actual} rows, expected {expected}")]
    InconsistentRowCount {
        table: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Column data type is not one the reader understands
    #[error("Table '{table}': column '{column}' has unsupported type '{data_type}'")]
    UnsupportedColumnType {
        table: String,
        column: String,
        data_type: String,
    },

    /// A string column exists but the container carries no string pool
    #[error("Table '{table}': string column '{column}' but container has no string pool")]
    MissingStringPool { table: String, column: String },

    /// No buffers carry the table prefix
    #[error("Table not found: {0}")]
    NotFound(String),
}

/// Entity sink failure, as reported by the store.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    /// Create a sink error from a message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Import pipeline failures.
#[derive(Error, Debug)]
pub enum ImportError {
    /// A reference column points at a different table than the schema expects.
    ///
    /// Resolution stops at the first mismatch; `row` is the first row of
    /// the column that would have been resolved against the wrong table.
    #[error("Table '{table}': column '{column}' row {row} references '{actual}', expected '{expected}'")]
    ReferenceTypeMismatch {
        table: String,
        column: String,
        row: usize,
        expected: String,
        actual: String,
    },

    /// The entity sink rejected a chunk; earlier chunks stay committed
    #[error("Store write failed for '{table}' after {committed_units} committed rows: {source}")]
    StoreWriteFailed {
        table: String,
        committed_units: u64,
        #[source]
        source: SinkError,
    },

    /// The caller cancelled the import
    #[error("Import cancelled after {committed_units} committed rows")]
    Cancelled { committed_units: u64 },

    /// A table could not be read
    #[error(transparent)]
    Table(#[from] TableError),

    /// The worker pool or thread could not run
    #[error("Import worker failed: {0}")]
    Worker(String),

    /// A pipeline runs once; this one already left `Pending`
    #[error("Import pipeline already ran (stage {stage})")]
    AlreadyRun { stage: String },
}

/// Cache-file failures. Never fatal: the cache degrades to an in-memory copy.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Creating, writing or renaming the cache file failed
    #[error("Cache entry '{key}' at {path}: {source}")]
    Io {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No cache directory could be determined
    #[error("No cache directory available")]
    NoDirectory,
}

/// Coarse classification of a terminal failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The file itself is broken; retrying will not help
    MalformedSource,
    /// Reading or fetching bytes failed; a retry may succeed
    TransientIo,
    /// The caller asked to stop
    Cancelled,
    /// The entity store rejected a write
    StoreWrite,
}

impl FailureKind {
    /// Returns true if retrying the same operation may succeed.
    #[inline]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientIo | Self::StoreWrite)
    }
}

/// Main error type for vimkit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Settings file could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Classify this error for terminal state reporting.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::FileNotFound(_) | Self::Io(_) | Self::Cache(_) => FailureKind::TransientIo,
            Self::Decode(DecodeError::Io(_)) => FailureKind::TransientIo,
            Self::Decode(_) | Self::Assembly(_) | Self::Table(_) => FailureKind::MalformedSource,
            Self::Import(e) => match e {
                ImportError::Cancelled { .. } => FailureKind::Cancelled,
                ImportError::StoreWriteFailed { .. } => FailureKind::StoreWrite,
                ImportError::Worker(_) => FailureKind::TransientIo,
                ImportError::ReferenceTypeMismatch { .. }
                | ImportError::Table(_)
                | ImportError::AlreadyRun { .. } => {
                    FailureKind::MalformedSource
                }
            },
            Self::Settings(_) | Self::Other(_) => FailureKind::MalformedSource,
        }
    }
}

/// Result type alias for vimkit operations.
pub type Result<T> = std::result::Result<T, Error>;
