//! Named, non-owning views into a container arena.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::SourceBytes;

/// One named byte range of a container.
///
/// Cloning is cheap: the view holds the range and a shared reference to
/// the arena, never a copy of the bytes.
#[derive(Clone)]
pub struct NamedBuffer {
    name: Arc<str>,
    range: Range<u64>,
    source: Arc<SourceBytes>,
}

impl NamedBuffer {
    /// Create a view. `range` is absolute within `source` and must already
    /// be validated against its length.
    pub(crate) fn new(name: impl Into<Arc<str>>, range: Range<u64>, source: Arc<SourceBytes>) -> Self {
        debug_assert!(range.start <= range.end && range.end as usize <= source.as_slice().len());
        Self { name: name.into(), range, source }
    }

    /// Buffer name from the container directory.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute byte range within the arena.
    #[inline]
    pub fn range(&self) -> Range<u64> {
        self.range.clone()
    }

    /// Absolute start offset within the arena.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.range.start
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        (self.range.end - self.range.start) as usize
    }

    /// True for a zero-length buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.start == self.range.end
    }

    /// The bytes of this buffer, borrowed from the arena.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.source.as_slice()[self.range.start as usize..self.range.end as usize]
    }

    /// The shared arena this view points into.
    #[inline]
    pub fn source(&self) -> &Arc<SourceBytes> {
        &self.source
    }
}

impl fmt::Debug for NamedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedBuffer")
            .field("name", &self.name)
            .field("range", &self.range)
            .finish()
    }
}
