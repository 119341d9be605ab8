//! Container string pool.

use crate::bfast::NamedBuffer;

/// NUL-separated UTF-8 strings, indexed once.
///
/// Rows of string columns resolve to slices of the pool buffer; no string
/// is copied.
#[derive(Clone, Debug)]
pub struct StringPool {
    buffer: NamedBuffer,
    spans: Vec<(u32, u32)>,
}

impl StringPool {
    /// Index the strings of `buffer`. A trailing string without a NUL still counts.
    pub fn new(buffer: NamedBuffer) -> Self {
        let bytes = buffer.bytes();
        let mut spans = Vec::new();
        let mut start = 0usize;
        for pos in nul_positions(bytes) {
            spans.push((start as u32, pos as u32));
            start = pos + 1;
        }
        if start < bytes.len() {
            spans.push((start as u32, bytes.len() as u32));
        }
        Self { buffer, spans }
    }

    /// Number of strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// String `index`; `None` if out of range, negative or not UTF-8.
    pub fn get(&self, index: i64) -> Option<&str> {
        let i = usize::try_from(index).ok()?;
        let &(start, end) = self.spans.get(i)?;
        std::str::from_utf8(&self.buffer.bytes()[start as usize..end as usize]).ok()
    }
}

fn nul_positions(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes.iter().enumerate().filter(|(_, &b)| b == 0).map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfast::test_util::ContainerBuilder;
    use crate::bfast::{Container, SourceBytes};
    use std::sync::Arc;

    fn pool(data: &[u8]) -> StringPool {
        let bytes = ContainerBuilder::new().add("strings", data).build();
        let c = Container::decode(Arc::new(SourceBytes::from_vec(bytes))).unwrap();
        StringPool::new(c.get("strings").unwrap().clone())
    }

    #[test]
    fn test_pool_lookup() {
        let p = pool(b"Doors\0\0Walls\0tail");
        assert_eq!(p.len(), 4);
        assert_eq!(p.get(0), Some("Doors"));
        assert_eq!(p.get(1), Some(""));
        assert_eq!(p.get(2), Some("Walls"));
        assert_eq!(p.get(3), Some("tail"));
        assert_eq!(p.get(4), None);
        assert_eq!(p.get(-1), None);
    }

    #[test]
    fn test_pool_slices_do_not_copy() {
        let p = pool(b"abc\0def\0");
        let base = p.buffer.bytes().as_ptr();
        assert_eq!(p.get(1).unwrap().as_ptr(), base.wrapping_add(4));
    }

    #[test]
    fn test_invalid_utf8() {
        let p = pool(b"\xff\xfe\0ok\0");
        assert_eq!(p.get(0), None);
        assert_eq!(p.get(1), Some("ok"));
    }
}
