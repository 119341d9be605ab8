//! BFast container decoder.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};

use super::format::*;
use super::{NamedBuffer, SourceBytes};
use crate::util::{DecodeError, Error, Result};

/// One directory record as stored in the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Buffer name
    pub name: String,
    /// Start offset, relative to the container start
    pub start: u64,
    /// End offset (exclusive), relative to the container start
    pub end: u64,
}

/// Decoded preamble and directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Magic bytes (always [`BFAST_MAGIC`] once decoded)
    pub magic: [u8; 8],
    /// Format version
    pub version: u32,
    /// Directory records in file order
    pub entries: Vec<DirectoryEntry>,
}

impl ContainerHeader {
    /// Number of sub-buffers.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Parse and validate a preamble + directory against `data`.
    ///
    /// Every entry is checked before the header is returned, so a caller
    /// never sees a partially valid directory.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, DecodeError> {
        if data.len() < PREAMBLE_SIZE {
            return Err(DecodeError::truncated(format!(
                "{} bytes is shorter than the {PREAMBLE_SIZE}-byte preamble",
                data.len()
            )));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[..8]);
        if &magic != BFAST_MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }

        let mut rd = &data[VERSION_OFFSET..PREAMBLE_SIZE];
        let version = rd.read_u32::<LittleEndian>()?;
        if version > CURRENT_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: version,
                supported: CURRENT_VERSION,
            });
        }
        let count = rd.read_u32::<LittleEndian>()? as usize;

        let total = data.len() as u64;
        let mut rd = &data[PREAMBLE_SIZE..];
        // Guards the allocation below against absurd counts in corrupt files.
        if count.saturating_mul(ENTRY_FIXED_SIZE) > rd.len() {
            return Err(DecodeError::truncated(format!(
                "directory of {count} entries does not fit in {total} bytes"
            )));
        }

        let mut raw = Vec::with_capacity(count);
        for i in 0..count {
            let truncated = |_| DecodeError::truncated(format!("directory entry {i} is cut short"));
            let name_len = rd.read_u32::<LittleEndian>().map_err(truncated)? as usize;
            if name_len > rd.len() {
                return Err(DecodeError::truncated(format!("directory entry {i}: name runs past end")));
            }
            let (name_bytes, rest) = rd.split_at(name_len);
            rd = rest;
            let start = rd.read_u64::<LittleEndian>().map_err(truncated)?;
            let end = rd.read_u64::<LittleEndian>().map_err(truncated)?;
            let name = std::str::from_utf8(name_bytes)
                .map_err(|_| DecodeError::truncated(format!("directory entry {i}: name is not UTF-8")))?
                .to_string();
            raw.push(DirectoryEntry { name, start, end });
        }

        let directory_end = total - rd.len() as u64;
        let mut prev_end = directory_end;
        for (i, e) in raw.iter().enumerate() {
            if e.start > e.end {
                return Err(DecodeError::truncated(format!(
                    "entry {i} '{}': start {} after end {}",
                    e.name, e.start, e.end
                )));
            }
            if e.end > total {
                return Err(DecodeError::truncated(format!(
                    "entry {i} '{}': end {} past container length {total}",
                    e.name, e.end
                )));
            }
            if e.start < prev_end {
                return Err(DecodeError::truncated(format!(
                    "entry {i} '{}': start {} overlaps previous data ending at {prev_end}",
                    e.name, e.start
                )));
            }
            prev_end = e.end;
        }

        Ok(Self { magic, version, entries: raw })
    }
}

/// A decoded container: an ordered directory of named views.
#[derive(Clone)]
pub struct Container {
    source: Arc<SourceBytes>,
    base: u64,
    len: u64,
    version: u32,
    buffers: Vec<NamedBuffer>,
    by_name: HashMap<Arc<str>, usize>,
}

impl Container {
    /// Open and decode a local file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening container");
        let source = SourceBytes::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self::decode(Arc::new(source))?)
    }

    /// Decode a container spanning the whole arena.
    pub fn decode(source: Arc<SourceBytes>) -> std::result::Result<Self, DecodeError> {
        let len = source.as_slice().len() as u64;
        Self::decode_range(source, 0..len)
    }

    /// Decode a container occupying `range` of the arena.
    fn decode_range(source: Arc<SourceBytes>, range: Range<u64>) -> std::result::Result<Self, DecodeError> {
        let data = &source.as_slice()[range.start as usize..range.end as usize];
        let header = ContainerHeader::parse(data)?;

        let base = range.start;
        let mut buffers = Vec::with_capacity(header.entries.len());
        let mut by_name = HashMap::with_capacity(header.entries.len());
        for entry in header.entries {
            let name: Arc<str> = entry.name.into();
            // First entry wins on duplicate names; later ones stay reachable by position.
            by_name.entry(name.clone()).or_insert(buffers.len());
            buffers.push(NamedBuffer::new(
                name,
                base + entry.start..base + entry.end,
                source.clone(),
            ));
        }

        tracing::debug!(
            entries = buffers.len(),
            version = header.version,
            bytes = range.end - range.start,
            "decoded container"
        );

        Ok(Self {
            source,
            base,
            len: range.end - range.start,
            version: header.version,
            buffers,
            by_name,
        })
    }

    /// Decode the sub-buffer `name` as a nested container over the same arena.
    ///
    /// Returns `Ok(None)` when no such buffer exists.
    pub fn nested(&self, name: &str) -> std::result::Result<Option<Container>, DecodeError> {
        match self.get(name) {
            Some(buf) => Self::decode_range(self.source.clone(), buf.range()).map(Some),
            None => Ok(None),
        }
    }

    /// Format version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Total bytes covered by this container.
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.len
    }

    /// Number of sub-buffers.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// True if the directory is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// All sub-buffers in directory order.
    #[inline]
    pub fn buffers(&self) -> &[NamedBuffer] {
        &self.buffers
    }

    /// Look up a sub-buffer by name.
    pub fn get(&self, name: &str) -> Option<&NamedBuffer> {
        self.by_name.get(name).map(|&i| &self.buffers[i])
    }

    /// Sub-buffer names in directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.buffers.iter().map(NamedBuffer::name)
    }

    /// The shared arena.
    #[inline]
    pub fn source(&self) -> &Arc<SourceBytes> {
        &self.source
    }

    /// Rebuild the header with offsets relative to this container.
    pub fn header(&self) -> ContainerHeader {
        ContainerHeader {
            magic: *BFAST_MAGIC,
            version: self.version,
            entries: self
                .buffers
                .iter()
                .map(|b| DirectoryEntry {
                    name: b.name().to_string(),
                    start: b.range().start - self.base,
                    end: b.range().end - self.base,
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("version", &self.version)
            .field("entries", &self.buffers.len())
            .field("bytes", &self.len)
            .finish()
    }
}
