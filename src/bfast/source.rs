//! Byte arenas and random-access byte sources.
//!
//! A [`SourceBytes`] is the single long-lived allocation every
//! [`NamedBuffer`](super::NamedBuffer) points into: either a read-only
//! memory map or an owned vector. It is shared through `Arc` and freed
//! when the last view drops.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use parking_lot::Mutex;

/// Backing bytes of a decoded container.
pub struct SourceBytes {
    inner: SourceInner,
}

enum SourceInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Owned allocation (small files, in-memory fallbacks, tests)
    Owned(Vec<u8>),
}

impl SourceBytes {
    /// Open a local file, memory-mapping it when the `mmap` feature is on.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_file(&file)
    }

    /// Build an arena over an already opened file.
    pub fn from_file(file: &File) -> std::io::Result<Self> {
        let size = file.metadata()?.len();
        if size == 0 {
            return Ok(Self::from_vec(Vec::new()));
        }

        #[cfg(feature = "mmap")]
        {
            // Safety: mapped read-only; files handed to us are not modified while mapped
            let mmap = unsafe { Mmap::map(file) }?;
            Ok(Self { inner: SourceInner::Mmap(mmap) })
        }

        #[cfg(not(feature = "mmap"))]
        {
            let mut buf = Vec::with_capacity(size as usize);
            let mut f = file;
            f.read_to_end(&mut buf)?;
            Ok(Self::from_vec(buf))
        }
    }

    /// Wrap an owned buffer.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { inner: SourceInner::Owned(bytes) }
    }

    /// True when backed by a memory map rather than an owned allocation.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.inner, SourceInner::Mmap(_))
    }

    /// All bytes of the arena.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            SourceInner::Mmap(mmap) => mmap,
            SourceInner::Owned(bytes) => bytes,
        }
    }
}

impl Deref for SourceBytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for SourceBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBytes")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// Random-access byte source: a local file or bytes already in memory.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;

    /// True when the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_range(len: u64, offset: u64, wanted: usize) -> std::io::Result<()> {
    match offset.checked_add(wanted as u64) {
        Some(end) if end <= len => Ok(()),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("read of {wanted} bytes at {offset} past end of {len}-byte source"),
        )),
    }
}

impl ByteSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        check_range(ByteSource::len(self), offset, buf.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        ByteSource::read_at(self.as_slice(), offset, buf)
    }
}

impl ByteSource for SourceBytes {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        ByteSource::read_at(self.as_slice(), offset, buf)
    }
}

/// Buffered access to a local file through seek + read.
pub struct FileSource {
    file: Mutex<File>,
    size: u64,
}

impl FileSource {
    /// Open a file for random-access reads.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file: Mutex::new(file), size })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        check_range(self.size, offset, buf.len())?;
        let mut f = self.file.lock();
        f.seek(SeekFrom::Start(offset))?;
        f.read_exact(buf)
    }
}
