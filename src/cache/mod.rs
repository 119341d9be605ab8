//! Content-addressed, disk-backed byte range cache.
//!
//! A byte range of some source (a staged download, a large local file) is
//! copied once into `<dir>/<key>.bin` and memory-mapped from then on,
//! also across process restarts. Keys come from content identity, not
//! from the range, so the same logical file always lands on one entry.
//!
//! Caching is an optimization: if the cache file cannot be written or
//! mapped, [`ByteRangeCache::materialize`] logs and returns an in-memory
//! copy instead of failing.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::bfast::{ByteSource, SourceBytes};
use crate::util::{CacheError, Error, Result};

/// Bytes copied from the source per read while filling a cache entry.
const COPY_CHUNK: usize = 1 << 20;

/// Extension of committed cache entries.
const ENTRY_EXT: &str = "bin";

/// Generate a cache key from content (SHA-256, hex).
pub fn content_key(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Generate a cache key for a logical source.
///
/// With a known content digest (ETag, published hash) the key depends only
/// on that digest; otherwise it falls back to the source identifier.
pub fn key_for(source_id: &str, digest: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    match digest {
        Some(d) => {
            hasher.update(b"digest:");
            hasher.update(d.as_bytes());
        }
        None => {
            hasher.update(b"source:");
            hasher.update(source_id.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

/// Bytes handed out by the cache.
#[derive(Clone, Debug)]
pub struct CachedBytes {
    bytes: Arc<SourceBytes>,
    hit: bool,
}

impl CachedBytes {
    /// The bytes, borrowed.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// True when served from a mapped cache file (false for the in-memory fallback).
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.bytes.is_mapped()
    }

    /// True when the entry already existed and the source was not read.
    #[inline]
    pub fn was_hit(&self) -> bool {
        self.hit
    }

    /// The arena, ready for [`Container::decode`](crate::bfast::Container::decode).
    #[inline]
    pub fn into_source(self) -> Arc<SourceBytes> {
        self.bytes
    }
}

/// Counters for cache activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from an existing entry
    pub hits: u64,
    /// Requests that copied from the source
    pub misses: u64,
    /// Requests that fell back to an in-memory copy
    pub fallbacks: u64,
}

enum FillError {
    Source(std::io::Error),
    Cache(CacheError),
}

/// Disk-backed cache of byte ranges.
pub struct ByteRangeCache {
    dir: PathBuf,
    dir_ready: OnceLock<()>,
    /// One lock per key so concurrent requests never write the same entry twice.
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    tmp_counter: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    fallbacks: AtomicU64,
}

impl ByteRangeCache {
    /// Create a cache rooted at `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dir_ready: OnceLock::new(),
            key_locks: Mutex::new(HashMap::new()),
            tmp_counter: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Process-wide cache under the platform cache directory.
    pub fn global() -> &'static ByteRangeCache {
        static GLOBAL: OnceLock<ByteRangeCache> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(Self::default_dir()))
    }

    /// Default cache directory (`<cache dir>/vimkit`, or the temp dir).
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("vimkit")
    }

    /// Cache root.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXT}"))
    }

    /// True if an entry for `key` exists on disk.
    pub fn contains(&self, key: &str) -> bool {
        is_valid_key(key) && self.path_for(key).is_file()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Materialize `range` of `source` under `key`.
    ///
    /// The first call for a key copies exactly `range` into the cache and
    /// maps it; later calls map the existing entry without touching
    /// `source`. Only a failing read of `source` is an error.
    #[tracing::instrument(skip(self, source, range))]
    pub fn materialize(
        &self,
        source: &dyn ByteSource,
        source_id: &str,
        range: Range<u64>,
        key: &str,
    ) -> Result<CachedBytes> {
        if range.start > range.end || range.end > source.len() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("range {range:?} outside {}-byte source", source.len()),
            )));
        }
        let expected = range.end - range.start;

        if !is_valid_key(key) {
            tracing::warn!(key, "cache key is not a plain file name, using in-memory copy");
            return self.fallback(source, range);
        }

        self.with_key_lock(key, || {
            let path = self.path_for(key);
            if let Some(hit) = self.map_hit(key, &path, Some(expected)) {
                return Ok(hit);
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            match self.fill(source, range.clone(), key, &path) {
                Ok(()) => match map_entry(&path, Some(expected)) {
                    Ok(bytes) => {
                        tracing::debug!(key, bytes = expected, "cached range");
                        Ok(CachedBytes { bytes: Arc::new(bytes), hit: false })
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "cache entry written but not mappable");
                        self.fallback(source, range)
                    }
                },
                Err(FillError::Source(e)) => Err(Error::Io(e)),
                Err(FillError::Cache(e)) => {
                    tracing::warn!(error = %e, "cache write failed, using in-memory copy");
                    self.fallback(source, range)
                }
            }
        })
    }

    /// Existing entry for `key`, mapped, without any source.
    ///
    /// Counts as a hit when found. An unreadable entry is removed and
    /// reported as absent.
    pub fn lookup(&self, key: &str) -> Option<CachedBytes> {
        if !is_valid_key(key) {
            return None;
        }
        self.with_key_lock(key, || self.map_hit(key, &self.path_for(key), None))
    }

    /// Map the committed entry at `path`; the caller holds the key lock.
    fn map_hit(&self, key: &str, path: &Path, expected: Option<u64>) -> Option<CachedBytes> {
        if !path.is_file() {
            return None;
        }
        match map_entry(path, expected) {
            Ok(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "cache hit");
                Some(CachedBytes { bytes: Arc::new(bytes), hit: true })
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cache entry");
                let _ = fs::remove_file(path);
                None
            }
        }
    }

    /// Run `f` holding the lock for `key`. The lock is dropped from the
    /// table once no other request holds it.
    fn with_key_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.key_locks.lock();
            locks.entry(key.to_string()).or_default().clone()
        };
        let result = {
            let _guard = lock.lock();
            f()
        };
        let mut locks = self.key_locks.lock();
        // One reference in the table, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }

    fn ensure_dir(&self) -> std::result::Result<(), CacheError> {
        if self.dir_ready.get().is_some() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            key: String::new(),
            path: self.dir.clone(),
            source,
        })?;
        let _ = self.dir_ready.set(());
        Ok(())
    }

    /// Copy the range into a temporary file and rename it into place.
    fn fill(
        &self,
        source: &dyn ByteSource,
        range: Range<u64>,
        key: &str,
        path: &Path,
    ) -> std::result::Result<(), FillError> {
        self.ensure_dir().map_err(FillError::Cache)?;

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!("{key}.{ENTRY_EXT}.tmp.{}.{n}", std::process::id()));
        let cache_err = |source: std::io::Error| {
            FillError::Cache(CacheError::Io {
                key: key.to_string(),
                path: tmp.clone(),
                source,
            })
        };

        let result = (|| {
            let mut file = File::create(&tmp).map_err(cache_err)?;
            let mut buf = vec![0u8; COPY_CHUNK.min((range.end - range.start) as usize)];
            let mut pos = range.start;
            while pos < range.end {
                let n = COPY_CHUNK.min((range.end - pos) as usize);
                source.read_at(pos, &mut buf[..n]).map_err(FillError::Source)?;
                file.write_all(&buf[..n]).map_err(cache_err)?;
                pos += n as u64;
            }
            file.sync_all().map_err(cache_err)?;
            fs::rename(&tmp, path).map_err(cache_err)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn fallback(&self, source: &dyn ByteSource, range: Range<u64>) -> Result<CachedBytes> {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        let mut buf = vec![0u8; (range.end - range.start) as usize];
        source.read_at(range.start, &mut buf)?;
        Ok(CachedBytes { bytes: Arc::new(SourceBytes::from_vec(buf)), hit: false })
    }
}

impl std::fmt::Debug for ByteRangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteRangeCache")
            .field("dir", &self.dir)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Keys become file names; anything that could escape the directory is refused.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn map_entry(path: &Path, expected: Option<u64>) -> std::io::Result<SourceBytes> {
    let bytes = SourceBytes::open(path)?;
    let len = bytes.as_slice().len() as u64;
    if let Some(expected) = expected.filter(|&e| e != len) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("entry holds {len} bytes, expected {expected}"),
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Source that counts how many reads reach it.
    struct CountingSource {
        data: Vec<u8>,
        reads: AtomicUsize,
    }

    impl CountingSource {
        fn new(data: Vec<u8>) -> Self {
            Self { data, reads: AtomicUsize::new(0) }
        }
    }

    impl ByteSource for CountingSource {
        fn len(&self) -> u64 {
            self.data.len() as u64
        }

        fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.data.read_at(offset, buf)
        }
    }

    #[test]
    fn test_second_materialize_does_not_touch_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ByteRangeCache::new(dir.path().join("cache"));
        let source = CountingSource::new((0..=255u8).cycle().take(5000).collect());
        let key = key_for("file://model.vim", Some("abc123"));

        let first = cache.materialize(&source, "model.vim", 100..4100, &key).unwrap();
        let reads_after_first = source.reads.load(Ordering::SeqCst);
        assert!(reads_after_first > 0);
        assert!(!first.was_hit());

        let second = cache.materialize(&source, "model.vim", 100..4100, &key).unwrap();
        assert!(second.was_hit());
        assert_eq!(source.reads.load(Ordering::SeqCst), reads_after_first);
        assert_eq!(first.as_slice(), second.as_slice());
        assert_eq!(first.as_slice(), &source.data[100..4100]);
        assert_eq!(second.is_mapped(), cfg!(feature = "mmap"));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.fallbacks), (1, 1, 0));
    }

    #[test]
    fn test_lookup_and_key_locks_released() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ByteRangeCache::new(dir.path());
        let source = vec![9u8; 32];
        let key = content_key(&source);

        assert!(cache.lookup(&key).is_none());
        cache.materialize(&source, "mem", 0..32, &key).unwrap();

        let hit = cache.lookup(&key).unwrap();
        assert!(hit.was_hit());
        assert_eq!(hit.as_slice(), &source[..]);
        assert_eq!(cache.stats().hits, 1);
        assert!(cache.lookup("../escape").is_none());
        assert!(cache.key_locks.lock().is_empty());
    }

    #[test]
    fn test_entry_survives_new_cache_instance() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::new(vec![7u8; 64]);
        let key = content_key(&source.data);

        ByteRangeCache::new(dir.path()).materialize(&source, "a", 0..64, &key).unwrap();
        let reads = source.reads.load(Ordering::SeqCst);

        let cache = ByteRangeCache::new(dir.path());
        assert!(cache.contains(&key));
        let again = cache.materialize(&source, "a", 0..64, &key).unwrap();
        assert!(again.was_hit());
        assert_eq!(source.reads.load(Ordering::SeqCst), reads);
    }

    #[test]
    fn test_unwritable_dir_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();
        let cache = ByteRangeCache::new(blocker.join("cache"));

        let source = vec![1u8, 2, 3, 4, 5, 6];
        let bytes = cache.materialize(&source, "mem", 2..5, "somekey").unwrap();
        assert_eq!(bytes.as_slice(), &[3, 4, 5]);
        assert!(!bytes.is_mapped());
        assert_eq!(cache.stats().fallbacks, 1);
    }

    #[test]
    fn test_bad_key_and_bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ByteRangeCache::new(dir.path());
        let source = vec![0u8; 8];

        let bytes = cache.materialize(&source, "x", 0..8, "../escape").unwrap();
        assert!(!bytes.is_mapped());
        assert!(cache.materialize(&source, "x", 4..16, "k").is_err());
    }

    #[test]
    fn test_concurrent_same_key_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ByteRangeCache::new(dir.path()));
        let source = Arc::new(CountingSource::new(vec![42u8; 10_000]));
        let key = key_for("shared", None);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let source = source.clone();
                let key = key.clone();
                std::thread::spawn(move || {
                    cache.materialize(source.as_ref(), "shared", 0..10_000, &key).unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().as_slice().len(), 10_000);
        }

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
    }

    #[test]
    fn test_keys() {
        assert_eq!(content_key(b"abc").len(), 64);
        assert_eq!(key_for("a", Some("d")), key_for("b", Some("d")));
        assert_ne!(key_for("a", None), key_for("b", None));
    }
}
