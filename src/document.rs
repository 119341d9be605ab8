//! Loading a model file into geometry and tables.
//!
//! A [`Document`] drives the load state machine:
//!
//! ```text
//! Initializing -> [Downloading] -> Loading -> Ready
//!        \______________\______________\____> Error
//! ```
//!
//! Local files are memory-mapped directly. Remote files are fetched once
//! into the byte-range cache and mapped from there on every later load.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::bfast::{ByteSource, Container, FileSource, SourceBytes, ENTITIES_BUFFER, GEOMETRY_BUFFER};
use crate::cache::{key_for, ByteRangeCache};
use crate::config::Settings;
use crate::geometry::Geometry;
use crate::import::{EntitySink, ImportFailure, ImportHandle, ImportOptions, ImportPipeline, ImportState, ImportSummary};
use crate::table::TableReader;
use crate::util::{Error, Result};

/// Where a document comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentSource {
    Local(PathBuf),
    /// A URL plus, when known, a content digest used as the cache identity
    Remote { url: String, digest: Option<String> },
}

impl DocumentSource {
    /// Identifier used in logs and as the fallback cache identity.
    pub fn id(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote { url, .. } => url.clone(),
        }
    }
}

/// Stages remote files to local disk.
pub trait Fetch: Send + Sync {
    /// Download `url` into the file `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> std::io::Result<()>;
}

/// A loaded (or loading) model file.
pub struct Document {
    source: DocumentSource,
    state: ImportState,
    container: Option<Container>,
    geometry: Option<Geometry>,
    tables: Option<TableReader>,
    events: Option<Sender<ImportState>>,
}

impl Document {
    pub fn new(source: DocumentSource) -> Self {
        Self {
            source,
            state: ImportState::Initializing,
            container: None,
            geometry: None,
            tables: None,
            events: None,
        }
    }

    /// Send every state change to `tx`.
    pub fn with_events(mut self, tx: Sender<ImportState>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Open a local file and load it immediately.
    pub fn open(path: impl AsRef<Path>, settings: &Settings) -> Result<Self> {
        let mut doc = Self::new(DocumentSource::Local(path.as_ref().to_path_buf()));
        doc.load(settings, &ByteRangeCache::new(settings.cache_dir()), None)?;
        Ok(doc)
    }

    #[inline]
    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    #[inline]
    pub fn state(&self) -> &ImportState {
        &self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ImportState::Ready
    }

    /// The decoded top-level container, once loaded.
    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn tables(&self) -> Option<&TableReader> {
        self.tables.as_ref()
    }

    /// Run the load to a terminal state.
    ///
    /// On failure the state becomes `Error` carrying the failure kind and
    /// the error is also returned.
    #[tracing::instrument(skip_all)]
    pub fn load(&mut self, settings: &Settings, cache: &ByteRangeCache, fetch: Option<&dyn Fetch>) -> Result<()> {
        tracing::debug!(source = %self.source.id(), "loading document");
        if self.state.is_terminal() {
            return Err(Error::other("document already loaded"));
        }
        match self.try_load(settings, cache, fetch) {
            Ok(()) => {
                self.set_state(ImportState::Ready);
                tracing::info!("document ready");
                Ok(())
            }
            Err(err) => {
                self.set_state(ImportState::Error(ImportFailure::from(&err)));
                tracing::warn!(error = %err, "document failed to load");
                Err(err)
            }
        }
    }

    fn try_load(&mut self, settings: &Settings, cache: &ByteRangeCache, fetch: Option<&dyn Fetch>) -> Result<()> {
        let container = match self.source.clone() {
            DocumentSource::Local(path) => {
                self.set_state(ImportState::Loading);
                Container::open(&path)?
            }
            DocumentSource::Remote { url, digest } => {
                let bytes = self.stage_remote(&url, digest.as_deref(), cache, fetch)?;
                self.set_state(ImportState::Loading);
                Container::decode(bytes)?
            }
        };

        let geometry_container = container.nested(GEOMETRY_BUFFER)?.unwrap_or_else(|| container.clone());
        let entities_container = container.nested(ENTITIES_BUFFER)?.unwrap_or_else(|| container.clone());

        self.geometry = Some(Geometry::from_container(&geometry_container, settings.min_zero_copy_bytes)?);
        self.tables = Some(TableReader::new(&entities_container));
        self.container = Some(container);
        Ok(())
    }

    /// Cached bytes of a remote file, fetching it on a cache miss.
    fn stage_remote(
        &mut self,
        url: &str,
        digest: Option<&str>,
        cache: &ByteRangeCache,
        fetch: Option<&dyn Fetch>,
    ) -> Result<Arc<SourceBytes>> {
        let key = key_for(url, digest);
        if let Some(cached) = cache.lookup(&key) {
            tracing::debug!(key, "remote file already cached");
            return Ok(cached.into_source());
        }

        let fetch = fetch.ok_or_else(|| Error::other(format!("no fetcher for remote source {url}")))?;
        self.set_state(ImportState::Downloading);

        // Staged outside the cache so an unusable cache dir only costs the mapping.
        let staged = tempfile::Builder::new().prefix("vimkit-").suffix(".part").tempfile()?;
        fetch.fetch(url, staged.path())?;
        let file = FileSource::open(staged.path())?;
        let len = file.len();
        Ok(cache.materialize(&file, url, 0..len, &key)?.into_source())
    }

    /// Import the document's tables into `sink` on this thread.
    pub fn import(&self, options: ImportOptions, sink: &mut dyn EntitySink, cancel: &AtomicBool) -> Result<ImportSummary> {
        let tables = self.ready_tables()?;
        Ok(ImportPipeline::new(options).run(tables, sink, cancel)?)
    }

    /// Import the document's tables into `sink` on a background thread.
    pub fn spawn_import<S: EntitySink + 'static>(&self, options: ImportOptions, sink: S) -> Result<ImportHandle<S>> {
        let tables = self.ready_tables()?.clone();
        Ok(ImportPipeline::new(options).spawn(tables, sink)?)
    }

    fn ready_tables(&self) -> Result<&TableReader> {
        match (&self.state, &self.tables) {
            (ImportState::Ready, Some(tables)) => Ok(tables),
            (state, _) => Err(Error::other(format!("document not ready ({state:?})"))),
        }
    }

    fn set_state(&mut self, next: ImportState) {
        if self.state.transition(next.clone()) {
            if let Some(tx) = &self.events {
                let _ = tx.send(next);
            }
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("source", &self.source)
            .field("state", &self.state)
            .field("buffers", &self.container.as_ref().map(Container::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfast::test_util::ContainerBuilder;
    use crate::import::MemoryStore;
    use crate::util::FailureKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;

    struct StaticFetch {
        bytes: Vec<u8>,
        calls: AtomicUsize,
    }

    impl Fetch for StaticFetch {
        fn fetch(&self, _url: &str, dest: &Path) -> std::io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(dest, &self.bytes)
        }
    }

    struct FailingFetch;

    impl Fetch for FailingFetch {
        fn fetch(&self, _url: &str, _dest: &Path) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn model() -> Vec<u8> {
        let geometry = ContainerBuilder::new()
            .add("vertex:position:0:float32:3", bytemuck::cast_slice(&[0.0f32, 1.0, 2.0]))
            .build();
        let entities = ContainerBuilder::new()
            .add("strings", b"Level 1\0")
            .add("table/Level/Name:string", bytemuck::cast_slice(&[0i32]))
            .build();
        ContainerBuilder::new()
            .add("geometry", &geometry)
            .add("entities", &entities)
            .build()
    }

    #[test]
    fn test_local_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.vim");
        std::fs::write(&path, model()).unwrap();

        let (tx, rx) = channel();
        let mut doc = Document::new(DocumentSource::Local(path)).with_events(tx);
        let settings = Settings::default();
        doc.load(&settings, &ByteRangeCache::new(dir.path().join("cache")), None).unwrap();

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ImportState::Loading, ImportState::Ready]);
        assert_eq!(doc.geometry().unwrap().attributes().len(), 1);
        assert_eq!(doc.tables().unwrap().table_names().collect::<Vec<_>>(), ["Level"]);

        let mut store = MemoryStore::new();
        let summary = doc.import(ImportOptions::default(), &mut store, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.progress.completed_units, 1);
    }

    #[test]
    fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new(DocumentSource::Local(dir.path().join("missing.vim")));
        let err = doc
            .load(&Settings::default(), &ByteRangeCache::new(dir.path()), None)
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        let failure = doc.state().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::TransientIo);
        assert!(doc.import(ImportOptions::default(), &mut MemoryStore::new(), &AtomicBool::new(false)).is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.vim");
        std::fs::write(&path, b"NOTBFAST\x01\0\0\0\0\0\0\0").unwrap();
        let mut doc = Document::new(DocumentSource::Local(path));
        assert!(doc.load(&Settings::default(), &ByteRangeCache::new(dir.path()), None).is_err());
        assert_eq!(doc.state().failure().unwrap().kind, FailureKind::MalformedSource);
        assert!(!doc.state().failure().unwrap().is_retryable());
    }

    #[test]
    fn test_remote_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ByteRangeCache::new(dir.path());
        let fetch = StaticFetch { bytes: model(), calls: AtomicUsize::new(0) };
        let source = DocumentSource::Remote {
            url: "https://example.invalid/model.vim".into(),
            digest: Some("abc123".into()),
        };

        let (tx, rx) = channel();
        let mut first = Document::new(source.clone()).with_events(tx);
        first.load(&Settings::default(), &cache, Some(&fetch)).unwrap();
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![ImportState::Downloading, ImportState::Loading, ImportState::Ready]
        );

        let mut second = Document::new(source);
        second.load(&Settings::default(), &cache, Some(&fetch)).unwrap();
        assert!(second.is_ready());
        assert_eq!(fetch.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            second.container().unwrap().source().as_slice(),
            first.container().unwrap().source().as_slice()
        );
    }

    #[test]
    fn test_remote_fetch_failure_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new(DocumentSource::Remote { url: "https://example.invalid/x.vim".into(), digest: None });
        assert!(doc.load(&Settings::default(), &ByteRangeCache::new(dir.path()), Some(&FailingFetch)).is_err());
        let failure = doc.state().failure().unwrap();
        assert!(failure.is_retryable());
    }

    #[test]
    fn test_remote_load_with_unusable_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let cache = ByteRangeCache::new(blocker.join("cache"));
        let fetch = StaticFetch { bytes: model(), calls: AtomicUsize::new(0) };

        let mut doc = Document::new(DocumentSource::Remote { url: "https://example.invalid/m.vim".into(), digest: None });
        doc.load(&Settings::default(), &cache, Some(&fetch)).unwrap();

        assert!(doc.is_ready());
        assert!(!doc.container().unwrap().source().is_mapped());
        assert_eq!(doc.tables().unwrap().table_names().collect::<Vec<_>>(), ["Level"]);
        assert_eq!(cache.stats().fallbacks, 1);
    }
}
