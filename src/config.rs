//! Persistent settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::ByteRangeCache;
use crate::geometry::DEFAULT_MIN_ZERO_COPY_BYTES;
use crate::import::{default_workers, ImportOptions, DEFAULT_CHUNK_SIZE};
use crate::util::Result;

/// Library and CLI settings, stored as JSON.
///
/// Missing fields take their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cache root; the platform cache directory when unset
    pub cache_dir: Option<PathBuf>,
    /// Single attribute buffers at least this large are handed out without copying
    pub min_zero_copy_bytes: usize,
    /// Rows per sink transaction
    pub chunk_size: usize,
    /// Table-reading threads
    pub max_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            min_zero_copy_bytes: DEFAULT_MIN_ZERO_COPY_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: default_workers(),
        }
    }
}

impl Settings {
    /// `<config dir>/vimkit/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vimkit").join("settings.json"))
    }

    /// Load settings from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load from the default path. A missing file gives the defaults; an
    /// unreadable one is logged and also gives the defaults.
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.is_file() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring settings file");
            Self::default()
        })
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Import options from these settings.
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            chunk_size: self.chunk_size.max(1),
            max_workers: self.max_workers.max(1),
        }
    }

    /// Cache directory these settings select.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(ByteRangeCache::default_dir)
    }
}
