// Fiches - app/persistence.rs
//
// Filter persistence: durable storage of the `PersistedFilters` projection
// under a single versioned key.
//
// Design principles:
// - Load never fails. A missing, unreadable or corrupt blob yields defaults
//   (field-level fallback lives in `core::persisted`).
// - Save errors are returned to the caller, which logs and ignores them:
//   losing persistence must never make the view unusable.
// - The file-backed store writes atomically (write temp, rename) so a crash
//   mid-save never corrupts the previous good blob.

use crate::core::persisted::PersistedFilters;
use crate::util::constants::PERSISTED_FILTERS_KEY;
use crate::util::error::PersistenceError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Durable client-side storage for the filter projection.
///
/// Implementors provide raw blob access; `load`/`save` add the JSON
/// projection on top.
pub trait PersistenceAdapter {
    /// Read the stored blob. `Ok(None)` means nothing was stored yet.
    fn read_raw(&self) -> Result<Option<String>, PersistenceError>;

    /// Replace the stored blob.
    fn write_raw(&mut self, blob: &str) -> Result<(), PersistenceError>;

    /// Load the persisted filters, falling back to defaults on any error.
    fn load(&self) -> PersistedFilters {
        match self.read_raw() {
            Ok(Some(blob)) => PersistedFilters::decode(&blob),
            Ok(None) => PersistedFilters::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read persisted filters, using defaults");
                PersistedFilters::default()
            }
        }
    }

    /// Serialise and store `filters`.
    fn save(&mut self, filters: &PersistedFilters) -> Result<(), PersistenceError> {
        let blob = filters
            .encode()
            .map_err(|source| PersistenceError::Serialize { source })?;
        self.write_raw(&blob)
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory store with an optional byte quota.
///
/// Clones share the same storage, the way every handle to browser storage
/// sees the same key. Used by tests and by runs that must not touch the
/// disk. A disabled store rejects every write, mimicking storage turned off
/// by the user.
#[derive(Debug, Default, Clone)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<MemorySlot>>,
}

#[derive(Debug, Default)]
struct MemorySlot {
    blob: Option<String>,
    quota: Option<usize>,
    disabled: bool,
    writes: usize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-existing blob, as if written by an earlier session.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        let store = Self::new();
        store.slot().blob = Some(blob.into());
        store
    }

    /// Reject blobs larger than `bytes`.
    pub fn with_quota(self, bytes: usize) -> Self {
        self.slot().quota = Some(bytes);
        self
    }

    /// Reject every write.
    pub fn disabled() -> Self {
        let store = Self::new();
        store.slot().disabled = true;
        store
    }

    /// Currently stored blob.
    pub fn blob(&self) -> Option<String> {
        self.slot().blob.clone()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.slot().writes
    }

    fn slot(&self) -> MutexGuard<'_, MemorySlot> {
        // A panic while holding the lock cannot leave the slot half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn read_raw(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.slot().blob.clone())
    }

    fn write_raw(&mut self, blob: &str) -> Result<(), PersistenceError> {
        let mut slot = self.slot();
        if slot.disabled {
            return Err(PersistenceError::Unavailable {
                key: PERSISTED_FILTERS_KEY.to_string(),
            });
        }
        if let Some(quota) = slot.quota {
            if blob.len() > quota {
                return Err(PersistenceError::QuotaExceeded {
                    key: PERSISTED_FILTERS_KEY.to_string(),
                    size: blob.len(),
                    quota,
                });
            }
        }
        slot.blob = Some(blob.to_string());
        slot.writes += 1;
        Ok(())
    }
}

// =============================================================================
// File store
// =============================================================================

/// JSON file named after the versioned key, in the platform data directory.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Store under `<data_dir>/<PERSISTED_FILTERS_KEY>.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{PERSISTED_FILTERS_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for FilePersistence {
    fn read_raw(&self) -> Result<Option<String>, PersistenceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_raw(&mut self, blob: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Write to a sibling temp file then rename over the final path.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, blob.as_bytes()).map_err(|source| PersistenceError::Io {
            path: tmp.clone(),
            source,
        })?;

        std::fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            PersistenceError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %self.path.display(), "Filters saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ClassLevel, TimeRange};
    use tempfile::TempDir;

    fn sample() -> PersistedFilters {
        PersistedFilters {
            level: Some(ClassLevel::Cm2),
            time_range: TimeRange::Month,
            tags: vec!["grammaire".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_file_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = FilePersistence::in_dir(dir.path());
        store.save(&sample()).expect("save should succeed");
        assert_eq!(store.load(), sample());
        assert!(store
            .path()
            .ends_with(format!("{PERSISTED_FILTERS_KEY}.json")));
    }

    #[test]
    fn test_file_missing_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FilePersistence::in_dir(&dir.path().join("never-created"));
        assert_eq!(store.read_raw().unwrap(), None);
        assert_eq!(store.load(), PersistedFilters::default());
    }

    #[test]
    fn test_file_corrupt_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FilePersistence::in_dir(dir.path());
        std::fs::write(store.path(), b"not valid json {{{{").unwrap();
        assert_eq!(store.load(), PersistedFilters::default());
    }

    #[test]
    fn test_file_leftover_temp_does_not_block_save() {
        let dir = TempDir::new().unwrap();
        let mut store = FilePersistence::in_dir(dir.path());
        std::fs::write(store.path().with_extension("json.tmp"), b"garbage").unwrap();
        store.save(&sample()).unwrap();
        assert_eq!(store.load(), sample());
    }

    #[test]
    fn test_memory_quota_rejects_large_blob() {
        let mut store = MemoryPersistence::new().with_quota(10);
        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, PersistenceError::QuotaExceeded { .. }));
        assert_eq!(store.blob(), None);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_memory_clones_share_storage() {
        let observer = MemoryPersistence::new();
        let mut writer = observer.clone();
        writer.save(&sample()).unwrap();
        assert_eq!(observer.writes(), 1);
        assert_eq!(observer.load(), sample());
    }

    #[test]
    fn test_memory_disabled_rejects_writes() {
        let mut store = MemoryPersistence::disabled();
        assert!(matches!(
            store.save(&sample()),
            Err(PersistenceError::Unavailable { .. })
        ));
        assert_eq!(store.load(), PersistedFilters::default());
    }
}
