//! Per-parent collapse state, persisted as one serialized blob.
//!
//! The mapping is small (bounded by the number of parent tasks) and changes
//! at user pace, so every write re-serializes the whole map and hands it to
//! the [`PreferenceStore`]. The store is injected: the web layer reads the
//! blob from the request cookie into a [`MemoryStore`], the `tree` command
//! keeps it in a [`FileStore`].

use crate::types::TaskId;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Fixed key the serialized mapping is stored under.
pub const COLLAPSE_STATE_KEY: &str = "collapseState";

#[derive(Debug, Error)]
pub enum CollapseError {
    #[error("preference store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("collapse state could not be serialized: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value blob storage for client preferences.
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Result<Option<String>, CollapseError>;
    fn save(&mut self, key: &str, blob: &str) -> Result<(), CollapseError>;
}

/// In-memory store, used for tests and for per-request cookie snapshots.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a single blob under `key`.
    pub fn with_blob(key: &str, blob: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), blob.into());
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, CollapseError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), CollapseError> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory (`~/.local/share/tasknest` on Linux).
    pub fn in_data_dir() -> Option<Self> {
        dirs::data_dir().map(|d| Self::new(d.join("tasknest")))
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, CollapseError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), CollapseError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), blob)?;
        Ok(())
    }
}

/// Remembered expanded/collapsed state per parent task.
#[derive(Debug)]
pub struct CollapseCache<S> {
    store: S,
    states: BTreeMap<String, bool>,
    default_collapsed: bool,
}

impl<S: PreferenceStore> CollapseCache<S> {
    /// Load the cache from whatever blob the store currently holds.
    ///
    /// A malformed blob is discarded (logged) rather than failing the caller;
    /// the user simply starts over with default fold state.
    pub fn load(store: S) -> Result<Self, CollapseError> {
        let blob = store.load(COLLAPSE_STATE_KEY)?;
        Ok(Self::from_blob(store, blob.as_deref()))
    }

    /// Build the cache from a blob obtained elsewhere (e.g. a request cookie).
    /// Later writes still go to `store`.
    pub fn from_blob(store: S, blob: Option<&str>) -> Self {
        Self {
            store,
            states: blob.map(parse_blob).unwrap_or_default(),
            default_collapsed: true,
        }
    }

    /// Override the policy applied to parents with no recorded state.
    pub fn with_default(mut self, collapsed: bool) -> Self {
        self.default_collapsed = collapsed;
        self
    }

    /// Recorded state for a parent, `None` if the user never folded it.
    pub fn get_state(&self, parent_id: TaskId) -> Option<bool> {
        self.states.get(&parent_id.to_string()).copied()
    }

    /// Record a state and persist the whole mapping immediately.
    pub fn set_state(&mut self, parent_id: TaskId, collapsed: bool) -> Result<(), CollapseError> {
        self.states.insert(parent_id.to_string(), collapsed);
        let blob = self.to_blob()?;
        self.store.save(COLLAPSE_STATE_KEY, &blob)
    }

    /// Effective state, falling back to the default policy.
    pub fn is_collapsed(&self, parent_id: TaskId) -> bool {
        self.get_state(parent_id).unwrap_or(self.default_collapsed)
    }

    pub fn to_blob(&self) -> Result<String, CollapseError> {
        Ok(serde_json::to_string(&self.states)?)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

fn parse_blob(blob: &str) -> BTreeMap<String, bool> {
    match serde_json::from_str(blob) {
        Ok(states) => states,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed collapse state");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_state_is_none_and_defaults_to_collapsed() {
        let cache = CollapseCache::load(MemoryStore::new()).unwrap();
        assert_eq!(cache.get_state(1), None);
        assert!(cache.is_collapsed(1));
    }

    #[test]
    fn default_policy_can_be_expanded() {
        let cache = CollapseCache::load(MemoryStore::new())
            .unwrap()
            .with_default(false);
        assert!(!cache.is_collapsed(1));
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut cache = CollapseCache::load(MemoryStore::new()).unwrap();
        cache.set_state(1, true).unwrap();
        cache.set_state(2, false).unwrap();

        assert_eq!(cache.get_state(1), Some(true));
        assert_eq!(cache.get_state(2), Some(false));
        assert!(!cache.is_collapsed(2));
    }

    #[test]
    fn every_write_persists_whole_blob() {
        let mut cache = CollapseCache::load(MemoryStore::new()).unwrap();
        cache.set_state(1, true).unwrap();
        cache.set_state(2, false).unwrap();

        let blob = cache.store().get(COLLAPSE_STATE_KEY).unwrap();
        assert_eq!(blob, r#"{"1":true,"2":false}"#);
    }

    #[test]
    fn state_survives_reload_from_blob() {
        let mut cache = CollapseCache::load(MemoryStore::new()).unwrap();
        cache.set_state(1, true).unwrap();
        cache.set_state(7, false).unwrap();

        let reloaded = CollapseCache::load(cache.into_store()).unwrap();
        assert_eq!(reloaded.get_state(1), Some(true));
        assert_eq!(reloaded.get_state(7), Some(false));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn malformed_blob_starts_empty() {
        let store = MemoryStore::with_blob(COLLAPSE_STATE_KEY, "{not json");
        let cache = CollapseCache::load(store).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn file_store_survives_reconstruction() {
        let dir = tempfile::tempdir().unwrap();

        let mut cache = CollapseCache::load(FileStore::new(dir.path())).unwrap();
        assert_eq!(cache.get_state(3), None);
        cache.set_state(3, false).unwrap();

        let reloaded = CollapseCache::load(FileStore::new(dir.path())).unwrap();
        assert_eq!(reloaded.get_state(3), Some(false));
    }

    #[test]
    fn file_store_missing_file_is_unset() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.load(COLLAPSE_STATE_KEY).unwrap().is_none());
    }
}
