use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ArchiveLayout;
use crate::constants::archive::RESERVED_DIR_PREFIX;
use crate::constants::messages::INDEX_CORRUPT_MSG;
use crate::errors::StoreError;
use crate::transport::fs::write_atomic;
use crate::types::{ObjectId, RelPathString};

/// How `StoreIndex::open` treats a persisted index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Freshness {
    /// Use the persisted index unless it is absent, corrupt, or stale.
    #[default]
    UsePersisted,
    /// Always rebuild from a directory scan and persist the result.
    Rescan,
}

/// Identifier → record location mapping for one store directory.
///
/// Entries are kept sorted so an unchanged store always persists to the same bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreIndex {
    store_dir: PathBuf,
    entries: BTreeMap<ObjectId, RelPathString>,
}

impl StoreIndex {
    /// Empty index for `store_dir`.
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Store directory entries are relative to.
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, id: impl Into<ObjectId>, rel_path: impl Into<RelPathString>) {
        self.entries.insert(id.into(), rel_path.into());
    }

    /// Absolute path of the record file for `id`.
    pub fn lookup(&self, id: &str) -> Option<PathBuf> {
        self.entries.get(id).map(|rel| self.store_dir.join(rel))
    }

    /// True when `id` has an entry.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Indexed identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Raw entries.
    pub fn entries(&self) -> &BTreeMap<ObjectId, RelPathString> {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when any entry points at a record file that no longer exists.
    pub fn is_stale(&self) -> bool {
        self.entries
            .values()
            .any(|rel| !self.store_dir.join(rel).is_file())
    }

    /// Build a full index from the store's directory layout.
    ///
    /// Accepts direct subdirectories holding the marker file. Quarantined
    /// (`_` prefix) and leftover staging directories (archive prefix) are skipped.
    pub fn rebuild_from_directory_scan(
        store_dir: &Path,
        layout: &ArchiveLayout,
    ) -> Result<Self, StoreError> {
        let mut index = Self::new(store_dir);
        if !store_dir.is_dir() {
            return Ok(index);
        }
        for entry in WalkDir::new(store_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(store_dir).to_path_buf();
                StoreError::filesystem("scan", path, err.into())
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                warn!(path = %entry.path().display(), "skipping non-utf8 store directory");
                continue;
            };
            if name.starts_with(RESERVED_DIR_PREFIX)
                || (!layout.prefix.is_empty() && name.starts_with(layout.prefix.as_str()))
            {
                continue;
            }
            if !entry.path().join(&layout.marker_file).is_file() {
                debug!(dir = %entry.path().display(), "store directory has no marker record");
                continue;
            }
            index.insert(name, format!("{name}/{}", layout.marker_file));
        }
        Ok(index)
    }

    /// Strictly read a persisted index.
    pub fn read(path: &Path, store_dir: &Path) -> Result<Self, StoreError> {
        let raw = fs::read(path)?;
        let entries: BTreeMap<ObjectId, RelPathString> =
            serde_json::from_slice(&raw).map_err(|err| StoreError::IndexCorrupt {
                path: path.to_path_buf(),
                details: err.to_string(),
            })?;
        Ok(Self {
            store_dir: store_dir.to_path_buf(),
            entries,
        })
    }

    /// Persisted index at `path`, or `None` when absent or undecodable.
    pub fn load(path: &Path, store_dir: &Path) -> Option<Self> {
        match Self::read(path, store_dir) {
            Ok(index) => Some(index),
            Err(StoreError::Io(err)) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "{}", INDEX_CORRUPT_MSG);
                None
            }
        }
    }

    /// Write the index atomically as sorted JSON.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let mut raw =
            serde_json::to_vec_pretty(&self.entries).map_err(|err| StoreError::IndexCorrupt {
                path: path.to_path_buf(),
                details: err.to_string(),
            })?;
        raw.push(b'\n');
        write_atomic(path, &raw)?;
        debug!(path = %path.display(), count = self.entries.len(), "persisted store index");
        Ok(())
    }

    /// Index for `store_dir`, rebuilding and persisting when needed.
    pub fn open(
        store_dir: &Path,
        index_path: &Path,
        layout: &ArchiveLayout,
        freshness: Freshness,
    ) -> Result<Self, StoreError> {
        if freshness == Freshness::UsePersisted
            && let Some(index) = Self::load(index_path, store_dir)
        {
            if !index.is_stale() {
                debug!(path = %index_path.display(), count = index.len(), "reusing store index");
                return Ok(index);
            }
            info!(path = %index_path.display(), "store index is stale; rebuilding");
        }
        let index = Self::rebuild_from_directory_scan(store_dir, layout)?;
        index.persist(index_path)?;
        info!(
            store = %store_dir.display(),
            count = index.len(),
            "rebuilt store index from directory scan"
        );
        Ok(index)
    }
}
