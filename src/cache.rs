//! Keeps loaded evaluation data per root, guarded by a snapshot of every
//! matching file's mtime and size. Reloads happen when the snapshot
//! drifts or an entry is invalidated by hand, never behind the caller's
//! back.

use crate::loader::{self, LoadError, RESULTS_PATTERN, SAMPLES_PATTERN};
use crate::records::{ResultSet, SampleIndex};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

type Snapshot = Vec<(PathBuf, SystemTime, u64)>;

/// One cached load of a root directory.
#[derive(Debug)]
pub struct CacheEntry {
    snapshot: Snapshot,
    pub loaded_at: DateTime<Utc>,
    pub results: ResultSet,
    pub samples: SampleIndex,
}

#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry for `root`, loading or reloading when the
    /// files on disk no longer match the cached snapshot.
    pub fn get_or_load(&mut self, root: &Path) -> Result<&CacheEntry, LoadError> {
        let snapshot = take_snapshot(root)?;
        match self.entries.entry(root.to_path_buf()) {
            Entry::Occupied(mut slot) => {
                if slot.get().snapshot != snapshot {
                    tracing::info!("files under {} changed, reloading", root.display());
                    *slot.get_mut() = load_entry(root, snapshot)?;
                }
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                let entry = load_entry(root, snapshot)?;
                Ok(slot.insert(entry))
            }
        }
    }

    /// Drop the cached entry for `root`. Returns whether one existed.
    pub fn invalidate(&mut self, root: &Path) -> bool {
        self.entries.remove(root).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether a cached entry exists for `root` and still matches the
    /// directory contents.
    pub fn is_fresh(&self, root: &Path) -> bool {
        match self.entries.get(root) {
            Some(entry) => match take_snapshot(root) {
                Ok(snapshot) => entry.snapshot == snapshot,
                Err(_) => false,
            },
            None => false,
        }
    }
}

fn load_entry(root: &Path, snapshot: Snapshot) -> Result<CacheEntry, LoadError> {
    let (results, samples) = loader::load_all_data(root)?;
    Ok(CacheEntry {
        snapshot,
        loaded_at: Utc::now(),
        results,
        samples,
    })
}

/// Record (path, mtime, size) for every results and sample file under the
/// root's model directories. Files vanishing mid-scan are simply absent
/// from the snapshot.
fn take_snapshot(root: &Path) -> Result<Snapshot, LoadError> {
    let mut snapshot = Snapshot::new();
    for model in loader::discover_models(root)? {
        let model_dir = root.join(&model);
        for pattern in [RESULTS_PATTERN, SAMPLES_PATTERN] {
            for path in loader::find_files(&model_dir, pattern) {
                let meta = match std::fs::metadata(&path) {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };
                let mtime = match meta.modified() {
                    Ok(mtime) => mtime,
                    Err(_) => continue,
                };
                snapshot.push((path, mtime, meta.len()));
            }
        }
    }
    Ok(snapshot)
}
