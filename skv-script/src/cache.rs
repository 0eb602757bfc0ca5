//! # Script Cache
//!
//! Purpose: Load Lua sources from one directory, keep them in memory keyed by
//! file name, and notice when a file changes on disk.
//!
//! ## Design Principles
//! 1. **Lazy Fill**: An entry is read on first use of its name and lives for
//!    the life of the cache.
//! 2. **Whole Replacement**: A reload swaps in a fresh `ScriptFile`; readers
//!    already holding the old `Arc` keep a consistent (source, sha1) pair.
//! 3. **Per-Name Locking**: The name map lock is held only to find a slot.
//!    Stat and reload run under that name's slot lock, so one slow file does
//!    not stall other scripts.
//!
//! ## Staleness
//! An entry is stale when the file's modification time differs from the one
//! captured at load, in either direction. Two edits landing on the same clock
//! tick are not detected.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{ScriptError, ScriptResult};

/// One loaded version of a script file.
#[derive(Debug)]
pub struct ScriptFile {
    name: String,
    path: PathBuf,
    modified: SystemTime,
    source: Vec<u8>,
    sha1: String,
}

impl ScriptFile {
    /// Lookup key (file name inside the scripts directory).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path the source was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time observed at load.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Raw file bytes.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Lowercase hex SHA-1 of `source`, the `EVALSHA` identifier.
    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    /// Re-stats the file and reports whether its mtime moved.
    pub fn is_stale(&self) -> io::Result<bool> {
        let modified = fs::metadata(&self.path)?.modified()?;
        Ok(modified != self.modified)
    }
}

type Slot = Arc<Mutex<Option<Arc<ScriptFile>>>>;

/// Process-wide script cache, shared by every runner.
#[derive(Debug)]
pub struct ScriptCache {
    dir: PathBuf,
    entries: Mutex<HashMap<String, Slot>>,
    loads: AtomicU64,
}

impl ScriptCache {
    /// Creates an empty cache over `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ScriptCache {
            dir: dir.into(),
            entries: Mutex::new(HashMap::new()),
            loads: AtomicU64::new(0),
        }
    }

    /// Directory scripts are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads `name` from disk and stores it, replacing any previous entry.
    ///
    /// On failure the cache is left untouched.
    pub fn load(&self, name: &str) -> ScriptResult<Arc<ScriptFile>> {
        let slot = self.slot(name);
        let mut entry = slot.lock();
        self.load_into(name, &slot, &mut entry)
    }

    /// Returns the cached entry, reloading it first when missing or stale.
    ///
    /// A failed stat counts as stale. A failed reload is returned as-is even
    /// though the previous version is still in memory.
    pub fn get_or_load(&self, name: &str) -> ScriptResult<Arc<ScriptFile>> {
        let slot = self.slot(name);
        let mut entry = slot.lock();
        if let Some(script) = entry.as_ref() {
            match script.is_stale() {
                Ok(false) => return Ok(script.clone()),
                Ok(true) => debug!(script = name, "script modified, reloading"),
                Err(err) => debug!(script = name, "stat script failed, reloading: {}", err),
            }
        }
        self.load_into(name, &slot, &mut entry)
    }

    /// Returns the entry currently held for `name` without touching disk.
    pub fn cached(&self, name: &str) -> Option<Arc<ScriptFile>> {
        let slot = self.entries.lock().get(name).cloned()?;
        let script = slot.lock().clone();
        script
    }

    /// Number of successful disk loads so far.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    fn slot(&self, name: &str) -> Slot {
        let mut entries = self.entries.lock();
        entries.entry(name.to_string()).or_default().clone()
    }

    fn load_into(
        &self,
        name: &str,
        slot: &Slot,
        entry: &mut Option<Arc<ScriptFile>>,
    ) -> ScriptResult<Arc<ScriptFile>> {
        match self.read_script(name) {
            Ok(script) => {
                let script = Arc::new(script);
                *entry = Some(script.clone());
                Ok(script)
            }
            Err(err) => {
                if entry.is_none() {
                    self.forget(name, slot);
                }
                Err(err)
            }
        }
    }

    /// Drops a slot that never held a script. Called with the slot lock held;
    /// nothing takes a slot lock while holding the map lock.
    fn forget(&self, name: &str, slot: &Slot) {
        let mut entries = self.entries.lock();
        if entries.get(name).map_or(false, |current| Arc::ptr_eq(current, slot)) {
            entries.remove(name);
        }
    }

    fn read_script(&self, name: &str) -> ScriptResult<ScriptFile> {
        let path = self.dir.join(name);
        let io_err = |source: io::Error| ScriptError::Io {
            name: name.to_string(),
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(io_err)?;
        let modified = file.metadata().and_then(|meta| meta.modified()).map_err(io_err)?;
        let mut source = Vec::new();
        file.read_to_end(&mut source).map_err(io_err)?;

        let sha1 = hex::encode(Sha1::digest(&source));
        self.loads.fetch_add(1, Ordering::Relaxed);
        debug!(script = name, sha1 = %sha1, bytes = source.len(), "loaded script");

        Ok(ScriptFile {
            name: name.to_string(),
            path,
            modified,
            source,
            sha1,
        })
    }
}
