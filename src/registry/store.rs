//! Persistence adapter for room snapshots.
//!
//! Stores are written after the room lock is released, so writes for one room can
//! arrive out of order. Every store keeps the snapshot with the highest revision.

use crate::models::{RoomCode, RoomSnapshot};
use crate::registry::code;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed snapshot storage.
pub trait RoomStore: Send + Sync {
    fn load(&self, code: &str) -> Result<Option<RoomSnapshot>, StoreError>;
    fn store(&self, code: &str, snapshot: &RoomSnapshot) -> Result<(), StoreError>;
    fn remove(&self, code: &str) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<HashMap<RoomCode, RoomSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    fn load(&self, code: &str) -> Result<Option<RoomSnapshot>, StoreError> {
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(snapshots.get(code).cloned())
    }

    fn store(&self, code: &str, snapshot: &RoomSnapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        let newer = snapshots
            .get(code)
            .map_or(true, |existing| existing.revision <= snapshot.revision);
        if newer {
            snapshots.insert(code.to_string(), snapshot.clone());
        }
        Ok(())
    }

    fn remove(&self, code: &str) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        snapshots.remove(code);
        Ok(())
    }
}

/// One pretty-printed JSON file per room in a directory.
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// None for codes that could not name a file we wrote.
    fn path(&self, code: &str) -> Option<PathBuf> {
        code::is_well_formed(code).then(|| self.dir.join(format!("{code}.json")))
    }

    fn read(path: &Path) -> Result<Option<RoomSnapshot>, StoreError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl RoomStore for JsonDirStore {
    fn load(&self, code: &str) -> Result<Option<RoomSnapshot>, StoreError> {
        match self.path(code) {
            Some(path) => Self::read(&path),
            None => Ok(None),
        }
    }

    fn store(&self, code: &str, snapshot: &RoomSnapshot) -> Result<(), StoreError> {
        let Some(path) = self.path(code) else {
            log::warn!("Refusing to store room with malformed code {code:?}");
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = Self::read(&path)? {
            if existing.revision > snapshot.revision {
                return Ok(());
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, code: &str) -> Result<(), StoreError> {
        let Some(path) = self.path(code) else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
