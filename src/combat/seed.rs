//! Seed persistence
//!
//! The roll engine restores its seed from a `SeedStore` when constructed
//! and writes it back after every roll, so a session can be resumed with
//! the same dice.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a seed store
#[derive(Debug, Error)]
pub enum SeedStoreError {
    #[error("seed store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed seed record: {0}")]
    Format(#[from] serde_json::Error),

    #[error("seed store unavailable: {0}")]
    Unavailable(String),
}

/// Get/set hooks for the persisted seed
pub trait SeedStore: Send + Sync {
    /// The stored seed, or `None` if nothing has been stored yet
    fn load_seed(&self) -> Result<Option<u64>, SeedStoreError>;

    /// Store `seed`, replacing any previous value
    fn save_seed(&self, seed: u64) -> Result<(), SeedStoreError>;
}

impl<T: SeedStore + ?Sized> SeedStore for Arc<T> {
    fn load_seed(&self) -> Result<Option<u64>, SeedStoreError> {
        (**self).load_seed()
    }

    fn save_seed(&self, seed: u64) -> Result<(), SeedStoreError> {
        (**self).save_seed(seed)
    }
}

/// In-process seed store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySeedStore {
    seed: Mutex<Option<u64>>,
}

impl MemorySeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Mutex::new(Some(seed)),
        }
    }

    /// Last stored seed
    pub fn get(&self) -> Option<u64> {
        *self.seed.lock()
    }
}

impl SeedStore for MemorySeedStore {
    fn load_seed(&self) -> Result<Option<u64>, SeedStoreError> {
        Ok(*self.seed.lock())
    }

    fn save_seed(&self, seed: u64) -> Result<(), SeedStoreError> {
        *self.seed.lock() = Some(seed);
        Ok(())
    }
}

/// On-disk form of the seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SeedRecord {
    seed: u64,
}

/// Seed stored as a small JSON file
#[derive(Debug, Clone)]
pub struct FileSeedStore {
    path: PathBuf,
}

impl FileSeedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeedStore for FileSeedStore {
    fn load_seed(&self) -> Result<Option<u64>, SeedStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: SeedRecord = serde_json::from_str(&contents)?;
        Ok(Some(record.seed))
    }

    fn save_seed(&self, seed: u64) -> Result<(), SeedStoreError> {
        let contents = serde_json::to_string(&SeedRecord { seed })?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// How the engine's seed was obtained at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedStatus {
    /// No seed store configured
    Ephemeral,
    /// Store was empty; the initial seed was written to it
    Initialized,
    /// Seed restored from the store
    Restored,
    /// The store failed at startup; running on a fresh seed that will not
    /// resume a previous session
    Unavailable { reason: String },
}

impl SeedStatus {
    /// False when the startup restore failed
    pub fn is_reproducible(&self) -> bool {
        !matches!(self, SeedStatus::Unavailable { .. })
    }
}
