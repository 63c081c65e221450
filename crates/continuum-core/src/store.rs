//! Persistence of the whole room as one versioned snapshot.
//!
//! The engine calls [`StateStore::save`] while it still holds the room lock,
//! so the file on disk always matches a state some request observed.
//! [`JsonFileStore`] writes with the temp-file + fsync + rename protocol: a
//! crash mid-write leaves the previous snapshot intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::room::RoomState;

/// Snapshot format written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from loading or saving a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error during {context}: {source}")]
    Io {
        /// What was being done.
        context: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The room could not be serialized.
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The snapshot is not valid JSON for this format.
    #[error("snapshot deserialization failed: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The snapshot was written by an incompatible build.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
}

impl StoreError {
    const fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Where the authoritative room state lives between restarts.
pub trait StateStore: Send + Sync {
    /// Read the last saved room, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<RoomState>, StoreError>;

    /// Replace the saved room. Must be all-or-nothing.
    fn save(&self, room: &RoomState) -> Result<(), StoreError>;
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    room: &'a RoomState,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    room: serde_json::Value,
}

fn encode(room: &RoomState) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        room,
    })
    .map_err(StoreError::Serialize)
}

fn decode(raw: &[u8]) -> Result<RoomState, StoreError> {
    let envelope: Envelope = serde_json::from_slice(raw).map_err(StoreError::Deserialize)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    serde_json::from_value(envelope.room).map_err(StoreError::Deserialize)
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// A compact JSON snapshot on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<RoomState>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read snapshot", e)),
        };
        decode(&raw).map(Some)
    }

    fn save(&self, room: &RoomState) -> Result<(), StoreError> {
        let json = encode(room)?;
        let parent = self.parent_dir();
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io("create state directory", e))?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| StoreError::io("create temp file", e))?;
        tmp.write_all(&json)
            .map_err(|e| StoreError::io("write temp file", e))?;
        tmp.flush().map_err(|e| StoreError::io("flush temp file", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io("fsync temp file", e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io("rename snapshot", e.error))?;
        fsync_directory(parent)?;

        debug!(path = %self.path.display(), bytes = json.len(), "Snapshot saved");
        Ok(())
    }
}

fn fsync_directory(dir: &Path) -> Result<(), StoreError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StoreError::io("fsync state directory", e))
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Keeps the encoded snapshot in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Vec<u8>>>,
    saves: AtomicU64,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<RoomState>, StoreError> {
        self.lock().as_deref().map(decode).transpose()
    }

    fn save(&self, room: &RoomState) -> Result<(), StoreError> {
        let json = encode(room)?;
        *self.lock() = Some(json);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
