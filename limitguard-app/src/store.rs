//! Critical-data store
//!
//! The result tables and application counters can be registered with a
//! critical-data store so a warm restart resumes monitoring where it
//! left off; on a cold start everything initializes to stale and zero.
//!
//! The store is deliberately forgiving: a missing or unreadable snapshot
//! just means a cold start, and a failed save is logged and retried at
//! the next maintenance window. Nothing here may take the monitoring
//! loop down.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use limitguard_core::config::{MAX_ACTIONPOINTS, MAX_WATCHPOINTS};
use limitguard_core::{ActionpointResult, ApplicationState, Snapshot, WatchpointResult};

/// Serializable form of the engine's restorable state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotImage {
    /// Watchpoint results, table order
    pub wrt: Vec<WatchpointResult>,
    /// Actionpoint results, table order
    pub art: Vec<ActionpointResult>,
    /// Application state and counters
    pub app: ApplicationState,
}

impl SnapshotImage {
    /// Capture an engine snapshot into the serializable form
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            wrt: snapshot.wrt.to_vec(),
            art: snapshot.art.to_vec(),
            app: snapshot.app,
        }
    }

    /// Rebuild an engine snapshot; `None` if the image does not match
    /// the compiled table sizes (a snapshot from a different build).
    pub fn into_snapshot(&self) -> Option<Snapshot> {
        if self.wrt.len() != MAX_WATCHPOINTS || self.art.len() != MAX_ACTIONPOINTS {
            return None;
        }

        let mut wrt = [WatchpointResult::startup(); MAX_WATCHPOINTS];
        wrt.copy_from_slice(&self.wrt);
        let mut art = [ActionpointResult::startup(
            limitguard_core::ApState::NotUsed,
        ); MAX_ACTIONPOINTS];
        art.copy_from_slice(&self.art);

        Some(Snapshot {
            wrt,
            art,
            app: self.app,
        })
    }
}

/// Where restorable state lives between restarts
pub trait CriticalStore {
    /// Recover the last saved image, if any survives
    fn restore(&mut self) -> Option<SnapshotImage>;

    /// Persist the current image; failures must be absorbed
    fn save(&mut self, image: &SnapshotImage);
}

/// JSON-file-backed store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store snapshots at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CriticalStore for FileStore {
    fn restore(&mut self) -> Option<SnapshotImage> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(image) => Some(image),
            Err(err) => {
                log::warn!("discarding unreadable snapshot at {:?}: {err}", self.path);
                None
            }
        }
    }

    fn save(&mut self, image: &SnapshotImage) {
        let result = serde_json::to_string(image)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
            .and_then(|text| fs::write(&self.path, text));
        if let Err(err) = result {
            log::warn!("snapshot save to {:?} failed: {err}", self.path);
        }
    }
}

/// Store that keeps the image in memory; doubles as the test store
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// The most recently saved image
    pub saved: Option<SnapshotImage>,
}

impl CriticalStore for MemoryStore {
    fn restore(&mut self) -> Option<SnapshotImage> {
        self.saved.clone()
    }

    fn save(&mut self, image: &SnapshotImage) {
        self.saved = Some(image.clone());
    }
}

/// Store for hosts without persistence; always cold-starts
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl CriticalStore for NullStore {
    fn restore(&mut self) -> Option<SnapshotImage> {
        None
    }

    fn save(&mut self, _image: &SnapshotImage) {}
}
