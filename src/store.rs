//! The "latest successful visualization" slot used for crash and timeout recovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::request::VisualizationKind;

pub const RECOVERY_FILE: &str = "latest.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub kind: VisualizationKind,
    /// RFC 3339 timestamp of the render.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Holds the most recent successful render. Concurrent writers race and the
/// last one wins.
pub trait RecoveryStore: Send + Sync {
    fn get(&self) -> Option<RecoveryRecord>;
    fn set(&self, record: RecoveryRecord);
}

#[derive(Debug, Default)]
pub struct MemoryRecoveryStore {
    slot: RwLock<Option<RecoveryRecord>>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn get(&self) -> Option<RecoveryRecord> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, record: RecoveryRecord) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(record),
            Err(poisoned) => *poisoned.into_inner() = Some(record),
        }
    }
}

/// Keeps the record in memory and mirrors it to `latest.json` in a directory.
#[derive(Debug)]
pub struct FileRecoveryStore {
    path: PathBuf,
    memory: MemoryRecoveryStore,
}

impl FileRecoveryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(RECOVERY_FILE),
            memory: MemoryRecoveryStore::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Option<RecoveryRecord> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("ignoring unreadable {}: {e}", self.path.display());
                None
            }
        }
    }

    fn write_file(&self, record: &RecoveryRecord) -> crate::error::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn get(&self) -> Option<RecoveryRecord> {
        self.memory.get().or_else(|| {
            let record = self.read_file()?;
            self.memory.set(record.clone());
            Some(record)
        })
    }

    fn set(&self, record: RecoveryRecord) {
        if let Err(e) = self.write_file(&record) {
            warn!("could not persist recovery record: {e}");
        }
        self.memory.set(record);
    }
}
