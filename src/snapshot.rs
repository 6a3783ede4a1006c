//! Snapshot persistence: last known prices per comparison group.
//!
//! The store is a key-value interface so the backend stays swappable
//! without touching comparison logic. The provided backend keeps one JSON
//! file per group under a configured directory.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Error;
use crate::models::{GroupKey, PriceSnapshot};

/// Keyed read/write access to per-group snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Previous snapshot for a group; `Ok(None)` when no prior data exists.
    fn load(&self, key: &GroupKey) -> Result<Option<PriceSnapshot>, Error>;

    /// Replace the group's snapshot wholesale.
    fn store(&self, key: &GroupKey, snapshot: &PriceSnapshot) -> Result<(), Error>;
}

/// File-backed store: one pretty-printed JSON file per group.
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &GroupKey) -> PathBuf {
        let stem = format!(
            "{}--{}",
            sanitize(&key.unit_name),
            sanitize(key.room_type.label())
        );
        self.dir.join(format!("{stem}.json"))
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self, key: &GroupKey) -> Result<Option<PriceSnapshot>, Error> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no snapshot at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn store(&self, key: &GroupKey, snapshot: &PriceSnapshot) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json)?;
        debug!("wrote snapshot to {}", path.display());
        Ok(())
    }
}

/// Keep group-key file names portable.
fn sanitize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}
