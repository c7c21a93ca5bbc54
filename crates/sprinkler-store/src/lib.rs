//! Persistence layer for sprinklerd
//!
//! Two JSON-file-backed stores:
//! - [`ZoneStore`] — zone names, on/off status, state ownership, max-run cutoff
//! - [`ScheduleStore`] — local cache of calendar-sourced watering events
//!
//! Both stores keep an authoritative in-memory snapshot and write it back
//! after every accepted mutation. A failed write is logged and the store
//! continues on its in-memory state; changes may then not survive a restart.

mod schedule;
mod serde_compat;
mod zones;

pub use schedule::*;
pub use zones::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Zone id {zone_id} out of range (zone count {zone_count})")]
    ZoneOutOfRange { zone_id: usize, zone_count: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Load a JSON state file into a typed snapshot.
fn load_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a typed snapshot back to its JSON state file, creating the parent
/// directory if needed.
fn save_json<T: Serialize>(path: &Path, data: &T) -> StoreResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string(data)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Best-effort persistence: log the failure and keep running on the
/// in-memory snapshot.
fn persist<T: Serialize>(path: &Path, data: &T) {
    if let Err(e) = save_json(path, data) {
        warn!(path = %path.display(), error = %e, "Failed to persist state file");
    }
}

/// Sha256 fingerprint of a serializable snapshot, hex-encoded.
///
/// Used for the `_data_hash` clients poll with, and for the before/after
/// comparison that gates hardware writes during reconciliation.
fn fingerprint<T: Serialize>(data: &T) -> String {
    let bytes = serde_json::to_vec(data).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
