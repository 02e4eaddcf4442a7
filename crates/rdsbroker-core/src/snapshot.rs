//! Final snapshot naming.
//!
//! The broker names the snapshot it keeps on deprovision after the instance
//! id. Cleanup and verification both key off [`final_snapshot_id`], so this
//! is the one place the convention lives.

use serde::{Deserialize, Serialize};

pub const FINAL_SNAPSHOT_SUFFIX: &str = "-final-snapshot";

pub fn final_snapshot_id(instance_id: &str) -> String {
    format!("{instance_id}{FINAL_SNAPSHOT_SUFFIX}")
}

/// What the backing store knows about an instance's final snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub identifier: String,
    pub exists_final: bool,
    /// Provider status (e.g. `available`, `creating`) when the snapshot exists.
    pub status: Option<String>,
}

impl SnapshotRecord {
    pub fn absent(instance_id: &str) -> Self {
        Self {
            identifier: final_snapshot_id(instance_id),
            exists_final: false,
            status: None,
        }
    }

    pub fn present(instance_id: &str, status: Option<String>) -> Self {
        Self {
            identifier: final_snapshot_id(instance_id),
            exists_final: true,
            status,
        }
    }
}
