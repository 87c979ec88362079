use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion state for one (owner, roadmap) pair.
///
/// Identity is the deterministic composite key `{ownerId}_{roadmapId}`, so at
/// most one record exists per pair. Tasks are referenced by title only; the
/// record is independent of roadmap content.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub roadmap_id: String,
    #[serde(default)]
    pub completed_tasks: BTreeSet<String>,
    /// Server-assigned timestamp of the most recent mutation.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Composite document key for an (owner, roadmap) pair.
    pub fn key(owner_id: &str, roadmap_id: &str) -> String {
        format!("{owner_id}_{roadmap_id}")
    }
}
