//! The persistence gateway: one create/read/update/delete/list surface over
//! the on-device guest store and the remote document store.
//!
//! Backend selection happens in exactly two places: `create` routes on
//! whether an owner identity is present, and every other operation routes on
//! the [`RoadmapId`] variant resolved when the id entered the system. Callers
//! never inspect id strings.

mod local;
mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;

use crate::error::Result;
use crate::models::{RoadmapDraft, RoadmapId, SavedRoadmap};

#[derive(Clone)]
pub struct RoadmapStore {
    local: LocalStore,
    remote: RemoteStore,
}

impl RoadmapStore {
    pub fn new(local: LocalStore, remote: RemoteStore) -> Self {
        Self { local, remote }
    }

    /// Persist a roadmap. With an owner identity the document goes to the
    /// remote store and an empty progress record is initialized for the
    /// (owner, id) pair in the same logical operation; without one it goes to
    /// the local guest store under a fresh `local_` id.
    ///
    /// A failed progress initialization does not fail the create: progress
    /// lazily observes as an empty set on first subscribe, so the partial
    /// state heals itself.
    pub async fn create(&self, draft: &RoadmapDraft, owner_id: Option<&str>) -> Result<RoadmapId> {
        match owner_id {
            Some(owner) => {
                let id = self.remote.create_roadmap(owner, draft).await?;
                if let Err(e) = self.remote.init_progress(owner, &id).await {
                    tracing::warn!(%id, "progress init failed, will heal on first subscribe: {}", e);
                }
                Ok(id)
            }
            None => self.local.insert(draft),
        }
    }

    pub async fn get(&self, id: &RoadmapId) -> Result<Option<SavedRoadmap>> {
        match id {
            RoadmapId::Local(_) => self.local.get(id),
            RoadmapId::Remote(_) => self.remote.get_roadmap(id).await,
        }
    }

    pub async fn rename(&self, id: &RoadmapId, new_topic: &str) -> Result<()> {
        match id {
            RoadmapId::Local(_) => self.local.rename(id, new_topic),
            RoadmapId::Remote(_) => self.remote.rename_roadmap(id, new_topic).await,
        }
    }

    pub async fn delete(&self, id: &RoadmapId) -> Result<()> {
        match id {
            RoadmapId::Local(_) => self.local.delete(id),
            RoadmapId::Remote(_) => self.remote.delete_roadmap(id).await,
        }
    }

    /// Every roadmap visible to this device: always all local roadmaps (in
    /// insertion order), plus the owner's remote roadmaps (newest first) when
    /// an identity is present. Local-then-remote, no global re-sort.
    pub async fn list_for_owner(&self, owner_id: Option<&str>) -> Result<Vec<SavedRoadmap>> {
        let mut all = self.local.list()?;
        if let Some(owner) = owner_id {
            all.extend(self.remote.list_for_owner(owner).await?);
        }
        Ok(all)
    }
}
