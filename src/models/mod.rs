//! Domain models for skilltrail.
//!
//! # Core Concepts
//!
//! - [`RoadmapContent`]: the generated curriculum — ordered [`Module`]s of
//!   ordered [`Task`]s. Task titles are unique per roadmap and key both
//!   enrichment and progress.
//! - [`VideoResource`]: the best-matching tutorial video found for one task,
//!   plus the raw provider payload.
//! - [`SavedRoadmap`] / [`RoadmapDraft`]: the persisted document and its
//!   pre-save payload. [`RoadmapId`] tags which backend owns a document.
//! - [`ProgressRecord`]: per-(owner, roadmap) completion set, shared across
//!   devices through the sync service.

mod progress;
mod roadmap;
mod video;

pub use progress::*;
pub use roadmap::*;
pub use video::*;
