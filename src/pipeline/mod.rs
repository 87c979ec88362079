//! The generation/enrichment pipeline: one roadmap-generation call fanned out
//! into many independent per-task video lookups, aggregated into a single
//! session owned by [`RoadmapSession`].

mod client;
mod enrich;
mod session;

pub use client::{combined_goal, GeneratorClient, RecommenderClient};
pub use enrich::{
    format_total_hours, parse_timestamp_minutes, spawn_fan_out, total_minutes, EnrichmentMap,
    EnrichmentSlot,
};
pub use session::{DraftRoadmap, RoadmapSession, SessionState};
