//! skilltrail: AI-generated learning roadmaps, enriched with a best-matching
//! tutorial video per task, with completion progress synced across devices.
//!
//! The crate is the orchestration core behind the app:
//! - [`pipeline`]: one generation call fanned out into per-task video
//!   lookups, owned by a session state machine.
//! - [`store`]: one persistence surface over the local guest database and
//!   the remote document store.
//! - [`progress`]: live, push-based completion tracking per (owner, roadmap).

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod store;

pub use error::{Error, Result};
