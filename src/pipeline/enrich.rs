//! Per-task video enrichment fan-out and duration aggregation.
//!
//! Every task of an accepted roadmap gets exactly one lookup attempt, all
//! dispatched together with no concurrency bound and no retry. Each worker
//! owns its own slot in the session's [`EnrichmentMap`]; a failed lookup
//! settles the slot as "no resource" and is logged, never propagated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use crate::models::{Difficulty, Module, Task, VideoResource};
use crate::pipeline::client::RecommenderClient;

/// Transient lookup state for one task title.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentSlot {
    pub loading: bool,
    pub resource: Option<VideoResource>,
    pub error: Option<String>,
}

/// Task-title-keyed enrichment state for one generation session.
///
/// The map is created fresh for each session. Workers from a superseded
/// session still hold the old `Arc` and settle into it harmlessly; nothing
/// reads a dropped session's map, which is the stale-response guard.
#[derive(Debug, Default)]
pub struct EnrichmentMap {
    slots: Mutex<HashMap<String, EnrichmentSlot>>,
}

impl EnrichmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one task's slot. Absent means no lookup was dispatched
    /// for that title in this session.
    pub fn slot(&self, task_title: &str) -> Option<EnrichmentSlot> {
        self.slots
            .lock()
            .expect("enrichment map lock poisoned")
            .get(task_title)
            .cloned()
    }

    /// Snapshot of all settled resources, keyed by task title. This is the
    /// map embedded into the persisted document.
    pub fn resources(&self) -> HashMap<String, VideoResource> {
        self.slots
            .lock()
            .expect("enrichment map lock poisoned")
            .iter()
            .filter_map(|(title, slot)| {
                slot.resource.as_ref().map(|r| (title.clone(), r.clone()))
            })
            .collect()
    }

    pub fn any_loading(&self) -> bool {
        self.slots
            .lock()
            .expect("enrichment map lock poisoned")
            .values()
            .any(|s| s.loading)
    }

    fn begin(&self, task_title: &str) {
        let mut slots = self.slots.lock().expect("enrichment map lock poisoned");
        slots.entry(task_title.to_string()).or_default().loading = true;
    }

    /// Settle a slot exactly once. Slots are append-only within a session:
    /// a settled result is never retried or replaced.
    fn settle(&self, task_title: &str, outcome: Result<VideoResource, String>) {
        let mut slots = self.slots.lock().expect("enrichment map lock poisoned");
        let slot = slots.entry(task_title.to_string()).or_default();
        slot.loading = false;
        if slot.resource.is_some() {
            return;
        }
        match outcome {
            Ok(resource) => slot.resource = Some(resource),
            Err(err) => slot.error = Some(err),
        }
    }
}

/// Dispatch one lookup worker per task, all at once.
///
/// Fire-and-forget relative to the generation call: the returned [`JoinSet`]
/// only exists so callers that want settlement (the CLI, tests) can await it.
pub fn spawn_fan_out(
    recommender: &RecommenderClient,
    map: &Arc<EnrichmentMap>,
    modules: &[Module],
    goal: &str,
    difficulty: Difficulty,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    for module in modules {
        for task in &module.tasks {
            let recommender = recommender.clone();
            let map = Arc::clone(map);
            let title = task.title.clone();
            let goal = goal.to_string();
            map.begin(&title);
            workers.spawn(async move {
                match recommender.recommend(&title, &goal, difficulty).await {
                    Ok(resource) => map.settle(&title, Ok(resource)),
                    Err(e) => {
                        tracing::warn!("no video found for '{}': {}", title, e);
                        map.settle(&title, Err(e.to_string()));
                    }
                }
            });
        }
    }
    workers
}

/// Parse a provider duration stamp (`MM:SS` or `HH:MM:SS`) into fractional
/// minutes. Malformed input (wrong shape, non-numeric components) counts as
/// zero rather than erroring.
pub fn parse_timestamp_minutes(stamp: &str) -> f64 {
    let parts: Vec<f64> = match stamp
        .split(':')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
    {
        Ok(parts) => parts,
        Err(_) => return 0.0,
    };
    match parts[..] {
        [minutes, seconds] => minutes + seconds / 60.0,
        [hours, minutes, seconds] => hours * 60.0 + minutes + seconds / 60.0,
        _ => 0.0,
    }
}

/// Total learning time in minutes for a roadmap plus its enrichment map.
///
/// Per task: the selected video's duration stamp when one arrived, otherwise
/// the task's own estimate. Pure function of its inputs — robust to arbitrary
/// enrichment completion order and to entries that never arrive.
pub fn total_minutes(modules: &[Module], resources: &HashMap<String, VideoResource>) -> f64 {
    modules
        .iter()
        .flat_map(|m| m.tasks.iter())
        .map(|task| task_minutes(task, resources.get(&task.title)))
        .sum()
}

fn task_minutes(task: &Task, resource: Option<&VideoResource>) -> f64 {
    match resource
        .and_then(|r| r.selected_video.as_ref())
        .and_then(|v| v.timestamp.as_deref())
    {
        Some(stamp) => parse_timestamp_minutes(stamp),
        None => task.estimated_minutes,
    }
}

/// Total hours, formatted to one decimal place for display.
pub fn format_total_hours(modules: &[Module], resources: &HashMap<String, VideoResource>) -> String {
    format!("{:.1}", total_minutes(modules, resources) / 60.0)
}
