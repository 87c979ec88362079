//! The roadmap generation session: one state machine from user input to a
//! persisted roadmap.
//!
//! `Idle → Generating → {Generated | Failed} → Saving → Saved`, with `reset`
//! re-entering `Idle` from anywhere. A session owns the generated roadmap and
//! its enrichment map until `start_learning` hands both to the store.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::models::{Difficulty, RoadmapContent, RoadmapDraft, RoadmapId, SavedContent};
use crate::pipeline::client::{combined_goal, GeneratorClient, RecommenderClient};
use crate::pipeline::enrich::{spawn_fan_out, EnrichmentMap};
use crate::store::RoadmapStore;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Generating,
    /// A roadmap was generated but not yet persisted.
    Generated,
    /// Generation failed; the message is user-facing.
    Failed(String),
    Saving,
    Saved(RoadmapId),
}

/// The generated-but-unsaved roadmap held by a session.
#[derive(Debug, Clone)]
pub struct DraftRoadmap {
    pub topic: String,
    pub goal: String,
    pub combined_goal: String,
    pub difficulty: Difficulty,
    pub content: RoadmapContent,
}

pub struct RoadmapSession {
    generator: GeneratorClient,
    recommender: RecommenderClient,
    store: RoadmapStore,
    state: SessionState,
    draft: Option<DraftRoadmap>,
    enrichment: Arc<EnrichmentMap>,
    workers: JoinSet<()>,
}

impl RoadmapSession {
    pub fn new(
        generator: GeneratorClient,
        recommender: RecommenderClient,
        store: RoadmapStore,
    ) -> Self {
        Self {
            generator,
            recommender,
            store,
            state: SessionState::Idle,
            draft: None,
            enrichment: Arc::new(EnrichmentMap::new()),
            workers: JoinSet::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn draft(&self) -> Option<&DraftRoadmap> {
        self.draft.as_ref()
    }

    /// The current session's enrichment map. Replaced wholesale on every
    /// `generate`/`reset`, which is what keeps superseded sessions' late
    /// lookup results out of the active one.
    pub fn enrichment(&self) -> &Arc<EnrichmentMap> {
        &self.enrichment
    }

    /// Generate a roadmap for `{topic, goal, difficulty}` and kick off video
    /// enrichment for every task.
    ///
    /// A blank topic or goal is a silent no-op (nothing to generate). The
    /// enrichment fan-out is fire-and-forget: this returns as soon as the
    /// roadmap itself is accepted.
    pub async fn generate(
        &mut self,
        topic: &str,
        goal: &str,
        difficulty: Difficulty,
    ) -> Result<()> {
        if topic.trim().is_empty() || goal.trim().is_empty() {
            tracing::debug!("ignoring generate with blank topic or goal");
            return Ok(());
        }

        // Discard the previous session before the call goes out, so its
        // late-arriving enrichment results land in a map nothing reads.
        self.discard_session();
        self.state = SessionState::Generating;

        let combined = combined_goal(topic, goal);
        tracing::info!(goal = %combined, %difficulty, "generating roadmap");

        let content = match self.generator.generate(&combined, difficulty).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("generation failed: {}", e);
                self.state = SessionState::Failed(e.to_string());
                return Err(e);
            }
        };

        tracing::info!(
            modules = content.modules.len(),
            tasks = content.task_count(),
            "roadmap accepted, dispatching video lookups"
        );
        self.workers = spawn_fan_out(
            &self.recommender,
            &self.enrichment,
            &content.modules,
            &combined,
            difficulty,
        );
        self.draft = Some(DraftRoadmap {
            topic: topic.trim().to_string(),
            goal: goal.trim().to_string(),
            combined_goal: combined,
            difficulty,
            content,
        });
        self.state = SessionState::Generated;
        Ok(())
    }

    /// Persist the generated roadmap and whatever videos have arrived.
    ///
    /// Backend selection is by identity: an owner id routes to the remote
    /// store, none to the local guest store. Generation state is cleared
    /// afterward whether or not the save succeeded, so the caller can never
    /// re-save the same session.
    pub async fn start_learning(&mut self, owner_id: Option<&str>) -> Result<RoadmapId> {
        let draft = match (&self.state, self.draft.take()) {
            (SessionState::Generated, Some(draft)) => draft,
            (state, draft) => {
                self.draft = draft;
                return Err(Error::InvalidInput(format!(
                    "nothing to save in state {state:?}"
                )));
            }
        };

        self.state = SessionState::Saving;
        let payload = RoadmapDraft {
            topic: draft.topic,
            goal: draft.goal,
            difficulty: draft.difficulty,
            content: SavedContent {
                modules: draft.content.modules,
                video_resources: self.enrichment.resources(),
            },
        };

        let result = self.store.create(&payload, owner_id).await;
        self.discard_session();
        match result {
            Ok(id) => {
                tracing::info!(%id, "roadmap saved");
                self.state = SessionState::Saved(id.clone());
                Ok(id)
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Return to `Idle`, discarding the roadmap, enrichment map, and error.
    pub fn reset(&mut self) {
        self.discard_session();
        self.state = SessionState::Idle;
    }

    /// Wait for every in-flight lookup of the current session to settle.
    /// Used by callers that want a complete picture before rendering.
    pub async fn await_enrichment(&mut self) {
        while self.workers.join_next().await.is_some() {}
    }

    /// Total learning hours for the current draft, one decimal place.
    /// Tolerates lookups that have not (or will never) arrive.
    pub fn total_hours_label(&self) -> Option<String> {
        self.draft.as_ref().map(|d| {
            crate::pipeline::enrich::format_total_hours(
                &d.content.modules,
                &self.enrichment.resources(),
            )
        })
    }

    fn discard_session(&mut self) {
        self.draft = None;
        self.enrichment = Arc::new(EnrichmentMap::new());
        // Detach rather than abort: in-flight lookups settle into the old
        // map, which nothing reads anymore.
        self.workers.detach_all();
    }
}
