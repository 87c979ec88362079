//! HTTP clients for the two AI collaborator services.
//!
//! Both services are opaque POST endpoints. The generation endpoint returns
//! the full roadmap; the recommendation endpoint returns one video per call.
//! Neither envelope is guaranteed to be stable, so parsing is tolerant where
//! the services have been observed to vary.

use reqwest::Client;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Difficulty, RoadmapContent, VideoResource};

/// Combine the user's topic and goal into the single natural-language goal
/// string sent to both collaborator services.
///
/// Rule: `"{topic} - {goal}"`, or just `"{topic}"` when the goal is blank.
pub fn combined_goal(topic: &str, goal: &str) -> String {
    let topic = topic.trim();
    let goal = goal.trim();
    if goal.is_empty() {
        topic.to_string()
    } else {
        format!("{topic} - {goal}")
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    goal: &'a str,
    difficulty: Difficulty,
}

#[derive(Debug, Serialize)]
struct RecommendRequest<'a> {
    topic: &'a str,
    goal: &'a str,
    difficulty: Difficulty,
}

/// Client for the roadmap-generation endpoint.
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    url: String,
    client: Client,
}

impl GeneratorClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    /// Request a roadmap for the combined goal string.
    ///
    /// Accepts either `{"roadmap": {...}}` or a bare roadmap object — the
    /// endpoint's envelope is not guaranteed. Any non-2xx status or
    /// unparseable body is a [`Error::Generation`].
    pub async fn generate(&self, goal: &str, difficulty: Difficulty) -> Result<RoadmapContent> {
        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest { goal, difficulty })
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Surface whatever the endpoint said, parsed as JSON when
            // possible so structured error bodies stay readable.
            let body = response.text().await.unwrap_or_default();
            let detail: serde_json::Value =
                serde_json::from_str(&body).unwrap_or_else(|_| serde_json::json!({}));
            return Err(Error::Generation(format!("{status}: {detail}")));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("malformed response: {e}")))?;
        let payload = match value.get("roadmap") {
            Some(inner) => inner.clone(),
            None => value,
        };
        serde_json::from_value(payload)
            .map_err(|e| Error::Generation(format!("malformed roadmap: {e}")))
    }
}

/// Client for the per-task video recommendation endpoint.
#[derive(Debug, Clone)]
pub struct RecommenderClient {
    url: String,
    client: Client,
}

impl RecommenderClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    /// Look up the best-matching video for one task title.
    ///
    /// Callers treat any error as "no resource found" — failures here are
    /// never fatal to the roadmap.
    pub async fn recommend(
        &self,
        task_title: &str,
        goal: &str,
        difficulty: Difficulty,
    ) -> Result<VideoResource> {
        let response = self
            .client
            .post(&self.url)
            .json(&RecommendRequest {
                topic: task_title,
                goal,
                difficulty,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Enrichment(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }
}
