//! HTTP client for the remote persistence API.
//!
//! Two collections: roadmap documents and progress documents keyed by
//! `{ownerId}_{roadmapId}`. Authentication is an optional bearer key applied
//! to every request.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Difficulty, ProgressRecord, RoadmapDraft, RoadmapId, SavedContent, SavedRoadmap};

/// Wire shape of a remote roadmap document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoadmapDoc {
    #[serde(default)]
    id: String,
    user_id: String,
    topic: String,
    goal: String,
    difficulty: Difficulty,
    content: SavedContent,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(status_error(status, response.text().await.unwrap_or_default()))
        }
    }

    /// For operations whose success carries no payload: any 2xx (including a
    /// body-less 204) is `Ok`.
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, response.text().await.unwrap_or_default()))
        }
    }

    /// Insert a roadmap document for `owner_id`; the server assigns the id.
    pub async fn create_roadmap(&self, owner_id: &str, draft: &RoadmapDraft) -> Result<RoadmapId> {
        let doc = RoadmapDoc {
            id: String::new(),
            user_id: owner_id.to_string(),
            topic: draft.topic.clone(),
            goal: draft.goal.clone(),
            difficulty: draft.difficulty,
            content: draft.content.clone(),
            created_at: None,
        };
        let response = self
            .request(reqwest::Method::POST, "/roadmaps")
            .json(&doc)
            .send()
            .await?;
        let created: CreatedResponse = self.handle_response(response).await?;
        Ok(RoadmapId::Remote(created.id))
    }

    /// Initialize an empty progress record for a freshly created roadmap.
    pub async fn init_progress(&self, owner_id: &str, roadmap_id: &RoadmapId) -> Result<()> {
        let key = ProgressRecord::key(owner_id, roadmap_id.as_str());
        let record = ProgressRecord {
            user_id: owner_id.to_string(),
            roadmap_id: roadmap_id.as_str().to_string(),
            ..Default::default()
        };
        let response = self
            .request(reqwest::Method::PUT, &format!("/progress/{key}"))
            .json(&record)
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    pub async fn get_roadmap(&self, id: &RoadmapId) -> Result<Option<SavedRoadmap>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/roadmaps/{}", id.as_str()))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: RoadmapDoc = self.handle_response(response).await?;
        Ok(Some(doc_to_roadmap(doc)))
    }

    /// All roadmaps for one owner, newest first (server-side ordering).
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<SavedRoadmap>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/users/{owner_id}/roadmaps"))
            .send()
            .await?;
        let docs: Vec<RoadmapDoc> = self.handle_response(response).await?;
        Ok(docs.into_iter().map(doc_to_roadmap).collect())
    }

    pub async fn rename_roadmap(&self, id: &RoadmapId, new_topic: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/roadmaps/{}", id.as_str()))
            .json(&serde_json::json!({ "topic": new_topic }))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }

    pub async fn delete_roadmap(&self, id: &RoadmapId) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/roadmaps/{}", id.as_str()))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }
}

fn status_error(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(body),
        _ => Error::Persistence(format!("{status}: {body}")),
    }
}

fn doc_to_roadmap(doc: RoadmapDoc) -> SavedRoadmap {
    SavedRoadmap {
        id: RoadmapId::Remote(doc.id),
        topic: doc.topic,
        goal: doc.goal,
        difficulty: doc.difficulty,
        content: doc.content,
        created_at: doc.created_at.unwrap_or_else(Utc::now),
    }
}
