//! Real-time progress synchronization.
//!
//! Completion state for a (owner, roadmap) pair lives in a server-side
//! progress document. This module keeps a local view of that document live
//! through a push subscription (an SSE stream of record snapshots) and
//! mutates it with targeted set-add/set-remove operations so concurrent
//! toggles of different tasks from different devices do not clobber each
//! other. Last write wins; there is no further conflict resolution.

use std::collections::BTreeSet;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::{ProgressRecord, RoadmapId};

/// Delay before re-opening a dropped watch stream.
const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug, serde::Serialize)]
struct TaskOp<'a> {
    op: &'static str,
    task: &'a str,
}

/// Client for the progress collection of the sync service.
#[derive(Debug, Clone)]
pub struct ProgressSync {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ProgressSync {
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

    /// Current completion set for a pair. A missing record is an empty set,
    /// not an error.
    pub async fn fetch(&self, owner_id: &str, roadmap_id: &str) -> Result<BTreeSet<String>> {
        let key = ProgressRecord::key(owner_id, roadmap_id);
        let response = self
            .request(reqwest::Method::GET, &format!("/progress/{key}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(BTreeSet::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Sync(format!("{status}: {body}")));
        }
        let record: ProgressRecord = response.json().await?;
        Ok(record.completed_tasks)
    }

    /// Send one targeted set mutation. The server stamps `lastUpdated`.
    async fn apply(&self, key: &str, op: &'static str, task: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, &format!("/progress/{key}/tasks"))
            .json(&TaskOp { op, task })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Sync(format!("{status}: {body}")));
        }
        Ok(())
    }

    /// One-shot idempotent flip: fetch the current set, then send the
    /// targeted add/remove. Used when no live subscription is attached.
    pub async fn toggle(&self, owner_id: &str, roadmap_id: &str, task_title: &str) -> Result<()> {
        let key = ProgressRecord::key(owner_id, roadmap_id);
        let current = self.fetch(owner_id, roadmap_id).await?;
        let op = if current.contains(task_title) {
            "remove"
        } else {
            "add"
        };
        self.apply(&key, op, task_title).await
    }

    /// Open a live subscription to one pair's completion set.
    ///
    /// The worker fetches the current record, then follows the server's push
    /// stream; every snapshot replaces the observed set. On transport errors
    /// the last known state is retained (no flicker to empty) and the stream
    /// is re-opened after a short delay, until the handle is dropped.
    pub fn subscribe(&self, owner_id: &str, roadmap_id: &str) -> Subscription {
        let (tx, rx) = watch::channel(BTreeSet::new());
        let sync = self.clone();
        let owner = owner_id.to_string();
        let roadmap = roadmap_id.to_string();
        let worker = tokio::spawn(async move {
            let key = ProgressRecord::key(&owner, &roadmap);
            loop {
                if tx.is_closed() {
                    return;
                }
                // Fetch before (re)attaching the stream so a reconnect also
                // repairs anything missed while disconnected.
                match sync.fetch(&owner, &roadmap).await {
                    Ok(set) => {
                        let _ = tx.send(set);
                    }
                    Err(e) => tracing::warn!("progress fetch failed for {}: {}", key, e),
                }
                if let Err(e) = sync.follow(&key, &tx).await {
                    tracing::warn!("progress watch for {} interrupted: {}", key, e);
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });
        Subscription { rx, worker }
    }

    /// Consume one watch stream until it ends or errors, pushing every
    /// received record snapshot into the channel.
    async fn follow(&self, key: &str, tx: &watch::Sender<BTreeSet<String>>) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, &format!("/progress/{key}/watch"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Sync(format!("watch refused: {}", response.status())));
        }
        let mut stream = response.bytes_stream();
        let mut buf = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let line = line.trim_end();
                if let Some(data) = line.strip_prefix("data:") {
                    match serde_json::from_str::<ProgressRecord>(data.trim()) {
                        Ok(record) => {
                            let _ = tx.send(record.completed_tasks);
                        }
                        Err(e) => tracing::warn!("unparseable progress frame: {}", e),
                    }
                }
            }
        }
        Ok(())
    }
}

/// A live view of one pair's completion set. Dropping the handle tears down
/// the worker and the underlying stream.
pub struct Subscription {
    rx: watch::Receiver<BTreeSet<String>>,
    worker: JoinHandle<()>,
}

impl Subscription {
    /// Snapshot of the currently observed completion set.
    pub fn completed(&self) -> BTreeSet<String> {
        self.rx.borrow().clone()
    }

    /// Wait until the observed set changes.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Progress tracking for one (owner, roadmap) pair: a subscription plus the
/// toggle mutation, bound to the composite key.
pub struct ProgressTracker {
    sync: ProgressSync,
    key: String,
    subscription: Subscription,
}

impl ProgressTracker {
    /// Attach to a pair's progress record. Returns `None` when either the
    /// owner identity or the roadmap id is unavailable — a guest reviewing an
    /// unsaved roadmap has no progress tracking, which is expected rather
    /// than an error.
    pub fn attach(
        sync: &ProgressSync,
        owner_id: Option<&str>,
        roadmap_id: Option<&RoadmapId>,
    ) -> Option<Self> {
        let (owner, roadmap) = match (owner_id, roadmap_id) {
            (Some(o), Some(r)) => (o, r),
            _ => return None,
        };
        Some(Self {
            sync: sync.clone(),
            key: ProgressRecord::key(owner, roadmap.as_str()),
            subscription: sync.subscribe(owner, roadmap.as_str()),
        })
    }

    pub fn completed(&self) -> BTreeSet<String> {
        self.subscription.completed()
    }

    pub async fn changed(&mut self) -> bool {
        self.subscription.changed().await
    }

    /// Idempotent flip of one task title: remove it from the completion set
    /// when present, add it otherwise. Sent as a targeted operation, so
    /// concurrent toggles of other tasks are never clobbered.
    pub async fn toggle(&self, task_title: &str) -> Result<()> {
        let op = if self.completed().contains(task_title) {
            "remove"
        } else {
            "add"
        };
        self.sync.apply(&self.key, op, task_title).await
    }
}
