use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::VideoResource;

/// Prefix distinguishing locally persisted roadmap ids from remote ones.
const LOCAL_ID_PREFIX: &str = "local_";

/// Requested difficulty of a generated roadmap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Beginner" => Some(Self::Beginner),
            "Intermediate" => Some(Self::Intermediate),
            "Advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The generation endpoint's roadmap payload: an ordered list of modules.
///
/// Module order is significant (insertion order = learning order), as is task
/// order within a module.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoadmapContent {
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl RoadmapContent {
    /// Iterate over every task of every module, in learning order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.modules.iter().flat_map(|m| m.tasks.iter())
    }

    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }
}

/// One thematic unit of a roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "module_title")]
    pub title: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A single learning task.
///
/// `title` is unique within a roadmap (a generation-endpoint contract) and is
/// the key used for both video enrichment and progress tracking. Renaming a
/// task title orphans its progress entry; this is a documented limitation of
/// the title-keyed model, not something the crate repairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_minutes: f64,
}

/// Identifier of a persisted roadmap, tagged by the backend that owns it.
///
/// The tag is resolved exactly once, when an id string enters the system;
/// every later dispatch matches on the variant instead of re-inspecting the
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoadmapId {
    /// Stored in the on-device guest database. String form `local_<millis>`.
    Local(String),
    /// Stored in the remote roadmap collection; the server assigned the id.
    Remote(String),
}

impl RoadmapId {
    /// Classify a raw id string. This is the only place the prefix is
    /// inspected.
    pub fn parse(s: &str) -> Self {
        if s.starts_with(LOCAL_ID_PREFIX) {
            Self::Local(s.to_string())
        } else {
            Self::Remote(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Local(s) | Self::Remote(s) => s,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for RoadmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoadmapId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for RoadmapId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoadmapId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// The document body persisted when the user starts learning: the generated
/// modules plus whatever video resources had arrived by then, keyed by task
/// title. Read-only once saved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SavedContent {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(rename = "videoResources", default)]
    pub video_resources: HashMap<String, VideoResource>,
}

/// Persistence payload for a not-yet-saved roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapDraft {
    pub topic: String,
    pub goal: String,
    pub difficulty: Difficulty,
    pub content: SavedContent,
}

/// A persisted roadmap, as returned by either backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRoadmap {
    pub id: RoadmapId,
    pub topic: String,
    pub goal: String,
    pub difficulty: Difficulty,
    pub content: SavedContent,
    pub created_at: DateTime<Utc>,
}

impl SavedRoadmap {
    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }
}
