use serde::{Deserialize, Serialize};

/// The recommendation endpoint's response for one task.
///
/// Only `selected_video` is interpreted; every other field of the provider
/// payload is carried through untouched so the persisted document keeps the
/// full response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_video: Option<SelectedVideo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The provider's best-matching tutorial video for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedVideo {
    pub url: String,
    pub title: String,
    pub channel: String,
    /// Video duration as `MM:SS` or `HH:MM:SS`, when the provider supplies
    /// one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
