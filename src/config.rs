//! Endpoint configuration.
//!
//! All collaborator services are plain HTTP endpoints. Configuration is via
//! environment variables:
//! - `SKILLTRAIL_GENERATOR_URL` - roadmap generation endpoint
//! - `SKILLTRAIL_RECOMMENDER_URL` - per-task video recommendation endpoint
//! - `SKILLTRAIL_SYNC_URL` - base URL of the remote persistence/progress API
//! - `SKILLTRAIL_API_KEY` - bearer key for the remote API (optional)
//! - `SKILLTRAIL_DATA_DIR` - override for the local guest database directory

use std::path::PathBuf;

/// Default URLs for local development.
const DEFAULT_GENERATOR_URL: &str = "http://localhost:8600/orchestrate";
const DEFAULT_RECOMMENDER_URL: &str = "http://localhost:8601/recommend";
const DEFAULT_SYNC_URL: &str = "http://localhost:8602/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub generator_url: String,
    pub recommender_url: String,
    pub sync_url: String,
    pub api_key: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Read configuration from environment variables, falling back to
    /// local-development defaults.
    pub fn from_env() -> Self {
        Self {
            generator_url: std::env::var("SKILLTRAIL_GENERATOR_URL")
                .unwrap_or_else(|_| DEFAULT_GENERATOR_URL.to_string()),
            recommender_url: std::env::var("SKILLTRAIL_RECOMMENDER_URL")
                .unwrap_or_else(|_| DEFAULT_RECOMMENDER_URL.to_string()),
            sync_url: std::env::var("SKILLTRAIL_SYNC_URL")
                .unwrap_or_else(|_| DEFAULT_SYNC_URL.to_string()),
            api_key: std::env::var("SKILLTRAIL_API_KEY").ok(),
            data_dir: std::env::var("SKILLTRAIL_DATA_DIR").ok().map(PathBuf::from),
        }
    }
}
