use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::inference::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::inference::GeminiConfig;
use crate::models::RewardRange;

pub const API_KEY_VAR: &str = "API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub reward_range: RewardRange,
    pub status_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            reward_range: RewardRange::default(),
            status_interval_ms: 1500,
            request_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Defaults, then the JSON file at `path` if given, then `API_KEY`.
    /// Nothing is ever written back.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_VAR) {
            config.apply_api_key(key);
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config in {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    fn apply_api_key(&mut self, key: String) {
        let key = key.trim();
        if !key.is_empty() {
            self.api_key = Some(key.to_string());
        }
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn gemini(&self) -> Result<GeminiConfig> {
        let api_key = self
            .api_key
            .clone()
            .with_context(|| format!("no API key configured; set {API_KEY_VAR}"))?;

        Ok(GeminiConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key,
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}
