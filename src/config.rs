//! Engine configuration, loaded from `~/.accountpulse/config.json`.
//!
//! Every provider block is optional. A missing block means that provider is
//! not configured: the dependent feature reports itself as unavailable and
//! the rest of the engine keeps working.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crm: Option<ProviderCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<ProviderCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_tracker: Option<ProviderCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<ProviderCredentials>,
    /// Max accounts processed concurrently by batch jobs.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Windowed-trend lookback in days when the caller doesn't specify one.
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_trend_window_days() -> i64 {
    7
}

impl EngineConfig {
    /// Resolve the default config path: `~/.accountpulse/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".accountpulse").join("config.json"))
    }

    /// Load from the default path. A missing file yields the default config
    /// (nothing configured) rather than an error.
    pub fn load() -> Result<Self, EngineError> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Validation(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            EngineError::Validation(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn crm_configured(&self) -> bool {
        self.crm.is_some()
    }

    pub fn billing_configured(&self) -> bool {
        self.billing.is_some()
    }

    pub fn advisory_configured(&self) -> bool {
        self.advisory.is_some()
    }
}
