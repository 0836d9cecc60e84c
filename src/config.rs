//! Datasource configuration

use crate::error::{DatasourceError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LAKE_URL: &str = "http://localhost:9867";

/// Connection settings for the lake service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LakeConfig {
    pub url: String,
}

/// Settings object as stored by the host tool (`jsonData`)
#[derive(Debug, Clone, Default, Deserialize)]
struct JsonData {
    #[serde(default)]
    url: Option<String>,
}

impl LakeConfig {
    /// Blank URLs fall back to the default; trailing slashes are dropped.
    pub fn new(url: impl AsRef<str>) -> Self {
        let url = url.as_ref().trim();
        let url = if url.is_empty() { DEFAULT_LAKE_URL } else { url };
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Create config from environment variables (`LAKE_URL`)
    pub fn from_env() -> Self {
        let url = std::env::var("LAKE_URL").unwrap_or_default();
        Self::new(url)
    }

    /// Create config from the host tool's saved datasource settings
    pub fn from_json_data(json: &serde_json::Value) -> Result<Self> {
        let data: JsonData = serde_json::from_value(json.clone())
            .map_err(|e| DatasourceError::Config(format!("Invalid datasource settings: {}", e)))?;
        Ok(Self::new(data.url.unwrap_or_default()))
    }
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LAKE_URL)
    }
}
