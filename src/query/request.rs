//! Caller-facing request types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_QUERY_TEXT: &str = "*";
pub const DEFAULT_TIME_FIELD: &str = "ts";

/// One query target, as captured by the query editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LakeQuery {
    #[serde(default)]
    pub ref_id: String,

    /// Pool in `pool[@branch]` form
    #[serde(default)]
    pub pool: Option<String>,

    #[serde(default)]
    pub query_text: Option<String>,

    #[serde(default)]
    pub time_field: Option<String>,
}

impl LakeQuery {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            ..Self::default()
        }
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn with_query_text(mut self, text: impl Into<String>) -> Self {
        self.query_text = Some(text.into());
        self
    }

    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = Some(field.into());
        self
    }

    /// The pool, if one was given. Blank input counts as missing.
    pub fn pool(&self) -> Option<&str> {
        self.pool.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn query_text(&self) -> &str {
        non_empty_or(self.query_text.as_deref(), DEFAULT_QUERY_TEXT)
    }

    pub fn time_field(&self) -> &str {
        non_empty_or(self.time_field.as_deref(), DEFAULT_TIME_FIELD)
    }
}

fn non_empty_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

/// Absolute time range selected in the host tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }
}

/// A template variable value scoped to the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedVar {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ScopedVar {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        let value = value.into();
        let text = match &value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self { text, value }
    }
}

pub type ScopedVars = HashMap<String, ScopedVar>;

/// A batch of targets sharing one time range and variable scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQueryRequest {
    pub targets: Vec<LakeQuery>,
    pub range: TimeRange,
    #[serde(default)]
    pub scoped_vars: ScopedVars,
}
