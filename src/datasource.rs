//! Lake Datasource - Runs query targets end to end
//!
//! Each target goes through build → execute → classify → project → assemble
//! on its own task. Targets share nothing but the engine handle, so one
//! failing or hanging target never affects its siblings.

use crate::config::LakeConfig;
use crate::error::{DatasourceError, Result};
use crate::frame::{assemble, Frame, Notice};
use crate::lake::client::{LakeClient, LakeEngine};
use crate::projection::project;
use crate::query::builder::{build_query, time_check_query};
use crate::query::request::{DataQueryRequest, LakeQuery, ScopedVars, TimeRange};
use crate::shape::{classify, diagnose_empty, diagnostic_types, ShapeVerdict};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const NO_DATA_MESSAGE: &str = "No data points found to plot in this time range";

/// Failure of a single target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetError {
    pub message: String,
    /// Set for defects rather than user-correctable problems
    pub internal: bool,
}

/// Outcome of one target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResult {
    pub ref_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TargetError>,
}

impl TargetResult {
    fn new(ref_id: String, outcome: Result<Frame>) -> Self {
        match outcome {
            Ok(frame) => Self {
                ref_id,
                frame: Some(frame),
                error: None,
            },
            Err(e) => Self {
                ref_id,
                frame: None,
                error: Some(TargetError {
                    message: e.to_string(),
                    internal: e.is_internal(),
                }),
            },
        }
    }
}

/// One result per submitted target, in submission order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQueryResponse {
    pub data: Vec<TargetResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDetails {
    pub verbose_message: String,
}

/// Connectivity self-test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

pub struct LakeDatasource {
    engine: Arc<dyn LakeEngine>,
}

impl LakeDatasource {
    pub fn new(engine: Arc<dyn LakeEngine>) -> Self {
        Self { engine }
    }

    /// Datasource backed by the HTTP lake client
    pub fn from_config(config: &LakeConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(LakeClient::new(config)?)))
    }

    pub fn url(&self) -> &str {
        self.engine.url()
    }

    /// Run every target concurrently and collect one result per target.
    pub async fn query(&self, request: DataQueryRequest) -> DataQueryResponse {
        let range = request.range;
        let vars = Arc::new(request.scoped_vars);

        let handles: Vec<_> = request
            .targets
            .into_iter()
            .map(|target| {
                let engine = Arc::clone(&self.engine);
                let vars = Arc::clone(&vars);
                let ref_id = target.ref_id.clone();
                let handle = tokio::spawn(async move {
                    execute_target(engine.as_ref(), &target, &range, &vars).await
                });
                (ref_id, handle)
            })
            .collect();

        let mut data = Vec::with_capacity(handles.len());
        for (ref_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(DatasourceError::Internal(format!("Query task failed: {}", e))),
            };
            if let Err(e) = &outcome {
                error!("Target {} failed: {}", ref_id, e);
            }
            data.push(TargetResult::new(ref_id, outcome));
        }

        DataQueryResponse { data }
    }

    /// Run a single target on the current task.
    pub async fn query_target(
        &self,
        target: &LakeQuery,
        range: &TimeRange,
        vars: &ScopedVars,
    ) -> Result<Frame> {
        execute_target(self.engine.as_ref(), target, range, vars).await
    }

    pub async fn pools(&self) -> Result<Vec<String>> {
        self.engine.pools().await
    }

    /// Probe the lake's version endpoint.
    pub async fn test_datasource(&self) -> HealthCheckResult {
        match self.engine.version().await {
            Ok(version) => HealthCheckResult {
                status: HealthStatus::Success,
                message: format!("Success - Zed lake version {}", version),
                details: None,
            },
            Err(e) => {
                warn!("Lake health check failed: {}", e);
                let verbose_message = match e {
                    DatasourceError::Transport { message, .. } => message,
                    other => other.to_string(),
                };
                HealthCheckResult {
                    status: HealthStatus::Error,
                    message: format!("Failure - Could not contact Zed lake at {}", self.url()),
                    details: Some(HealthDetails { verbose_message }),
                }
            }
        }
    }
}

async fn execute_target(
    engine: &dyn LakeEngine,
    target: &LakeQuery,
    range: &TimeRange,
    vars: &ScopedVars,
) -> Result<Frame> {
    let Some(pool) = target.pool() else {
        return Err(missing_pool(engine).await);
    };
    let time_field = target.time_field();

    let query = build_query(pool, target, range, vars);
    let response = engine.query(&query).await?;

    let fields = match classify(&response.shapes)? {
        ShapeVerdict::Single(fields) => project(fields, time_field)?,
        ShapeVerdict::Empty => {
            info!(
                "Target {} returned no shapes, checking type of time field \"{}\"",
                target.ref_id, time_field
            );
            let diagnostic = engine.query(&time_check_query(pool, time_field)).await?;
            diagnose_empty(time_field, &diagnostic_types(&diagnostic.records))?;
            return Ok(Frame::empty(target.ref_id.clone(), Notice::info(NO_DATA_MESSAGE)));
        }
    };

    Ok(assemble(target.ref_id.clone(), fields, &response.records))
}

async fn missing_pool(engine: &dyn LakeEngine) -> DatasourceError {
    let url = engine.url().to_string();
    match engine.pools().await {
        Ok(pools) if pools.is_empty() => DatasourceError::NoPools { url },
        Ok(pools) => DatasourceError::MissingPool { url, pools },
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lake::client::QueryResponse;
    use crate::lake::types::{Field, LakeType};
    use crate::projection::PlottingType;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers queries by pool name and records every query it sees
    #[derive(Default)]
    struct FakeLake {
        pools: Vec<String>,
        primary: HashMap<String, QueryResponse>,
        diagnostics: HashMap<String, QueryResponse>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeLake {
        fn pool_of(query: &str) -> String {
            query.split('"').nth(1).unwrap_or_default().to_string()
        }
    }

    #[async_trait]
    impl LakeEngine for FakeLake {
        fn url(&self) -> &str {
            "http://fake:9867"
        }

        async fn query(&self, query: &str) -> Result<QueryResponse> {
            self.seen.lock().unwrap().push(query.to_string());
            let pool = Self::pool_of(query);
            let table = if query.contains("union(typeof(") {
                &self.diagnostics
            } else {
                &self.primary
            };
            table
                .get(&pool)
                .cloned()
                .ok_or_else(|| DatasourceError::Engine(format!("pool not found: {}", pool)))
        }

        async fn pools(&self) -> Result<Vec<String>> {
            Ok(self.pools.clone())
        }

        async fn version(&self) -> Result<String> {
            Err(DatasourceError::transport(self.url(), "connection refused"))
        }
    }

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    fn net_shape() -> LakeType {
        LakeType::record(vec![
            Field::new("ts", LakeType::primitive("time")),
            Field::new("bytes", LakeType::primitive("uint64")),
            Field::new("", LakeType::primitive("string")),
        ])
    }

    #[tokio::test]
    async fn test_single_shape_produces_frame() {
        let mut lake = FakeLake::default();
        lake.primary.insert(
            "net".to_string(),
            QueryResponse {
                records: vec![json!({"ts": 1704067200000i64, "bytes": 42, "": "x"})],
                shapes: vec![net_shape()],
            },
        );
        let datasource = LakeDatasource::new(Arc::new(lake));

        let target = LakeQuery::new("A").with_pool("net");
        let frame = datasource
            .query_target(&target, &range(), &ScopedVars::new())
            .await
            .unwrap();

        assert_eq!(frame.ref_id, "A");
        assert_eq!(frame.fields[0].plotting_type, PlottingType::Time);
        assert_eq!(frame.fields[2].name, "(empty string)");
        assert_eq!(frame.rows, vec![vec![json!(1704067200000i64), json!(42), json!("x")]]);
    }

    #[tokio::test]
    async fn test_missing_pool_lists_available() {
        let lake = FakeLake {
            pools: vec!["a".to_string(), "b".to_string()],
            ..FakeLake::default()
        };
        let datasource = LakeDatasource::new(Arc::new(lake));

        let err = datasource
            .query_target(&LakeQuery::new("A"), &range(), &ScopedVars::new())
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with(": a, b"));
    }

    #[tokio::test]
    async fn test_missing_pool_with_empty_lake() {
        let datasource = LakeDatasource::new(Arc::new(FakeLake::default()));
        let err = datasource
            .query_target(&LakeQuery::new("A"), &range(), &ScopedVars::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No pools found in lake at http://fake:9867");
    }

    #[tokio::test]
    async fn test_empty_result_with_time_typed_field() {
        let mut lake = FakeLake::default();
        lake.primary.insert("net".to_string(), QueryResponse::default());
        lake.diagnostics.insert(
            "net".to_string(),
            QueryResponse {
                records: vec![json!(["time"])],
                shapes: vec![LakeType::Set {
                    inner: Box::new(LakeType::primitive("type")),
                }],
            },
        );
        let lake = Arc::new(lake);
        let datasource = LakeDatasource::new(lake.clone());

        let frame = datasource
            .query_target(&LakeQuery::new("A").with_pool("net"), &range(), &ScopedVars::new())
            .await
            .unwrap();
        assert!(frame.fields.is_empty());
        assert_eq!(frame.notices[0].text, NO_DATA_MESSAGE);

        let seen = lake.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], "from \"net\" | union(typeof(ts))");
    }

    #[tokio::test]
    async fn test_empty_result_with_string_time_field() {
        let mut lake = FakeLake::default();
        lake.primary.insert("net".to_string(), QueryResponse::default());
        lake.diagnostics.insert(
            "net".to_string(),
            QueryResponse {
                records: vec![json!(["string"])],
                shapes: Vec::new(),
            },
        );
        let datasource = LakeDatasource::new(Arc::new(lake));

        let err = datasource
            .query_target(&LakeQuery::new("A").with_pool("net"), &range(), &ScopedVars::new())
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("must be Zed <time> type, but detected type(s): string"));
    }

    #[tokio::test]
    async fn test_targets_fail_independently() {
        let mut lake = FakeLake::default();
        lake.primary.insert(
            "net".to_string(),
            QueryResponse {
                records: vec![json!({"ts": 1, "bytes": 2, "": "z"})],
                shapes: vec![net_shape()],
            },
        );
        lake.primary.insert(
            "mixed".to_string(),
            QueryResponse {
                records: vec![json!({"a": 1}), json!({"b": "x"})],
                shapes: vec![
                    LakeType::record(vec![Field::new("a", LakeType::primitive("int64"))]),
                    LakeType::record(vec![Field::new("b", LakeType::primitive("string"))]),
                ],
            },
        );
        let datasource = LakeDatasource::new(Arc::new(lake));

        let request = DataQueryRequest {
            targets: vec![
                LakeQuery::new("A").with_pool("mixed"),
                LakeQuery::new("B").with_pool("net"),
                LakeQuery::new("C").with_pool("gone"),
            ],
            range: range(),
            scoped_vars: ScopedVars::new(),
        };
        let response = datasource.query(request).await;

        let ref_ids: Vec<&str> = response.data.iter().map(|r| r.ref_id.as_str()).collect();
        assert_eq!(ref_ids, vec!["A", "B", "C"]);

        let a = response.data[0].error.as_ref().unwrap();
        assert!(a.message.contains("More than one shape detected"));
        assert!(!a.internal);

        assert_eq!(response.data[1].frame.as_ref().unwrap().row_count(), 1);
        assert!(response.data[1].error.is_none());

        assert_eq!(
            response.data[2].error.as_ref().unwrap().message,
            "Query error: pool not found: gone"
        );
    }

    #[tokio::test]
    async fn test_primitive_shape_is_fatal() {
        let mut lake = FakeLake::default();
        lake.primary.insert(
            "net".to_string(),
            QueryResponse {
                records: vec![json!(1), json!(1)],
                shapes: vec![LakeType::primitive("int64")],
            },
        );
        let datasource = LakeDatasource::new(Arc::new(lake));

        let err = datasource
            .query_target(&LakeQuery::new("A").with_pool("net"), &range(), &ScopedVars::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DatasourceError::MalformedResponse(_)));
        assert!(err.is_internal());
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let datasource = LakeDatasource::new(Arc::new(FakeLake::default()));
        let result = datasource.test_datasource().await;

        assert_eq!(result.status, HealthStatus::Error);
        assert_eq!(result.message, "Failure - Could not contact Zed lake at http://fake:9867");
        assert_eq!(
            result.details.unwrap().verbose_message,
            "connection refused"
        );
    }
}
