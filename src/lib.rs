//! Lake datasource for time-series charting
//!
//! Turns a time-range-bounded chart query into a lake query, runs it, checks
//! the shape of what came back and projects it into a typed frame.

pub mod config;
pub mod datasource;
pub mod error;
pub mod frame;
pub mod lake;
pub mod projection;
pub mod query;
pub mod shape;

pub use config::LakeConfig;
pub use datasource::{DataQueryResponse, HealthCheckResult, HealthStatus, LakeDatasource, TargetResult};
pub use error::{DatasourceError, Result};
pub use frame::{Frame, Notice};
pub use lake::{LakeClient, LakeEngine, LakeType, QueryResponse};
pub use projection::{PlottingType, ProjectedField};
pub use query::{DataQueryRequest, LakeQuery, ScopedVar, ScopedVars, TimeRange};
