//! Query Module - Request types and lake query construction

pub mod builder;
pub mod request;
pub mod template;

pub use builder::{build_query, format_time, time_check_query};
pub use request::{DataQueryRequest, LakeQuery, ScopedVar, ScopedVars, TimeRange};
pub use template::{interpolate, VariableFormat};
