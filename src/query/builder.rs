//! Query Builder - Assembles lake queries from a target and the selected time range

use crate::query::request::{LakeQuery, ScopedVars, TimeRange};
use crate::query::template::{interpolate, VariableFormat};
use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp the way the lake expects range literals, e.g.
/// `2024-01-01T00:00:00.000Z`.
pub fn format_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn quote_pool(pool: &str) -> String {
    format!("\"{}\"", pool.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Build the range-bounded, time-sorted query for one target.
///
/// The caller must have resolved the pool already; there is no fallback pool.
pub fn build_query(pool: &str, query: &LakeQuery, range: &TimeRange, vars: &ScopedVars) -> String {
    let time_field = query.time_field();
    let whole = format!(
        "from {} | {tf} > {} and {tf} < {} | {} | sort {tf}",
        quote_pool(pool),
        format_time(&range.from),
        format_time(&range.to),
        query.query_text(),
        tf = time_field,
    );
    interpolate(&whole, vars, VariableFormat::Csv)
}

/// Query listing the distinct types the time field takes across the whole pool.
pub fn time_check_query(pool: &str, time_field: &str) -> String {
    format!("from {} | union(typeof({}))", quote_pool(pool), time_field)
}
