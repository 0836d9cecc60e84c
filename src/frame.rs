//! Frame Assembly - Rows aligned to the projected schema
//!
//! Rows are built positionally from the raw records, reading each column by
//! the field's original name. Values pass through exactly as decoded; typing
//! is only enforced when materializing columns with `to_dataframe`.

use crate::error::{DatasourceError, Result};
use crate::projection::{PlottingType, ProjectedField};
use chrono::DateTime;
use polars::prelude::{DataFrame, DataType, NamedFrom, Series, TimeUnit};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Info,
}

/// Informational message attached to a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Info,
            text: text.into(),
        }
    }
}

/// Typed tabular result for one query target
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub ref_id: String,
    pub fields: Vec<ProjectedField>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl Frame {
    /// A frame with no columns, explaining why
    pub fn empty(ref_id: impl Into<String>, notice: Notice) -> Self {
        Self {
            ref_id: ref_id.into(),
            fields: Vec::new(),
            rows: Vec::new(),
            notices: vec![notice],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Materialize one homogeneous column per field.
    ///
    /// Time columns hold epoch milliseconds; values that do not fit a column's
    /// type become null.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns = self
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| self.column(idx, field))
            .collect::<Result<Vec<_>>>()?;

        DataFrame::new(columns)
            .map_err(|e| DatasourceError::Frame(format!("Failed to create DataFrame: {}", e)))
    }

    fn column(&self, idx: usize, field: &ProjectedField) -> Result<Series> {
        let values = self.rows.iter().map(|row| row.get(idx).unwrap_or(&Value::Null));
        let name = field.name.as_str();

        let series = match field.plotting_type {
            PlottingType::Number => {
                Series::new(name, values.map(as_number).collect::<Vec<Option<f64>>>())
            }
            PlottingType::Boolean => {
                Series::new(name, values.map(Value::as_bool).collect::<Vec<Option<bool>>>())
            }
            PlottingType::String => {
                Series::new(name, values.map(as_text).collect::<Vec<Option<String>>>())
            }
            PlottingType::Time => {
                Series::new(name, values.map(as_millis).collect::<Vec<Option<i64>>>())
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                    .map_err(|e| {
                        DatasourceError::Frame(format!("Failed to build time column {}: {}", name, e))
                    })?
            }
        };
        Ok(series)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.timestamp_millis()),
        _ => None,
    }
}

/// Build rows in record order, one value per projected field.
pub fn assemble(ref_id: impl Into<String>, fields: Vec<ProjectedField>, records: &[Value]) -> Frame {
    let rows = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| {
                    record
                        .get(field.source.as_str())
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect()
        })
        .collect();

    Frame {
        ref_id: ref_id.into(),
        fields,
        rows,
        notices: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Vec<ProjectedField> {
        vec![
            ProjectedField::new("ts", PlottingType::Time),
            ProjectedField::new("bytes", PlottingType::Number),
            ProjectedField::new("", PlottingType::String),
        ]
    }

    #[test]
    fn test_assemble_reads_placeholder_from_empty_key() {
        let records = vec![json!({"ts": 1704067200000i64, "bytes": 42, "": "x"})];
        let frame = assemble("A", schema(), &records);

        assert_eq!(frame.fields[2].name, "(empty string)");
        assert_eq!(frame.rows, vec![vec![json!(1704067200000i64), json!(42), json!("x")]]);
    }

    #[test]
    fn test_assemble_preserves_order_and_fills_missing() {
        let records = vec![
            json!({"ts": 1, "bytes": 10}),
            json!({"ts": 2, "": "y", "extra": true}),
            json!({"ts": 3, "bytes": "big", "": null}),
        ];
        let frame = assemble("A", schema(), &records);

        assert_eq!(frame.row_count(), 3);
        assert_eq!(frame.rows[0], vec![json!(1), json!(10), Value::Null]);
        assert_eq!(frame.rows[1], vec![json!(2), Value::Null, json!("y")]);
        // values are not coerced
        assert_eq!(frame.rows[2], vec![json!(3), json!("big"), Value::Null]);
    }

    #[test]
    fn test_to_dataframe_types() {
        let records = vec![
            json!({"ts": 1704067200000i64, "bytes": 42, "": "x"}),
            json!({"ts": "2024-01-01T00:00:01Z", "bytes": "7.5", "": 3}),
        ];
        let df = assemble("A", schema(), &records).to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), vec!["ts", "bytes", "(empty string)"]);
        assert!(matches!(
            df.column("ts").unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, _)
        ));
        assert_eq!(df.column("bytes").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("(empty string)").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_empty_frame_serialization() {
        let frame = Frame::empty("B", Notice::info("No data points found to plot in this time range"));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            json!({
                "refId": "B",
                "fields": [],
                "rows": [],
                "notices": [{"severity": "info", "text": "No data points found to plot in this time range"}]
            })
        );
    }

    #[test]
    fn test_schema_serialization() {
        let frame = assemble("A", schema(), &[]);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json["fields"],
            json!([
                {"name": "ts", "type": "time"},
                {"name": "bytes", "type": "number"},
                {"name": "(empty string)", "type": "string"}
            ])
        );
    }
}
