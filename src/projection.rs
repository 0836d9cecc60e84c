//! Type Projection
//!
//! Maps each field of the accepted shape to a plotting type and orders the
//! fields so the time field leads. Charting hosts pick the leftmost time
//! column as the x axis, so the requested time field always goes first.

use crate::error::{DatasourceError, Result};
use crate::lake::types::Field;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Display label for a field whose name is the empty string
pub const EMPTY_NAME_PLACEHOLDER: &str = "(empty string)";

/// Column types understood by the charting frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlottingType {
    Time,
    Number,
    String,
    Boolean,
}

impl PlottingType {
    /// Fixed classification of declared type names. Anything not listed has no column.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "uint8" | "uint16" | "uint32" | "uint64" | "uint128" | "uint256" | "int8" | "int16"
            | "int32" | "int64" | "int128" | "int256" | "float16" | "float32" | "float64"
            | "float128" | "float256" | "decimal32" | "decimal64" | "decimal128"
            | "decimal256" => Some(PlottingType::Number),
            "string" | "ip" | "net" | "type" | "bytes" | "duration" => Some(PlottingType::String),
            "time" => Some(PlottingType::Time),
            "bool" => Some(PlottingType::Boolean),
            _ => None,
        }
    }
}

/// A column of the output schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedField {
    /// Label shown to the user
    pub name: String,
    /// Key used to read values from raw records
    #[serde(skip)]
    pub source: String,
    #[serde(rename = "type")]
    pub plotting_type: PlottingType,
}

impl ProjectedField {
    pub fn new(source: &str, plotting_type: PlottingType) -> Self {
        let name = if source.is_empty() {
            EMPTY_NAME_PLACEHOLDER
        } else {
            source
        };
        Self {
            name: name.to_string(),
            source: source.to_string(),
            plotting_type,
        }
    }
}

/// Project a shape's fields into the output schema.
pub fn project(fields: &[Field], time_field: &str) -> Result<Vec<ProjectedField>> {
    let mut projected: Vec<ProjectedField> = Vec::with_capacity(fields.len());

    for field in fields {
        let type_name = field
            .ty
            .name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                DatasourceError::MalformedResponse(format!(
                    "Query response contains a Zed type with no name (field \"{}\" of type {})",
                    field.name, field.ty
                ))
            })?;

        if field.name == time_field {
            projected.insert(0, ProjectedField::new(&field.name, PlottingType::Time));
            continue;
        }

        match PlottingType::from_type_name(type_name) {
            Some(plotting_type) => projected.push(ProjectedField::new(&field.name, plotting_type)),
            None => debug!("Dropping field \"{}\" of unplottable type {}", field.name, type_name),
        }
    }

    Ok(projected)
}
