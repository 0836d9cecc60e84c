//! Template variable interpolation
//!
//! Supports `$name`, `${name}`, `${name:format}`, `[[name]]` and `[[name:format]]`.
//! Variables missing from scope are left as written.

use crate::query::request::ScopedVars;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::warn;

lazy_static! {
    static ref VARIABLE_PATTERN: Regex =
        Regex::new(r"\$(\w+)|\[\[(\w+?)(?::(\w+))?\]\]|\$\{(\w+)(?::([^}]+))?\}")
            .expect("variable pattern is valid");
}

/// How a variable's value is rendered into the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableFormat {
    Csv,
    Raw,
    Pipe,
    Json,
    DoubleQuote,
    SingleQuote,
}

impl VariableFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "csv" => Some(Self::Csv),
            "raw" => Some(Self::Raw),
            "pipe" => Some(Self::Pipe),
            "json" => Some(Self::Json),
            "doublequote" => Some(Self::DoubleQuote),
            "singlequote" => Some(Self::SingleQuote),
            _ => None,
        }
    }
}

/// Replace every known variable in `template`.
pub fn interpolate(template: &str, vars: &ScopedVars, default_format: VariableFormat) -> String {
    VARIABLE_PATTERN
        .replace_all(template, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let Some(var) = vars.get(name) else {
                return caps[0].to_string();
            };

            let format = match caps.get(3).or_else(|| caps.get(5)) {
                Some(fmt) => VariableFormat::parse(fmt.as_str()).unwrap_or_else(|| {
                    warn!("Unknown variable format '{}', using default", fmt.as_str());
                    default_format
                }),
                None => default_format,
            };

            if var.value.is_null() {
                format_value(&Value::String(var.text.clone()), format)
            } else {
                format_value(&var.value, format)
            }
        })
        .into_owned()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(values) => values.iter().map(scalar_text).collect(),
        other => vec![scalar_text(other)],
    }
}

fn format_value(value: &Value, format: VariableFormat) -> String {
    match format {
        VariableFormat::Csv | VariableFormat::Raw => items(value).join(","),
        VariableFormat::Pipe => items(value).join("|"),
        VariableFormat::Json => value.to_string(),
        VariableFormat::DoubleQuote => items(value)
            .iter()
            .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(","),
        VariableFormat::SingleQuote => items(value)
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "\\'")))
            .collect::<Vec<_>>()
            .join(","),
    }
}
