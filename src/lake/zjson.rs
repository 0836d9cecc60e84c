//! ZJSON Decoding
//!
//! The lake streams query results as newline-delimited ZJSON. Data lines are
//! `{"type": <type>, "value": <value>}`; type definitions carry numeric ids that
//! later lines reference with `{"kind":"ref","id":N}`. With control messages
//! enabled, lines whose `type` is a plain string report channel state, stats
//! and query errors.

use crate::error::{DatasourceError, Result};
use crate::lake::client::QueryResponse;
use crate::lake::types::{Field, LakeType};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum WireType {
    Primitive {
        name: String,
    },
    Record {
        id: u32,
        fields: Vec<WireField>,
    },
    Array {
        id: u32,
        #[serde(rename = "type")]
        inner: Box<WireType>,
    },
    Set {
        id: u32,
        #[serde(rename = "type")]
        inner: Box<WireType>,
    },
    Map {
        id: u32,
        key_type: Box<WireType>,
        val_type: Box<WireType>,
    },
    Union {
        id: u32,
        types: Vec<WireType>,
    },
    Enum {
        id: u32,
        symbols: Vec<String>,
    },
    Error {
        id: u32,
        #[serde(rename = "type")]
        inner: Box<WireType>,
    },
    Named {
        id: u32,
        name: String,
        #[serde(rename = "type")]
        inner: Box<WireType>,
    },
    Ref {
        id: u32,
    },
}

#[derive(Debug, Deserialize)]
struct WireField {
    name: String,
    #[serde(rename = "type")]
    ty: WireType,
}

/// Per-response type context
#[derive(Debug, Default)]
pub struct Decoder {
    types: HashMap<u32, LakeType>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a whole response body into values and the distinct shapes seen.
    pub fn decode_stream(&mut self, body: &str) -> Result<QueryResponse> {
        let mut response = QueryResponse::default();

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: Value = serde_json::from_str(line).map_err(|e| {
                DatasourceError::MalformedResponse(format!("Unparseable ZJSON line: {}", e))
            })?;

            match message.get("type") {
                Some(Value::String(kind)) => self.handle_control(kind, message.get("value"))?,
                Some(wire) => {
                    let ty = self.decode_wire_type(wire)?;
                    let raw = message.get("value").unwrap_or(&Value::Null);
                    let value = self.decode_value(&ty, raw)?;
                    if !response.shapes.contains(&ty) {
                        debug!("New shape in response: {}", ty);
                        response.shapes.push(ty);
                    }
                    response.records.push(value);
                }
                None => {
                    return Err(DatasourceError::MalformedResponse(
                        "ZJSON line has no type".to_string(),
                    ))
                }
            }
        }

        Ok(response)
    }

    fn handle_control(&self, kind: &str, value: Option<&Value>) -> Result<()> {
        match kind {
            "QueryError" => {
                let message = value
                    .and_then(|v| v.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown query error");
                Err(DatasourceError::Engine(message.to_string()))
            }
            other => {
                debug!("Control message {}: {:?}", other, value);
                Ok(())
            }
        }
    }

    fn decode_wire_type(&mut self, raw: &Value) -> Result<LakeType> {
        let wire: WireType = serde_json::from_value(raw.clone()).map_err(|e| {
            DatasourceError::MalformedResponse(format!("Unrecognized ZJSON type: {}", e))
        })?;
        self.resolve(wire)
    }

    fn resolve(&mut self, wire: WireType) -> Result<LakeType> {
        let (id, ty) = match wire {
            WireType::Primitive { name } => return Ok(LakeType::Primitive { name }),
            WireType::Ref { id } => {
                return self.types.get(&id).cloned().ok_or_else(|| {
                    DatasourceError::MalformedResponse(format!("Reference to undefined type {}", id))
                })
            }
            WireType::Record { id, fields } => {
                let fields = fields
                    .into_iter()
                    .map(|f| Ok(Field::new(f.name, self.resolve(f.ty)?)))
                    .collect::<Result<Vec<_>>>()?;
                (id, LakeType::Record { fields })
            }
            WireType::Array { id, inner } => (
                id,
                LakeType::Array {
                    inner: Box::new(self.resolve(*inner)?),
                },
            ),
            WireType::Set { id, inner } => (
                id,
                LakeType::Set {
                    inner: Box::new(self.resolve(*inner)?),
                },
            ),
            WireType::Map {
                id,
                key_type,
                val_type,
            } => (
                id,
                LakeType::Map {
                    key: Box::new(self.resolve(*key_type)?),
                    value: Box::new(self.resolve(*val_type)?),
                },
            ),
            WireType::Union { id, types } => {
                let types = types
                    .into_iter()
                    .map(|t| self.resolve(t))
                    .collect::<Result<Vec<_>>>()?;
                (id, LakeType::Union { types })
            }
            WireType::Enum { id, symbols } => (id, LakeType::Enum { symbols }),
            WireType::Error { id, inner } => (
                id,
                LakeType::Error {
                    inner: Box::new(self.resolve(*inner)?),
                },
            ),
            WireType::Named { id, name, inner } => (
                id,
                LakeType::Named {
                    name,
                    inner: Box::new(self.resolve(*inner)?),
                },
            ),
        };
        self.types.insert(id, ty.clone());
        Ok(ty)
    }

    /// Convert a wire value of type `ty` into a plain JSON value.
    pub fn decode_value(&mut self, ty: &LakeType, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        match ty {
            LakeType::Primitive { name } if name == "type" => {
                Ok(Value::String(self.decode_wire_type(raw)?.to_string()))
            }
            LakeType::Primitive { name } => {
                let text = raw.as_str().ok_or_else(|| {
                    DatasourceError::MalformedResponse(format!(
                        "Expected string encoding for {} value, got {}",
                        name, raw
                    ))
                })?;
                decode_primitive(name, text)
            }
            LakeType::Record { fields } => {
                let items = expect_array(raw, "record")?;
                let mut object = Map::new();
                for (field, item) in fields.iter().zip(items) {
                    object.insert(field.name.clone(), self.decode_value(&field.ty, item)?);
                }
                Ok(Value::Object(object))
            }
            LakeType::Array { inner } | LakeType::Set { inner } => {
                let items = expect_array(raw, "array")?;
                let decoded = items
                    .iter()
                    .map(|item| self.decode_value(inner, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(decoded))
            }
            LakeType::Map { key, value } => {
                let entries = expect_array(raw, "map")?;
                let mut decoded = Vec::with_capacity(entries.len());
                for entry in entries {
                    let pair = expect_array(entry, "map entry")?;
                    if pair.len() != 2 {
                        return Err(DatasourceError::MalformedResponse(
                            "Map entry is not a key/value pair".to_string(),
                        ));
                    }
                    let mut object = Map::new();
                    object.insert("key".to_string(), self.decode_value(key, &pair[0])?);
                    object.insert("value".to_string(), self.decode_value(value, &pair[1])?);
                    decoded.push(Value::Object(object));
                }
                Ok(Value::Array(decoded))
            }
            LakeType::Union { types } => {
                let pair = expect_array(raw, "union")?;
                let tag = pair
                    .first()
                    .and_then(Value::as_str)
                    .and_then(|t| t.parse::<usize>().ok())
                    .ok_or_else(|| {
                        DatasourceError::MalformedResponse("Union value has no tag".to_string())
                    })?;
                let member = types.get(tag).ok_or_else(|| {
                    DatasourceError::MalformedResponse(format!("Union tag {} out of range", tag))
                })?;
                self.decode_value(member, pair.get(1).unwrap_or(&Value::Null))
            }
            LakeType::Enum { symbols } => {
                let symbol = raw
                    .as_str()
                    .and_then(|i| i.parse::<usize>().ok())
                    .and_then(|i| symbols.get(i))
                    .ok_or_else(|| {
                        DatasourceError::MalformedResponse(format!("Bad enum value {}", raw))
                    })?;
                Ok(Value::String(symbol.clone()))
            }
            LakeType::Error { inner } | LakeType::Named { inner, .. } => {
                self.decode_value(inner, raw)
            }
        }
    }
}

fn expect_array<'a>(raw: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    raw.as_array().ok_or_else(|| {
        DatasourceError::MalformedResponse(format!("Expected array encoding for {} value", what))
    })
}

fn decode_primitive(name: &str, text: &str) -> Result<Value> {
    let value = match name {
        "int8" | "int16" | "int32" | "int64" | "int128" | "int256" | "uint8" | "uint16"
        | "uint32" | "uint64" | "uint128" | "uint256" => {
            if let Ok(n) = text.parse::<i64>() {
                Value::from(n)
            } else if let Ok(n) = text.parse::<u64>() {
                Value::from(n)
            } else {
                Value::String(text.to_string())
            }
        }
        "float16" | "float32" | "float64" | "float128" | "float256" | "decimal32"
        | "decimal64" | "decimal128" | "decimal256" => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        "bool" => Value::Bool(text == "true"),
        "time" => {
            let ts = DateTime::parse_from_rfc3339(text).map_err(|e| {
                DatasourceError::MalformedResponse(format!("Bad time value {}: {}", text, e))
            })?;
            Value::from(ts.timestamp_millis())
        }
        "null" => Value::Null,
        _ => Value::String(text.to_string()),
    };
    Ok(value)
}
