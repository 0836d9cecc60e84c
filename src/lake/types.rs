//! Lake Types - Self-describing type descriptors carried by query responses
//!
//! Every value the lake returns is tagged with one of these descriptors. Only
//! primitive and named descriptors carry a name; the complex kinds are
//! described structurally.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: LakeType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: LakeType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Dynamic type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LakeType {
    Primitive { name: String },
    Record { fields: Vec<Field> },
    Array { inner: Box<LakeType> },
    Set { inner: Box<LakeType> },
    Map { key: Box<LakeType>, value: Box<LakeType> },
    Union { types: Vec<LakeType> },
    Enum { symbols: Vec<String> },
    Error { inner: Box<LakeType> },
    Named { name: String, inner: Box<LakeType> },
}

impl LakeType {
    pub fn primitive(name: impl Into<String>) -> Self {
        LakeType::Primitive { name: name.into() }
    }

    pub fn named(name: impl Into<String>, inner: LakeType) -> Self {
        LakeType::Named {
            name: name.into(),
            inner: Box::new(inner),
        }
    }

    pub fn record(fields: Vec<Field>) -> Self {
        LakeType::Record { fields }
    }

    /// The declared type name, if this descriptor has one.
    ///
    /// A named type reports its alias, not the name of the type it wraps.
    pub fn name(&self) -> Option<&str> {
        match self {
            LakeType::Primitive { name } | LakeType::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Record fields, or an empty slice for every other kind.
    pub fn fields(&self) -> &[Field] {
        match self {
            LakeType::Record { fields } => fields,
            _ => &[],
        }
    }

    /// Strip named wrappers down to the underlying structural type.
    pub fn underlying(&self) -> &LakeType {
        match self {
            LakeType::Named { inner, .. } => inner.underlying(),
            other => other,
        }
    }
}

/// ZSON-style rendering, e.g. `{ts:time,tags:[string]}`
impl fmt::Display for LakeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LakeType::Primitive { name } => write!(f, "{}", name),
            LakeType::Record { fields } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            LakeType::Array { inner } => write!(f, "[{}]", inner),
            LakeType::Set { inner } => write!(f, "|[{}]|", inner),
            LakeType::Map { key, value } => write!(f, "|{{{}:{}}}|", key, value),
            LakeType::Union { types } => {
                let parts: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
            LakeType::Enum { symbols } => write!(f, "enum({})", symbols.join(",")),
            LakeType::Error { inner } => write!(f, "error({})", inner),
            LakeType::Named { name, inner } => write!(f, "{}=({})", name, inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_resolution() {
        assert_eq!(LakeType::primitive("int64").name(), Some("int64"));
        assert_eq!(
            LakeType::named("port", LakeType::primitive("uint16")).name(),
            Some("port")
        );
        assert_eq!(LakeType::record(vec![]).name(), None);
        assert_eq!(
            LakeType::Array {
                inner: Box::new(LakeType::primitive("string"))
            }
            .name(),
            None
        );
    }

    #[test]
    fn test_display() {
        let ty = LakeType::record(vec![
            Field::new("ts", LakeType::primitive("time")),
            Field::new(
                "tags",
                LakeType::Set {
                    inner: Box::new(LakeType::primitive("string")),
                },
            ),
            Field::new("port", LakeType::named("port", LakeType::primitive("uint16"))),
        ]);
        assert_eq!(ty.to_string(), "{ts:time,tags:|[string]|,port:port=(uint16)}");
    }

    #[test]
    fn test_underlying() {
        let ty = LakeType::named("a", LakeType::named("b", LakeType::primitive("ip")));
        assert_eq!(ty.underlying(), &LakeType::primitive("ip"));
    }
}
