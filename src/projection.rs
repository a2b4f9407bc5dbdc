//! Inclusion-only field projection.

use crate::error::{PubSubError, Result};
use crate::types::Document;
use serde_json::Value;
use std::sync::Arc;

/// An ordered whitelist of top-level field names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Build from field names. Duplicates are collapsed, first one wins.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if field.is_empty() {
                return Err(PubSubError::InvalidProjection {
                    field,
                    reason: "field name must not be empty".to_string(),
                });
            }
            if !out.contains(&field) {
                out.push(field);
            }
        }
        Ok(Self { fields: out })
    }

    /// Parse the wire shape `{field: <truthy>, ...}`.
    pub fn parse(markers: &Document) -> Result<Self> {
        for (field, marker) in markers {
            if !is_inclusion_marker(marker) {
                return Err(PubSubError::InvalidProjection {
                    field: field.clone(),
                    reason: format!("only inclusion is supported, got {}", marker),
                });
            }
        }
        Self::new(markers.keys().cloned())
    }

    /// Parse an optional wire value; `None`, `null` and `{}` mean no projection.
    pub fn parse_optional(markers: Option<&Value>) -> Result<Option<Self>> {
        match markers {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(Value::Object(map)) => Self::parse(map).map(Some),
            Some(other) => Err(PubSubError::InvalidProjection {
                field: String::new(),
                reason: format!("projection must be a document, got {}", other),
            }),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Keep only the listed fields that exist, in projection order.
    pub fn apply(&self, document: &Document) -> Document {
        let mut out = Document::new();
        for field in &self.fields {
            if let Some(value) = document.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
        out
    }
}

/// Apply an optional projection. Without one the same `Arc` comes back.
pub fn project(projection: Option<&Projection>, document: &Arc<Document>) -> Arc<Document> {
    match projection {
        Some(p) => Arc::new(p.apply(document)),
        None => Arc::clone(document),
    }
}

fn is_inclusion_marker(marker: &Value) -> bool {
    match marker {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}
