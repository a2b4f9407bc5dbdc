//! Predicate AST and its parser.

use crate::error::{PubSubError, Result};
use crate::types::Document;
use serde_json::Value;
use std::fmt;

/// Comparison applied by a single clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Look up an operator by name, with or without a leading `$`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.strip_prefix('$').unwrap_or(name) {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }

    /// Ordering operators only make sense against scalar literals.
    fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `field <op> literal` leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    /// Field name; dots descend into nested documents.
    pub path: String,
    pub op: CompareOp,
    pub literal: Value,
}

impl Clause {
    pub fn new(path: impl Into<String>, op: CompareOp, literal: Value) -> Self {
        Self {
            path: path.into(),
            op,
            literal,
        }
    }
}

/// A validated conjunction of clauses.
///
/// Built once when a subscription is registered; evaluation never fails.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Build from already-validated clauses.
    pub fn from_clauses(clauses: Vec<Clause>) -> Result<Self> {
        for clause in &clauses {
            validate_clause(clause)?;
        }
        Ok(Self { clauses })
    }

    /// Parse the wire shape: field -> literal, or field -> {op: literal, ...}.
    pub fn parse(document: &Document) -> Result<Self> {
        let mut clauses = Vec::with_capacity(document.len());

        for (field, value) in document {
            if field.is_empty() {
                return Err(PubSubError::InvalidFilter {
                    field: field.clone(),
                    reason: "field name must not be empty".to_string(),
                });
            }
            if field.starts_with('$') {
                return Err(PubSubError::UnknownOperator {
                    field: field.clone(),
                    operator: field.clone(),
                });
            }

            match value {
                Value::Object(ops) if is_operator_map(field, ops)? => {
                    for (name, literal) in ops {
                        let op = CompareOp::from_name(name).ok_or_else(|| {
                            PubSubError::UnknownOperator {
                                field: field.clone(),
                                operator: name.clone(),
                            }
                        })?;
                        clauses.push(Clause::new(field.clone(), op, literal.clone()));
                    }
                }
                literal => clauses.push(Clause::new(field.clone(), CompareOp::Eq, literal.clone())),
            }
        }

        Self::from_clauses(clauses)
    }

    /// Parse an optional wire value; `None`, `null` and `{}` mean no filter.
    pub fn parse_optional(document: Option<&Value>) -> Result<Option<Self>> {
        match document {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(Value::Object(map)) => Self::parse(map).map(Some),
            Some(other) => Err(PubSubError::InvalidFilter {
                field: String::new(),
                reason: format!("filter must be a document, got {}", other),
            }),
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Decide whether a nested document is a set of operators or a literal.
///
/// Any `$` key makes it an operator map, and then every key must be one.
/// Otherwise it is an operator map only if every key is a bare comparator.
fn is_operator_map(field: &str, ops: &Document) -> Result<bool> {
    if ops.is_empty() {
        return Ok(false);
    }

    let dollar_keys = ops.keys().filter(|k| k.starts_with('$')).count();
    if dollar_keys > 0 {
        if dollar_keys != ops.len() {
            return Err(PubSubError::InvalidFilter {
                field: field.to_string(),
                reason: "cannot mix operators and field names".to_string(),
            });
        }
        return Ok(true);
    }

    Ok(ops.keys().all(|k| CompareOp::from_name(k).is_some()))
}

fn validate_clause(clause: &Clause) -> Result<()> {
    if clause.path.is_empty() || clause.path.split('.').any(str::is_empty) {
        return Err(PubSubError::InvalidFilter {
            field: clause.path.clone(),
            reason: "invalid field path".to_string(),
        });
    }
    if clause.op.is_ordering() && matches!(clause.literal, Value::Array(_) | Value::Object(_)) {
        return Err(PubSubError::InvalidFilter {
            field: clause.path.clone(),
            reason: format!("'{}' needs a scalar operand", clause.op),
        });
    }
    Ok(())
}
