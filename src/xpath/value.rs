//! Predicate Value Types
//!
//! The four XPath 1.0 data types, as returned by a predicate evaluator.

use crate::dtm::NodeHandle;
use crate::error::PathError;

/// Result of evaluating one predicate against one candidate
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum PredicateValue {
    /// A set of nodes (ordered, no duplicates)
    NodeSet(Vec<NodeHandle>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl PredicateValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        PredicateValue::NodeSet(Vec::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PredicateValue::NodeSet(_) => "node-set",
            PredicateValue::Boolean(_) => "boolean",
            PredicateValue::Number(_) => "number",
            PredicateValue::String(_) => "string",
        }
    }

    /// Convert to boolean (XPath boolean() function semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            PredicateValue::NodeSet(nodes) => !nodes.is_empty(),
            PredicateValue::Boolean(b) => *b,
            PredicateValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PredicateValue::String(s) => !s.is_empty(),
        }
    }

    /// Whether a candidate at proximity `position` passes
    ///
    /// A number is a positional test; everything else is converted to boolean.
    pub fn accepts(&self, position: usize) -> bool {
        match self {
            PredicateValue::Number(n) => *n == position as f64,
            other => other.to_boolean(),
        }
    }

    /// The number inside, without conversion
    pub fn as_number(&self) -> Result<f64, PathError> {
        match self {
            PredicateValue::Number(n) => Ok(*n),
            other => Err(PathError::TypeMismatch {
                expected: "number",
                found: other.type_name(),
            }),
        }
    }

    /// The node set inside, without conversion
    pub fn as_nodeset(&self) -> Result<&[NodeHandle], PathError> {
        match self {
            PredicateValue::NodeSet(nodes) => Ok(nodes),
            other => Err(PathError::TypeMismatch {
                expected: "node-set",
                found: other.type_name(),
            }),
        }
    }

    /// Convert to string (XPath string() semantics); node sets need a
    /// navigator and are rejected
    pub fn to_string_value(&self) -> Result<String, PathError> {
        Ok(match self {
            PredicateValue::NodeSet(_) => {
                return Err(PathError::TypeMismatch {
                    expected: "string",
                    found: "node-set",
                })
            }
            PredicateValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            PredicateValue::Number(n) => {
                if n.is_nan() {
                    "NaN".to_string()
                } else if n.is_infinite() {
                    if *n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
                } else if *n == n.trunc() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            PredicateValue::String(s) => s.clone(),
        })
    }
}

impl Default for PredicateValue {
    fn default() -> Self {
        PredicateValue::NodeSet(Vec::new())
    }
}

impl From<bool> for PredicateValue {
    fn from(b: bool) -> Self {
        PredicateValue::Boolean(b)
    }
}

impl From<f64> for PredicateValue {
    fn from(n: f64) -> Self {
        PredicateValue::Number(n)
    }
}

impl From<usize> for PredicateValue {
    fn from(n: usize) -> Self {
        PredicateValue::Number(n as f64)
    }
}

impl From<String> for PredicateValue {
    fn from(s: String) -> Self {
        PredicateValue::String(s)
    }
}

impl From<&str> for PredicateValue {
    fn from(s: &str) -> Self {
        PredicateValue::String(s.to_string())
    }
}

impl From<Vec<NodeHandle>> for PredicateValue {
    fn from(nodes: Vec<NodeHandle>) -> Self {
        PredicateValue::NodeSet(nodes)
    }
}
