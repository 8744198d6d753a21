//! Coerced value types
//!
//! Every value that survives validation ends up as a `Value`. Response
//! layers serialize cleaned data back to clients, so `Value` keeps the
//! JSON shape flat (no variant tags).

use std::collections::BTreeMap;

use serde::Serialize;

/// A normalized filter map: canonical key (`field` or `field__operator`)
/// to coerced value. `BTreeMap` keeps iteration deterministic for tests
/// and for stable query building downstream.
pub type CanonicalFilter = BTreeMap<String, Value>;

/// Validator name to coerced value, accumulated over one validation pass.
pub type CleanedData = BTreeMap<String, Value>;

/// A coerced parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    /// List-valued operators (`in`, `range`); exactly two elements for
    /// `range`
    List(Vec<String>),
    /// The `search` / `exclude` canonical filter maps
    Filters(CanonicalFilter),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_filters(&self) -> Option<&CanonicalFilter> {
        match self {
            Self::Filters(map) => Some(map),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<CanonicalFilter> for Value {
    fn from(map: CanonicalFilter) -> Self {
        Self::Filters(map)
    }
}
