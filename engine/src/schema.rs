//! Filter schema
//!
//! Declarative, per-entity allowlist of filterable fields and the
//! operators each accepts, plus paging limits and orderable fields.
//! Built once at startup and shared read-only across requests.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;

/// Default filter operators for string fields
pub const STRING_OPERATORS: &[&str] = &["in", "icontains", "iendswith", "iexact", "istartswith"];

/// Default filter operators for number fields
pub const NUMBER_OPERATORS: &[&str] = &["gt", "gte", "in", "isnull", "lt", "lte", "range"];

/// Operators whose values must coerce to an integer
pub const DATE_PART_OPERATORS: &[&str] = &["year", "month", "day", "week_day", "hour", "minute"];

/// Keys that never count as legacy filter input
pub(crate) const RESERVED_KEYS: &[&str] = &["format"];

const DEFAULT_NORMAL_LIMIT: u32 = 50;
const DEFAULT_MAX_LIMIT: u32 = 100;
const DEFAULT_VALIDATION_ORDER: &[&str] = &["search", "exclude", "limit", "page", "order"];

/// Schema invariant violations, raised at build/deserialize time
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("normal_limit ({normal}) must be between 1 and max_limit ({max})")]
    LimitRange { normal: u32, max: u32 },

    #[error("allowed_ordering must not be empty when ordering is validated")]
    EmptyOrdering,
}

/// Immutable per-entity filter configuration
///
/// Constructed through [`FilterSchema::builder`] or deserialized from
/// host config; both paths enforce the same invariants.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SchemaConfig")]
pub struct FilterSchema {
    allowed_ordering: Vec<String>,
    search_fields: BTreeMap<String, BTreeSet<String>>,
    normal_limit: u32,
    max_limit: u32,
    validation_order: Vec<String>,
}

impl FilterSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Allowed operators for a field, or `None` when the field is not
    /// filterable at all
    pub fn operators_for(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.search_fields.get(field)
    }

    pub fn is_orderable(&self, field: &str) -> bool {
        self.allowed_ordering.iter().any(|f| f == field)
    }

    /// The default sort field (first allowed-ordering entry, ascending).
    /// Empty only when ordering validation is disabled.
    pub fn default_order(&self) -> &str {
        self.allowed_ordering.first().map(String::as_str).unwrap_or_default()
    }

    pub fn normal_limit(&self) -> u32 {
        self.normal_limit
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn validation_order(&self) -> &[String] {
        &self.validation_order
    }

    pub(crate) fn search_fields(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.search_fields
    }

    /// Keys that can never be legacy filter input: `format` plus every
    /// validator name
    pub(crate) fn is_reserved(&self, key: &str) -> bool {
        RESERVED_KEYS.contains(&key) || self.validation_order.iter().any(|f| f == key)
    }

    fn check(self) -> Result<Self, SchemaError> {
        if self.normal_limit < 1 || self.normal_limit > self.max_limit {
            return Err(SchemaError::LimitRange {
                normal: self.normal_limit,
                max: self.max_limit,
            });
        }
        if self.validation_order.iter().any(|f| f == "order") && self.allowed_ordering.is_empty() {
            return Err(SchemaError::EmptyOrdering);
        }
        Ok(self)
    }
}

/// Serde-facing shape with defaults, funnelled through the same checks
/// as the builder
#[derive(Debug, Deserialize)]
struct SchemaConfig {
    #[serde(default)]
    allowed_ordering: Vec<String>,
    #[serde(default)]
    search_fields: BTreeMap<String, BTreeSet<String>>,
    #[serde(default = "default_normal_limit")]
    normal_limit: u32,
    #[serde(default = "default_max_limit")]
    max_limit: u32,
    #[serde(default = "default_validation_order")]
    validation_order: Vec<String>,
}

fn default_normal_limit() -> u32 {
    DEFAULT_NORMAL_LIMIT
}

fn default_max_limit() -> u32 {
    DEFAULT_MAX_LIMIT
}

fn default_validation_order() -> Vec<String> {
    DEFAULT_VALIDATION_ORDER.iter().map(|s| s.to_string()).collect()
}

impl TryFrom<SchemaConfig> for FilterSchema {
    type Error = SchemaError;

    fn try_from(config: SchemaConfig) -> Result<Self, Self::Error> {
        FilterSchema {
            allowed_ordering: config.allowed_ordering,
            search_fields: config.search_fields,
            normal_limit: config.normal_limit,
            max_limit: config.max_limit,
            validation_order: config.validation_order,
        }
        .check()
    }
}

/// Programmatic schema construction
pub struct SchemaBuilder {
    allowed_ordering: Vec<String>,
    search_fields: BTreeMap<String, BTreeSet<String>>,
    normal_limit: u32,
    max_limit: u32,
    validation_order: Vec<String>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            allowed_ordering: Vec::new(),
            search_fields: BTreeMap::new(),
            normal_limit: DEFAULT_NORMAL_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            validation_order: default_validation_order(),
        }
    }
}

impl SchemaBuilder {
    /// Orderable fields; the first is the default sort
    pub fn ordering(mut self, fields: &[&str]) -> Self {
        self.allowed_ordering = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Register a filterable field with its allowed operators
    pub fn field(mut self, name: &str, operators: &[&str]) -> Self {
        self.search_fields.insert(
            name.to_string(),
            operators.iter().map(|op| op.to_string()).collect(),
        );
        self
    }

    pub fn limits(mut self, normal: u32, max: u32) -> Self {
        self.normal_limit = normal;
        self.max_limit = max;
        self
    }

    /// Replace the validator order entirely
    pub fn validation_order(mut self, order: &[&str]) -> Self {
        self.validation_order = order.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Append an entity-specific validator name to the order
    pub fn validate_also(mut self, name: &str) -> Self {
        self.validation_order.push(name.to_string());
        self
    }

    pub fn build(self) -> Result<FilterSchema, SchemaError> {
        FilterSchema {
            allowed_ordering: self.allowed_ordering,
            search_fields: self.search_fields,
            normal_limit: self.normal_limit,
            max_limit: self.max_limit,
            validation_order: self.validation_order,
        }
        .check()
    }
}
