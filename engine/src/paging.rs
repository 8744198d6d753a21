//! Pagination and ordering validation
//!
//! These cleaners never produce a field error: anything unusable
//! degrades to a schema default so a list request always has a working
//! limit, page, and sort order.

use crate::schema::FilterSchema;

/// Clean the `limit` parameter. Non-numeric, absent, or out-of-range
/// values fall back to the schema's normal limit.
pub fn clean_limit(raw: Option<&str>, schema: &FilterSchema) -> i64 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if n >= 1 && n <= i64::from(schema.max_limit()) => n,
        _ => i64::from(schema.normal_limit()),
    }
}

/// Clean the `page` parameter: a non-negative integer, defaulting to 0
pub fn clean_page(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
        .max(0)
}

/// Clean the `order` parameter against the schema's allowed ordering.
///
/// A leading `-` requests descending and is stripped before the
/// allowlist check. Unknown fields silently fall back to the default
/// ascending; unlike filter validation this adds no warning.
pub fn clean_order(raw: Option<&str>, schema: &FilterSchema) -> String {
    let raw = raw.unwrap_or(schema.default_order());
    let desc = raw.starts_with('-');
    let field = raw.trim_start_matches('-');
    if schema.is_orderable(field) {
        if desc { format!("-{field}") } else { field.to_string() }
    } else {
        tracing::debug!(order = %raw, "unknown sort field, using default order");
        schema.default_order().to_string()
    }
}
