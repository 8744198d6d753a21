//! Filter normalization
//!
//! Turns either of the two accepted filter grammars into one canonical
//! map of `field` / `field__operator` keys with coerced values:
//!
//! - structured (deepObject): `search[name__icontains]=hi`
//! - legacy flat keys (deprecated): `name__icontains=hi`,
//!   `exclude__name__icontains=hi`
//!
//! Normalization never fails the request. Filters that reference unknown
//! fields, disallowed operators, or uncoercible values degrade to a
//! warning plus omission; the remaining valid filters still apply.

use std::sync::LazyLock;

use regex::Regex;

use crate::params::RawParams;
use crate::schema::{DATE_PART_OPERATORS, FilterSchema};
use crate::value::{CanonicalFilter, Value};

/// Punctuation stripped from list-valued filters before splitting
static LIST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\[\]()'"]"#).expect("invalid list pattern"));

/// Which filter map is being normalized. Search and exclude are
/// symmetric apart from the legacy key prefix and warning label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Search,
    Exclude,
}

impl FilterKind {
    /// The cleaned-data key the normalized map is stored under
    pub fn key(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Exclude => "exclude",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Search => "SearchFilterWarning",
            Self::Exclude => "ExcludeFilterWarning",
        }
    }

    fn deprecation_warning(self) -> &'static str {
        match self {
            Self::Search => {
                "DeprecationWarning: The old form of specifying search filters is deprecated \
                 and will be removed soon. Please now use the OpenAPI deepObject style to \
                 specify filters; e.g. \"name__icontains=hi\" should become \
                 \"search[name__icontains]=hi\"."
            }
            Self::Exclude => {
                "DeprecationWarning: The old form of specifying exclude filters is deprecated \
                 and will be removed soon. Please now use the OpenAPI deepObject style to \
                 specify filters; e.g. \"exclude__name__icontains=hi\" should become \
                 \"exclude[name__icontains]=hi\"."
            }
        }
    }
}

const LEGACY_EXCLUDE_PREFIX: &str = "exclude__";

/// Derive filter entries from flat legacy keys when the structured form
/// is absent. Emits one deprecation warning if anything qualified.
///
/// A key qualifies when it is not reserved (`format` or a validator
/// name) and, for search, does not carry the exclude prefix; exclude
/// keys have the prefix stripped. Last write wins for duplicate keys.
pub(crate) fn legacy_entries(
    kind: FilterKind,
    params: &RawParams,
    schema: &FilterSchema,
    warnings: &mut Vec<String>,
) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for (key, value) in params.plain_entries() {
        if schema.is_reserved(key) {
            continue;
        }
        let name = match kind {
            FilterKind::Search => {
                if key.starts_with(LEGACY_EXCLUDE_PREFIX) {
                    continue;
                }
                key
            }
            FilterKind::Exclude => match key.strip_prefix(LEGACY_EXCLUDE_PREFIX) {
                Some(stripped) => stripped,
                None => continue,
            },
        };
        match entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
    }
    if !entries.is_empty() {
        warnings.push(kind.deprecation_warning().to_string());
    }
    entries
}

/// Normalize raw filter entries against the schema allowlist
///
/// Implements the shared search/exclude algorithm: right-most split of
/// the key into `(name, operator)`, allowlist check, then coercion by
/// operator family. Invalid entries are dropped with a warning.
pub fn normalize(
    kind: FilterKind,
    entries: &[(String, String)],
    schema: &FilterSchema,
    warnings: &mut Vec<String>,
) -> CanonicalFilter {
    let mut clean = CanonicalFilter::new();
    for (name, raw) in entries {
        // The operator is always the final `__` segment, if any
        let (name_without_op, op) = match name.rsplit_once("__") {
            Some((head, tail)) => (head, tail),
            None => ("", name.as_str()),
        };

        let fields = schema.search_fields();
        if !fields.contains_key(name.as_str()) && !fields.contains_key(name_without_op) {
            tracing::debug!(filter = %name, "unknown filter field, skipped");
            warnings.push(format!(
                "{}: {} is an invalid filter for this list method and was skipped.",
                kind.label(),
                name,
            ));
            continue;
        }
        if let Some(allowed) = fields.get(name_without_op)
            && !allowed.contains(op)
        {
            warnings.push(format!(
                "{}: {} is an invalid filter for this list method as the specified operator \
                 is invalid for the name, and was skipped.",
                kind.label(),
                name,
            ));
            continue;
        }

        // Resolve the canonical (field, operator) pair; a full-name match
        // means there is no operator
        let (field, operator) = if fields.contains_key(name.as_str()) {
            (name.as_str(), None)
        } else {
            (name_without_op, Some(op))
        };

        let raw = raw.trim();
        let coerced = if matches!(operator, Some("in") | Some("range")) {
            let tokens: Vec<String> = LIST_PATTERN
                .replace_all(raw, "")
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            if operator == Some("range") && tokens.len() != 2 {
                warnings.push(format!(
                    "{}: {} is an invalid filter as it contains an invalid \"range\" \
                     parameter. Ensure that \"range\" parameters are sent as strings of \
                     2-tuples, e.g. \"search[number__range]=(10, 15)\".",
                    kind.label(),
                    name,
                ));
                continue;
            }
            Value::List(tokens)
        } else if operator == Some("isnull")
            || raw.eq_ignore_ascii_case("true")
            || raw.eq_ignore_ascii_case("false")
        {
            Value::Bool(raw.eq_ignore_ascii_case("true"))
        } else if operator.is_some_and(|op| DATE_PART_OPERATORS.contains(&op)) {
            match raw.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => {
                    warnings.push(format!(
                        "{}: {} is an invalid filter as it requires an integer value and \
                         the received value was not a valid integer.",
                        kind.label(),
                        name,
                    ));
                    continue;
                }
            }
        } else {
            Value::Str(raw.to_string())
        };

        let canonical_key = match operator {
            Some(op) => format!("{field}__{op}"),
            None => field.to_string(),
        };
        // Last write wins when two raw keys normalize to the same key
        clean.insert(canonical_key, coerced);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NUMBER_OPERATORS, STRING_OPERATORS};

    fn schema() -> FilterSchema {
        FilterSchema::builder()
            .ordering(&["name"])
            .field("name", STRING_OPERATORS)
            .field("id", NUMBER_OPERATORS)
            .field("created", &["gt", "lt", "year", "month"])
            .field("active", &["isnull"])
            .build()
            .unwrap()
    }

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_plain_field_kept_as_string() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("name", "  hello ")]),
            &schema(),
            &mut warnings,
        );
        assert_eq!(clean.get("name"), Some(&Value::Str("hello".to_string())));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_field_dropped_with_one_warning() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("colour__icontains", "red")]),
            &schema(),
            &mut warnings,
        );
        assert!(clean.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0],
            "SearchFilterWarning: colour__icontains is an invalid filter for this list \
             method and was skipped."
        );
    }

    #[test]
    fn test_disallowed_operator_dropped_with_warning() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("name__gt", "5")]),
            &schema(),
            &mut warnings,
        );
        assert!(clean.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("operator"));
    }

    #[test]
    fn test_exclude_uses_its_own_warning_label() {
        let mut warnings = Vec::new();
        normalize(
            FilterKind::Exclude,
            &entries(&[("colour", "red")]),
            &schema(),
            &mut warnings,
        );
        assert!(warnings[0].starts_with("ExcludeFilterWarning:"));
    }

    #[test]
    fn test_in_operator_splits_list() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("name__in", "[a, b, b]"), ("id__in", "(1,, 2 )")]),
            &schema(),
            &mut warnings,
        );
        // Order preserved, duplicates preserved, empties removed
        assert_eq!(
            clean.get("name__in"),
            Some(&Value::List(vec!["a".into(), "b".into(), "b".into()]))
        );
        assert_eq!(
            clean.get("id__in"),
            Some(&Value::List(vec!["1".into(), "2".into()]))
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_in_operator_empty_list_kept() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("id__in", "[]")]),
            &schema(),
            &mut warnings,
        );
        // Only `range` checks arity; an empty `in` list passes through
        assert_eq!(clean.get("id__in"), Some(&Value::List(vec![])));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_range_requires_exactly_two_elements() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("id__range", "(10, 15)")]),
            &schema(),
            &mut warnings,
        );
        assert_eq!(
            clean.get("id__range"),
            Some(&Value::List(vec!["10".into(), "15".into()]))
        );
        assert!(warnings.is_empty());

        let clean = normalize(
            FilterKind::Search,
            &entries(&[("id__range", "(10, 15, 20)")]),
            &schema(),
            &mut warnings,
        );
        assert!(clean.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("range"));
    }

    #[test]
    fn test_isnull_coerces_to_bool() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("id__isnull", "TRUE"), ("active__isnull", "no")]),
            &schema(),
            &mut warnings,
        );
        assert_eq!(clean.get("id__isnull"), Some(&Value::Bool(true)));
        // Anything not textually "true" is false
        assert_eq!(clean.get("active__isnull"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_textual_booleans_without_operator() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("name", "False")]),
            &schema(),
            &mut warnings,
        );
        assert_eq!(clean.get("name"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_date_part_coerces_to_int() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("created__year", "2024")]),
            &schema(),
            &mut warnings,
        );
        assert_eq!(clean.get("created__year"), Some(&Value::Int(2024)));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_date_part_non_numeric_dropped() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("created__month", "March")]),
            &schema(),
            &mut warnings,
        );
        assert!(clean.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("integer"));
    }

    #[test]
    fn test_last_write_wins_on_canonical_collision() {
        let mut warnings = Vec::new();
        let clean = normalize(
            FilterKind::Search,
            &entries(&[("name", "first"), ("name", "second")]),
            &schema(),
            &mut warnings,
        );
        assert_eq!(clean.get("name"), Some(&Value::Str("second".to_string())));
        assert_eq!(clean.len(), 1);
    }

    #[test]
    fn test_legacy_scan_search() {
        let params = RawParams::from_pairs([
            ("name__icontains", "hi"),
            ("exclude__id__in", "[1]"),
            ("limit", "10"),
            ("format", "json"),
        ]);
        let mut warnings = Vec::new();
        let entries = legacy_entries(FilterKind::Search, &params, &schema(), &mut warnings);

        assert_eq!(entries, vec![("name__icontains".to_string(), "hi".to_string())]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("DeprecationWarning:"));
    }

    #[test]
    fn test_legacy_scan_exclude_strips_prefix() {
        let params = RawParams::from_pairs([
            ("name__icontains", "hi"),
            ("exclude__id__in", "[1]"),
        ]);
        let mut warnings = Vec::new();
        let entries = legacy_entries(FilterKind::Exclude, &params, &schema(), &mut warnings);

        assert_eq!(entries, vec![("id__in".to_string(), "[1]".to_string())]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("exclude__name__icontains=hi"));
    }

    #[test]
    fn test_legacy_scan_empty_adds_no_warning() {
        let params = RawParams::from_pairs([("limit", "10"), ("page", "2")]);
        let mut warnings = Vec::new();
        let entries = legacy_entries(FilterKind::Search, &params, &schema(), &mut warnings);
        assert!(entries.is_empty());
        assert!(warnings.is_empty());
    }
}
