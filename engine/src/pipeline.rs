//! Validation pipeline
//!
//! One pipeline per request: bind a schema and the raw parameters, run
//! the validators in schema-declared order, and collect cleaned values,
//! field errors, and warnings into a [`ValidationResult`]. The pipeline
//! is single use; `validate` consumes it.

use std::collections::BTreeMap;

use crate::catalog::{CatalogError, ErrorCatalog, ErrorDetail};
use crate::filters::{self, FilterKind};
use crate::paging;
use crate::params::{RawParams, RawValue};
use crate::schema::FilterSchema;
use crate::value::{CleanedData, Value};

/// Mutable view handed to a custom field validator
///
/// A validator either sets a cleaned value and returns `None`, or
/// returns an error code. Returning a code suppresses the cleaned
/// write for that field. Warnings can be added either way.
pub struct FieldContext<'w> {
    cleaned: Option<Value>,
    warnings: &'w mut Vec<String>,
}

impl FieldContext<'_> {
    pub fn set(&mut self, value: impl Into<Value>) {
        self.cleaned = Some(value.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

type Validator<'a> = Box<dyn Fn(Option<&RawValue>, &mut FieldContext<'_>) -> Option<String> + 'a>;

/// A single validation pass over raw parameters
pub struct Pipeline<'a> {
    schema: &'a FilterSchema,
    data: RawParams,
    partial: bool,
    validators: Vec<(String, Validator<'a>)>,
}

impl<'a> Pipeline<'a> {
    pub fn new(schema: &'a FilterSchema, data: RawParams) -> Self {
        Self {
            schema,
            data,
            partial: false,
            validators: Vec::new(),
        }
    }

    /// Partial-update mode: fields absent from the raw input are left
    /// untouched instead of defaulted.
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Register a validator for an entity-specific name in the schema's
    /// validation order. Names without a registered validator are
    /// skipped. The mapping is explicit; there is no dispatch by naming
    /// convention.
    pub fn with_validator<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(Option<&RawValue>, &mut FieldContext<'_>) -> Option<String> + 'a,
    {
        self.validators.push((name.into(), Box::new(validator)));
        self
    }

    /// Run every validator in schema-declared order and produce the
    /// immutable result of the pass.
    pub fn validate(self) -> ValidationResult {
        let schema = self.schema;
        let mut cleaned: CleanedData = BTreeMap::new();
        let mut errors: BTreeMap<String, String> = BTreeMap::new();
        let mut warnings: Vec<String> = Vec::new();

        for field in schema.validation_order() {
            if self.partial && !self.data.contains(field) {
                continue;
            }
            let dirty = extract(&self.data, field);
            let _span = tracing::debug_span!("validate", field = %field).entered();
            match field.as_str() {
                "search" => self.clean_filters(FilterKind::Search, dirty, &mut cleaned, &mut warnings),
                "exclude" => self.clean_filters(FilterKind::Exclude, dirty, &mut cleaned, &mut warnings),
                "limit" => {
                    let limit = paging::clean_limit(as_str(&dirty), schema);
                    cleaned.insert(field.clone(), Value::Int(limit));
                }
                "page" => {
                    cleaned.insert(field.clone(), Value::Int(paging::clean_page(as_str(&dirty))));
                }
                "order" => {
                    let order = paging::clean_order(as_str(&dirty), schema);
                    cleaned.insert(field.clone(), Value::Str(order));
                }
                name => {
                    let Some((_, validator)) = self.validators.iter().find(|(n, _)| n == name)
                    else {
                        continue;
                    };
                    let mut ctx = FieldContext {
                        cleaned: None,
                        warnings: &mut warnings,
                    };
                    match validator(dirty.as_ref(), &mut ctx) {
                        Some(code) => {
                            tracing::debug!(field = %name, code = %code, "field validation failed");
                            errors.insert(name.to_string(), code);
                        }
                        None => {
                            if let Some(value) = ctx.cleaned.take() {
                                cleaned.insert(name.to_string(), value);
                            }
                        }
                    }
                }
            }
        }

        ValidationResult {
            cleaned_data: cleaned,
            errors,
            warnings,
        }
    }

    fn clean_filters(
        &self,
        kind: FilterKind,
        dirty: Option<RawValue>,
        cleaned: &mut CleanedData,
        warnings: &mut Vec<String>,
    ) {
        // Structured form when present, otherwise scan the flat keys for
        // legacy filters
        let entries = match dirty {
            Some(RawValue::Map(pairs)) => pairs,
            _ => filters::legacy_entries(kind, &self.data, self.schema, warnings),
        };
        let clean = filters::normalize(kind, &entries, self.schema, warnings);
        cleaned.insert(kind.key().to_string(), Value::Filters(clean));
    }
}

/// Multi-value extraction: absent → `None`, single value unwrapped,
/// repeats passed through. Single string values are trimmed.
fn extract(data: &RawParams, field: &str) -> Option<RawValue> {
    match data.get(field)? {
        RawValue::Str(s) => Some(RawValue::Str(s.trim().to_string())),
        other => Some(other),
    }
}

fn as_str(dirty: &Option<RawValue>) -> Option<&str> {
    match dirty {
        Some(RawValue::Str(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// The outcome of one validation pass. Immutable; validity is solely
/// "no field carries an error code".
#[derive(Debug, Clone)]
pub struct ValidationResult {
    cleaned_data: CleanedData,
    errors: BTreeMap<String, String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn cleaned_data(&self) -> &CleanedData {
        &self.cleaned_data
    }

    /// Field name → opaque error code
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Resolve every recorded error code to its display payload.
    ///
    /// A raised code missing from the catalog is a programming error
    /// (someone forgot to define the message), surfaced as
    /// [`CatalogError::UndefinedCodes`] rather than recovered.
    pub fn resolve_errors(
        &self,
        catalog: &dyn ErrorCatalog,
        locale: Option<&str>,
    ) -> Result<BTreeMap<String, ErrorDetail>, CatalogError> {
        let mut codes: Vec<&str> = self.errors.values().map(String::as_str).collect();
        codes.sort_unstable();
        codes.dedup();
        let resolved = catalog.resolve(&codes, locale);

        let mut out = BTreeMap::new();
        let mut missing: Vec<String> = Vec::new();
        for (field, code) in &self.errors {
            match resolved.get(code) {
                Some(detail) => {
                    out.insert(field.clone(), detail.clone());
                }
                None => missing.push(code.clone()),
            }
        }
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(CatalogError::UndefinedCodes(missing));
        }
        Ok(out)
    }
}
