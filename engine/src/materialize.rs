//! Instance materialization
//!
//! Converts validated data into a domain record. The two-phase shape is
//! deliberate: a [`Materializer`] can only be built from a
//! [`ValidationResult`], so "materialize before validating" is
//! unrepresentable, and construction fails when the result carries
//! errors. The built record is memoized in a write-once cell so repeat
//! requests return the identical instance.

use std::cell::{Cell, OnceCell};

use thiserror::Error;

use crate::pipeline::ValidationResult;
use crate::value::{CleanedData, Value};

/// A domain record that can be built from cleaned data
///
/// `field_names` is the record's known-field set; update mode only
/// copies cleaned entries whose key appears in it, so unknown incoming
/// fields are ignored rather than attached dynamically.
pub trait Record: Sized {
    fn field_names() -> &'static [&'static str];

    /// Create mode: build a fresh record from the full cleaned map
    fn construct(data: &CleanedData) -> Self;

    /// Update mode: copy one cleaned value onto an existing record.
    /// Only called for fields in `field_names`.
    fn assign(&mut self, field: &str, value: &Value);
}

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("cannot materialize an instance while the validated data carries errors")]
    InvalidData,
}

/// Gated, memoized record construction from a validation result
pub struct Materializer<R: Record> {
    result: ValidationResult,
    base: Cell<Option<R>>,
    instance: OnceCell<R>,
}

impl<R: Record> Materializer<R> {
    /// Create mode: the record is built fresh from the cleaned data
    pub fn create(result: ValidationResult) -> Result<Self, MaterializeError> {
        Self::with_base(result, None)
    }

    /// Update mode: known cleaned fields are patched onto `base`,
    /// leaving its other fields untouched
    pub fn update(result: ValidationResult, base: R) -> Result<Self, MaterializeError> {
        Self::with_base(result, Some(base))
    }

    fn with_base(result: ValidationResult, base: Option<R>) -> Result<Self, MaterializeError> {
        if !result.is_valid() {
            return Err(MaterializeError::InvalidData);
        }
        Ok(Self {
            result,
            base: Cell::new(base),
            instance: OnceCell::new(),
        })
    }

    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    /// The materialized record. Built on first call; later calls return
    /// the same instance without reapplying any coercion.
    pub fn instance(&self) -> &R {
        self.instance.get_or_init(|| match self.base.take() {
            Some(mut record) => {
                for (field, value) in self.result.cleaned_data() {
                    if R::field_names().contains(&field.as_str()) {
                        record.assign(field, value);
                    }
                }
                record
            }
            None => R::construct(self.result.cleaned_data()),
        })
    }

    /// Take ownership of the materialized record
    pub fn into_instance(mut self) -> R {
        self.instance();
        self.instance
            .take()
            .unwrap_or_else(|| R::construct(self.result.cleaned_data()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::params::RawParams;
    use crate::pipeline::Pipeline;
    use crate::schema::FilterSchema;

    #[derive(Debug, Clone, PartialEq)]
    struct Address {
        name: String,
        city: String,
        verified: bool,
    }

    impl Record for Address {
        fn field_names() -> &'static [&'static str] {
            &["name", "city", "verified"]
        }

        fn construct(data: &CleanedData) -> Self {
            Self {
                name: data.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                city: data.get("city").and_then(Value::as_str).unwrap_or_default().to_string(),
                verified: data.get("verified").and_then(Value::as_bool).unwrap_or_default(),
            }
        }

        fn assign(&mut self, field: &str, value: &Value) {
            match field {
                "name" => self.name = value.as_str().unwrap_or_default().to_string(),
                "city" => self.city = value.as_str().unwrap_or_default().to_string(),
                "verified" => self.verified = value.as_bool().unwrap_or_default(),
                _ => {}
            }
        }
    }

    fn validated(pairs: &[(&str, &str)]) -> ValidationResult {
        let mut builder = FilterSchema::builder().validation_order(&[]);
        for (name, _) in pairs {
            builder = builder.validate_also(name);
        }
        let schema = builder.build().unwrap();
        let mut pipeline = Pipeline::new(&schema, RawParams::from_pairs(pairs.iter().copied()));
        for (name, _) in pairs {
            pipeline = pipeline.with_validator(*name, |raw, ctx| {
                if let Some(crate::params::RawValue::Str(s)) = raw {
                    ctx.set(s.as_str());
                }
                None
            });
        }
        pipeline.validate()
    }

    fn failing_result() -> ValidationResult {
        let schema = FilterSchema::builder()
            .validation_order(&["name"])
            .build()
            .unwrap();
        Pipeline::new(&schema, RawParams::new())
            .with_validator("name", |_, _| Some("listparams_002".to_string()))
            .validate()
    }

    #[test]
    fn test_create_mode_builds_from_cleaned_data() {
        let result = validated(&[("name", "HQ"), ("city", "Cork")]);
        let materializer = Materializer::<Address>::create(result).unwrap();

        let record = materializer.instance();
        assert_eq!(record.name, "HQ");
        assert_eq!(record.city, "Cork");
        assert!(!record.verified);
    }

    #[test]
    fn test_update_mode_patches_known_fields_only() {
        let result = validated(&[("city", "Galway"), ("population", "80000")]);
        let base = Address {
            name: "HQ".to_string(),
            city: "Cork".to_string(),
            verified: true,
        };
        let materializer = Materializer::update(result, base).unwrap();

        let record = materializer.instance();
        // Patched
        assert_eq!(record.city, "Galway");
        // Untouched
        assert_eq!(record.name, "HQ");
        assert!(record.verified);
    }

    #[test]
    fn test_invalid_data_refuses_to_materialize() {
        let result = failing_result();
        assert!(!result.is_valid());
        let Err(err) = Materializer::<Address>::create(result) else {
            panic!("expected materialization to be refused");
        };
        assert!(matches!(err, MaterializeError::InvalidData));
    }

    #[test]
    fn test_instance_is_reference_stable() {
        let result = validated(&[("name", "HQ")]);
        let materializer = Materializer::<Address>::create(result).unwrap();

        let first = materializer.instance() as *const Address;
        let second = materializer.instance() as *const Address;
        assert_eq!(first, second);
    }

    #[test]
    fn test_into_instance_takes_ownership() {
        let result = validated(&[("name", "HQ")]);
        let materializer = Materializer::<Address>::create(result).unwrap();
        let record = materializer.into_instance();
        assert_eq!(record.name, "HQ");
    }

    #[test]
    fn test_construct_sees_full_cleaned_map() {
        let mut data: CleanedData = BTreeMap::new();
        data.insert("name".to_string(), Value::from("HQ"));
        data.insert("verified".to_string(), Value::from(true));
        let record = Address::construct(&data);
        assert!(record.verified);
    }
}
