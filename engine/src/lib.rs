//! Validation and normalization engine for list query parameters
//!
//! Turns untrusted, loosely-typed HTTP query parameters into a
//! canonical, strongly-typed filter specification that a data layer can
//! execute safely:
//!
//! - `schema` - per-entity allowlist of filterable fields, operators,
//!   paging limits, and sort fields
//! - `params` - the raw parameter source, including deepObject folding
//! - `filters` - normalization of the structured and legacy filter
//!   grammars into canonical `field__operator` maps
//! - `pipeline` - the ordered validation pass collecting cleaned data,
//!   field errors, and warnings
//! - `paging` - limit/page/order cleaning that always degrades to a
//!   usable default
//! - `catalog` - error-code to display-message resolution
//! - `materialize` - gated, memoized construction of a domain record
//!   from validated data
//!
//! The engine owns no transport: hosts hand it decoded query pairs and
//! consume the [`pipeline::ValidationResult`]. One pipeline per
//! request; the schema is built once at startup and shared freely.

pub mod catalog;
pub mod filters;
pub mod materialize;
pub mod paging;
pub mod params;
pub mod pipeline;
pub mod schema;
pub mod value;

pub use catalog::{CachedCatalog, CatalogError, ErrorCatalog, ErrorDetail, StaticCatalog};
pub use filters::FilterKind;
pub use materialize::{MaterializeError, Materializer, Record};
pub use params::{RawParams, RawValue};
pub use pipeline::{FieldContext, Pipeline, ValidationResult};
pub use schema::{
    DATE_PART_OPERATORS, FilterSchema, NUMBER_OPERATORS, STRING_OPERATORS, SchemaBuilder,
    SchemaError,
};
pub use value::{CanonicalFilter, CleanedData, Value};
