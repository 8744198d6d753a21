//! Error-code catalog lookup
//!
//! Validators record opaque error codes; the catalog maps them to
//! display payloads. A code with no catalog entry is a configuration
//! defect (a validator raised a code nobody wrote a message for), which
//! callers surface as a hard failure rather than a client error.

use std::collections::BTreeMap;
use std::time::Duration;

use moka::sync::Cache;
use serde::Serialize;
use thiserror::Error;

/// Display payload for one resolved error code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub error_code: String,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Raised codes with no message defined for them
    #[error("error codes were raised but no messages are defined for them: {}", .0.join(", "))]
    UndefinedCodes(Vec<String>),
}

/// Synchronous, side-effect-free catalog lookup
///
/// Missing entries in the returned map mean "no message defined for
/// that code"; the locale hint may be ignored by implementations.
pub trait ErrorCatalog {
    fn resolve(&self, codes: &[&str], locale: Option<&str>) -> BTreeMap<String, ErrorDetail>;
}

/// In-process catalog backed by a static code → detail map. Ignores the
/// locale hint.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    messages: BTreeMap<String, String>,
}

impl StaticCatalog {
    pub fn new<I, K, V>(messages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            messages: messages
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, code: impl Into<String>, detail: impl Into<String>) {
        self.messages.insert(code.into(), detail.into());
    }
}

impl ErrorCatalog for StaticCatalog {
    fn resolve(&self, codes: &[&str], _locale: Option<&str>) -> BTreeMap<String, ErrorDetail> {
        codes
            .iter()
            .filter_map(|code| {
                self.messages.get(*code).map(|detail| {
                    (
                        code.to_string(),
                        ErrorDetail {
                            error_code: code.to_string(),
                            detail: detail.clone(),
                        },
                    )
                })
            })
            .collect()
    }
}

/// Explicit TTL-cached wrapper around any catalog
///
/// Catalog lookups are typically remote in production deployments, so
/// results are memoized per (codes, locale) with a bounded lifetime.
pub struct CachedCatalog<C> {
    inner: C,
    cache: Cache<String, BTreeMap<String, ErrorDetail>>,
}

impl<C: ErrorCatalog> CachedCatalog<C> {
    pub fn new(inner: C, ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    fn cache_key(codes: &[&str], locale: Option<&str>) -> String {
        format!("{}|{}", locale.unwrap_or_default(), codes.join(","))
    }
}

impl<C: ErrorCatalog> ErrorCatalog for CachedCatalog<C> {
    fn resolve(&self, codes: &[&str], locale: Option<&str>) -> BTreeMap<String, ErrorDetail> {
        // Sort so that key order does not fragment the cache
        let mut codes = codes.to_vec();
        codes.sort_unstable();
        codes.dedup();
        let key = Self::cache_key(&codes, locale);
        self.cache.get_with(key, || self.inner.resolve(&codes, locale))
    }
}
