//! Raw query parameter source
//!
//! `RawParams` is the untyped input the pipeline validates: an ordered
//! multi-value map of string parameters plus the structured sub-maps
//! produced by OpenAPI deepObject keys (`search[name__icontains]=x`).
//! The transport layer owns URL decoding; this type only holds decoded
//! key/value pairs.

use std::sync::LazyLock;

use regex::Regex;

/// Matches deepObject keys like `search[name__icontains]`
static DEEP_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<map>[A-Za-z][A-Za-z0-9_]*)\[(?P<key>.+)\]$").expect("invalid deepObject pattern")
});

/// What a single-key lookup yields
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The key appeared once
    Str(String),
    /// The key was repeated; values in arrival order
    List(Vec<String>),
    /// A structured sub-map (`search` / `exclude`), insertion-ordered
    Map(Vec<(String, String)>),
}

/// Ordered multi-value map of raw query parameters
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    entries: Vec<(String, String)>,
    maps: Vec<(String, Vec<(String, String)>)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `key=value` pairs, folding deepObject keys into
    /// their named sub-map. Everything else is kept as a plain entry.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.into();
            match DEEP_OBJECT.captures(&key) {
                Some(caps) => params.insert_map_entry(&caps["map"], &caps["key"], value),
                None => params.insert(key, value),
            }
        }
        params
    }

    /// Append a plain key/value pair
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Append an entry to the named structured sub-map
    pub fn insert_map_entry(&mut self, map: &str, key: &str, value: impl Into<String>) {
        let entry = (key.to_string(), value.into());
        match self.maps.iter_mut().find(|(name, _)| name == map) {
            Some((_, entries)) => entries.push(entry),
            None => self.maps.push((map.to_string(), vec![entry])),
        }
    }

    /// Whether the key is present, either as a plain entry or a sub-map
    pub fn contains(&self, key: &str) -> bool {
        self.maps.iter().any(|(name, _)| name == key)
            || self.entries.iter().any(|(k, _)| k == key)
    }

    /// Look up one key. A sub-map name yields `Map`; a plain key yields
    /// `Str` when it appeared once and `List` when repeated; absent keys
    /// yield `None`.
    pub fn get(&self, key: &str) -> Option<RawValue> {
        if let Some((_, entries)) = self.maps.iter().find(|(name, _)| name == key) {
            return Some(RawValue::Map(entries.clone()));
        }
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect();
        match values.as_slice() {
            [] => None,
            [single] => Some(RawValue::Str((*single).to_string())),
            many => Some(RawValue::List(many.iter().map(|v| (*v).to_string()).collect())),
        }
    }

    /// All plain entries in arrival order (sub-maps excluded). Used by
    /// the legacy flat-key filter scan.
    pub(crate) fn plain_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
