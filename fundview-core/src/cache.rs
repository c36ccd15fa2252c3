//! Analysis result cache.
//!
//! Keeps the last successful analysis per (market code, ticker, parameters)
//! so a screen can redraw instantly, e.g. when switching between table and
//! chart. It is a display cache only: a new parameter combination always goes
//! to the backend. Entries live until overwritten, invalidated or cleared.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::selection::{ParamValue, Selection};

/// Composite cache key.
///
/// The canonical text is `market|ticker|k1=t:v1;k2=t:v2` with parameters in
/// name order, so the order parameters were set in never matters. `t` is the
/// value's type tag, so `Int(5)`, `Float(5.0)` and `Text("5")` stay distinct.
/// Separator characters inside components are backslash-escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    canonical: String,
}

fn escape(part: &str, out: &mut String) {
    for c in part.chars() {
        if matches!(c, '\\' | '|' | ';' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

impl CacheKey {
    pub fn derive(market_code: &str, ticker: &str, parameters: &BTreeMap<String, ParamValue>) -> Self {
        let mut canonical = String::new();
        escape(market_code, &mut canonical);
        canonical.push('|');
        escape(ticker, &mut canonical);
        canonical.push('|');
        for (i, (name, value)) in parameters.iter().enumerate() {
            if i > 0 {
                canonical.push(';');
            }
            escape(name, &mut canonical);
            canonical.push('=');
            canonical.push(value.type_tag());
            canonical.push(':');
            escape(&value.to_string(), &mut canonical);
        }
        Self { canonical }
    }

    pub fn for_selection(selection: &Selection) -> Self {
        Self::derive(&selection.market_code, &selection.ticker, &selection.parameters)
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Short BLAKE3 digest of the canonical text, for logs and status lines.
    pub fn digest(&self) -> String {
        let hex = blake3::hash(self.canonical.as_bytes()).to_hex();
        hex.as_str()[..12].to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AnalysisCache<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
}

impl<V> Default for AnalysisCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> AnalysisCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Store `value` under `key`, replacing any previous entry wholesale.
    pub fn put(&mut self, key: CacheKey, value: V) {
        debug!(key = %key.digest(), "analysis cached");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Utc::now(),
            },
        );
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
