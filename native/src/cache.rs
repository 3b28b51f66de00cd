//! Parsed-stylesheet cache keyed by raw CSS text.
//!
//! One read-write lock guards the map. Lookups take the read lock; a miss
//! parses outside any lock and then re-checks under the write lock, so a
//! concurrent insert of the same key wins and both callers share one entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::stylesheet::Stylesheet;

#[derive(Debug)]
pub struct StyleCache {
    enabled: AtomicBool,
    entries: RwLock<HashMap<String, Arc<Stylesheet>>>,
    parses: AtomicU64,
}

impl Default for StyleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleCache {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            entries: RwLock::new(HashMap::new()),
            parses: AtomicU64::new(0),
        }
    }

    /// Process-wide instance.
    pub fn global() -> Arc<StyleCache> {
        static GLOBAL: OnceLock<Arc<StyleCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(StyleCache::new())).clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Disabling does not drop existing entries; lookups simply miss until
    /// the cache is enabled again.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn get(&self, css: &str) -> Option<Arc<Stylesheet>> {
        if !self.is_enabled() {
            return None;
        }
        self.entries.read().get(css).cloned()
    }

    pub fn set(&self, css: &str, sheet: Arc<Stylesheet>) {
        if !self.is_enabled() {
            return;
        }
        self.entries.write().insert(css.to_string(), sheet);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `get_or_parse` actually ran the parser.
    pub fn parse_count(&self) -> u64 {
        self.parses.load(Ordering::Relaxed)
    }

    pub fn get_or_parse(&self, css: &str) -> Arc<Stylesheet> {
        if let Some(hit) = self.get(css) {
            return hit;
        }

        let parsed = Arc::new(Stylesheet::parse(css));
        self.parses.fetch_add(1, Ordering::Relaxed);
        if !self.is_enabled() {
            return parsed;
        }

        let mut entries = self.entries.write();
        entries
            .entry(css.to_string())
            .or_insert(parsed)
            .clone()
    }
}
