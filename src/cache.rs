//! Per-query result cache with a staleness window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::api::FetchOutcome;
use crate::models::{Section, SectionQuery};

// ─── Cached payload ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub sections: Vec<Section>,
    pub fetched_at: DateTime<Utc>,
    /// Store error that produced an empty `sections`, if any.
    pub error: Option<String>,
    invalidated: bool,
}

impl From<FetchOutcome> for CacheEntry {
    fn from(outcome: FetchOutcome) -> Self {
        Self {
            sections: outcome.sections,
            fetched_at: outcome.fetched_at,
            error: outcome.error,
            invalidated: false,
        }
    }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Entries never expire out of the map; a stale entry still renders while a
/// background refetch replaces it.
pub struct QueryCache {
    entries: HashMap<SectionQuery, CacheEntry>,
    stale_after: Duration,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stale_after,
        }
    }

    pub fn get(&self, query: &SectionQuery) -> Option<&CacheEntry> {
        self.entries.get(query)
    }

    pub fn insert(&mut self, query: SectionQuery, entry: CacheEntry) {
        self.entries.insert(query, entry);
    }

    /// Missing entries count as stale.
    pub fn is_stale(&self, query: &SectionQuery, now: DateTime<Utc>) -> bool {
        match self.entries.get(query) {
            None => true,
            Some(e) => e.invalidated || now - e.fetched_at >= self.stale_after,
        }
    }

    /// Mark an entry stale without dropping its rows.
    pub fn invalidate(&mut self, query: &SectionQuery) {
        if let Some(e) = self.entries.get_mut(query) {
            e.invalidated = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
