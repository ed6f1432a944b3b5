// Memoization of date-string parsing.
//
// Parsing a date runs every configured format in turn, so results (including
// failures) are kept in a bounded FIFO map keyed by the raw string and the
// custom format list. One instance is shared process-wide by default; parsers
// may be given their own instance instead.
use crate::normalize::parse_date_with_formats;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_MAX_CACHE_SIZE: usize = 10_000;

static GLOBAL_DATE_CACHE: Lazy<Arc<DateCache>> =
    Lazy::new(|| Arc::new(DateCache::new(DEFAULT_MAX_CACHE_SIZE)));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    // None marks a string that matched no format.
    entries: HashMap<String, Option<NaiveDate>>,
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct DateCache {
    inner: Mutex<CacheInner>,
    max_size: usize,
}

impl Default for DateCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_SIZE)
    }
}

impl DateCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            max_size: max_size.max(1),
        }
    }

    /// The process-wide cache used by parsers that were not given their own.
    pub fn global() -> Arc<DateCache> {
        Arc::clone(&GLOBAL_DATE_CACHE)
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Poisoned locks are recovered; entries are always inserted whole.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(raw: &str, custom_formats: &[String]) -> String {
        format!("{}_{}", raw, custom_formats.join(","))
    }

    /// Parse `raw` with `custom_formats` tried first, reusing any earlier result.
    pub fn get_or_parse(&self, raw: &str, custom_formats: &[String]) -> Option<NaiveDate> {
        let key = Self::key(raw, custom_formats);
        if let Some(hit) = self.lock().entries.get(&key) {
            log::trace!("date cache hit for '{}'", raw);
            return *hit;
        }

        let parsed = parse_date_with_formats(raw, custom_formats);

        let mut inner = self.lock();
        if inner.entries.contains_key(&key) {
            return parsed;
        }
        while inner.entries.len() >= self.max_size {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, parsed);
        parsed
    }

    pub fn contains(&self, raw: &str, custom_formats: &[String]) -> bool {
        self.lock()
            .entries
            .contains_key(&Self::key(raw, custom_formats))
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
        }
    }
}
