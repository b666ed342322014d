//! Result memoization shim. Disabled by default, which keeps the current
//! contract: `resolve(options) == compute(options)` always. When enabled,
//! entries are keyed by a fingerprint of the filter set and pagination
//! window (the viewer is deliberately excluded) and bounded by a TTL; the
//! service re-resolves the requesting viewer's own like/bookmark flags on
//! every hit, so aggregate counts may be momentarily stale but viewer-own
//! state never is.

use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::feed::options::{FilterSet, QueryOptions};
use crate::models::QueryResult;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 1024,
            ttl: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

pub struct FeedCache {
    entries: Option<Mutex<LruCache<u64, CacheEntry>>>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(config: CacheConfig) -> Self {
        let entries = config.enabled.then(|| {
            let capacity =
                NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            Mutex::new(LruCache::new(capacity))
        });
        Self {
            entries,
            ttl: config.ttl,
        }
    }

    /// Request fingerprint: filter set plus pagination window. The viewing
    /// user is not part of the key; viewer-own state is refreshed on hit.
    pub fn fingerprint(options: &QueryOptions) -> u64 {
        let mut hasher = DefaultHasher::new();
        FilterSet::from_options(options).hash(&mut hasher);
        options.page.hash(&mut hasher);
        options.page_size.hash(&mut hasher);
        hasher.finish()
    }

    pub fn lookup(&self, options: &QueryOptions) -> Option<QueryResult> {
        let entries = self.entries.as_ref()?;
        let key = Self::fingerprint(options);
        let mut entries = entries.lock().ok()?;
        match entries.get(&key) {
            Some(entry) if !entry.is_expired(self.ttl) => Some(entry.result.clone()),
            Some(_) => {
                entries.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, options: &QueryOptions, result: &QueryResult) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        if let Ok(mut entries) = entries.lock() {
            entries.put(
                Self::fingerprint(options),
                CacheEntry {
                    result: result.clone(),
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(total_count: u64) -> QueryResult {
        QueryResult {
            posts: Vec::new(),
            total_count,
        }
    }

    #[test]
    fn disabled_cache_is_pass_through() {
        let cache = FeedCache::new(CacheConfig::default());
        let options = QueryOptions::default();
        cache.insert(&options, &result(5));
        assert!(cache.lookup(&options).is_none());
    }

    #[test]
    fn fingerprint_ignores_viewer() {
        let a = QueryOptions {
            viewing_user_id: Some(1),
            ..Default::default()
        };
        let b = QueryOptions {
            viewing_user_id: Some(2),
            ..Default::default()
        };
        assert_eq!(FeedCache::fingerprint(&a), FeedCache::fingerprint(&b));
    }

    #[test]
    fn fingerprint_distinguishes_filters_and_pages() {
        let base = QueryOptions::default();
        let by_author = QueryOptions {
            author_id: Some(3),
            ..Default::default()
        };
        let page_two = QueryOptions {
            page: 2,
            ..Default::default()
        };
        assert_ne!(
            FeedCache::fingerprint(&base),
            FeedCache::fingerprint(&by_author)
        );
        assert_ne!(
            FeedCache::fingerprint(&base),
            FeedCache::fingerprint(&page_two)
        );
    }

    #[test]
    fn enabled_cache_honors_ttl() {
        let cache = FeedCache::new(CacheConfig {
            enabled: true,
            max_entries: 8,
            ttl: Duration::from_millis(0),
        });
        let options = QueryOptions::default();
        cache.insert(&options, &result(5));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.lookup(&options).is_none());
    }

    #[test]
    fn enabled_cache_returns_fresh_entry() {
        let cache = FeedCache::new(CacheConfig {
            enabled: true,
            max_entries: 8,
            ttl: Duration::from_secs(60),
        });
        let options = QueryOptions::default();
        cache.insert(&options, &result(5));
        assert_eq!(cache.lookup(&options).unwrap().total_count, 5);
    }
}
