//! Rendered page storage.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Buffered HTTP response for a rendered page.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// LRU store of rendered pages.
pub struct PageStore {
    pages: RwLock<LruCache<PageKey, CachedPage>>,
}

impl PageStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            pages: RwLock::new(LruCache::new(config.response_limit_non_zero())),
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<CachedPage> {
        let cached = rw_write(&self.pages, SOURCE, "get").get(key).cloned();
        if cached.is_some() {
            counter!("revalidator_page_cache_hit_total").increment(1);
        } else {
            counter!("revalidator_page_cache_miss_total").increment(1);
        }
        cached
    }

    /// Store a page, returning the key evicted to make room, if any.
    pub fn set(&self, key: PageKey, page: CachedPage) -> Option<PageKey> {
        let evicted = rw_write(&self.pages, SOURCE, "set")
            .push(key.clone(), page)
            .map(|(evicted_key, _)| evicted_key)
            .filter(|evicted_key| *evicted_key != key);
        if evicted.is_some() {
            counter!("revalidator_page_cache_evict_total").increment(1);
        }
        evicted
    }

    pub fn invalidate(&self, key: &PageKey) -> bool {
        rw_write(&self.pages, SOURCE, "invalidate").pop(key).is_some()
    }

    /// Drop every cached variant of `path`, returning the removed keys.
    pub fn invalidate_path(&self, path: &str) -> Vec<PageKey> {
        let mut pages = rw_write(&self.pages, SOURCE, "invalidate_path");
        let matching: Vec<PageKey> = pages
            .iter()
            .filter(|(key, _)| key.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            pages.pop(key);
        }
        matching
    }

    pub fn len(&self) -> usize {
        rw_read(&self.pages, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
