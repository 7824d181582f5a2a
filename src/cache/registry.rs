//! Bidirectional tag registry.
//!
//! Tracks which cached pages declared which tags so a tag revalidation can
//! find every page it covers.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Tracks tag → pages and page → tags mappings.
pub struct TagRegistry {
    tag_to_keys: RwLock<HashMap<String, HashSet<PageKey>>>,
    key_to_tags: RwLock<HashMap<PageKey, HashSet<String>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cached page with the tags it declared, replacing earlier tags.
    pub fn register(&self, key: PageKey, tags: HashSet<String>) {
        self.unregister(&key);

        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key.clone());
        }
        k2t.insert(key, tags);
    }

    /// Pages currently tagged with `tag`.
    pub fn keys_for_tag(&self, tag: &str) -> HashSet<PageKey> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a page; called when it is evicted or invalidated.
    pub fn unregister(&self, key: &PageKey) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            for tag in tags {
                if let Some(keys) = t2k.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        t2k.remove(&tag);
                    }
                }
            }
        }
    }

    /// Remove a tag and every page registered under it. Returns the affected pages.
    pub fn unregister_tag(&self, tag: &str) -> HashSet<PageKey> {
        let affected = rw_write(&self.tag_to_keys, SOURCE, "unregister_tag")
            .remove(tag)
            .unwrap_or_default();

        for key in &affected {
            self.unregister(key);
        }

        affected
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}
