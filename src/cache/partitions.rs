//! Path- and tag-addressed invalidation over the page cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

use super::config::CacheConfig;
use super::registry::TagRegistry;
use super::store::PageStore;

const MAX_PATH_BYTES: usize = 1024;
const MAX_TAG_BYTES: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevalidateError {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("invalid tag `{tag}`: {reason}")]
    InvalidTag { tag: String, reason: &'static str },
    #[error("{0}")]
    Backend(String),
}

/// The "invalidate cache partition by key" primitive of the rendering layer.
///
/// Implementations fail on malformed keys instead of silently ignoring them.
pub trait CachePartitions: Send + Sync {
    fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError>;
    fn revalidate_tag(&self, tag: &str) -> Result<(), RevalidateError>;
}

/// In-process rendered page cache addressable by path and by tag.
#[derive(Clone)]
pub struct PageCache {
    pub config: CacheConfig,
    pub store: Arc<PageStore>,
    pub registry: Arc<TagRegistry>,
    generation: Arc<AtomicU64>,
}

impl PageCache {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(PageStore::new(&config));
        Self {
            config,
            store,
            registry: Arc::new(TagRegistry::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Incremented by every revalidation, before any page is dropped.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn advance_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl CachePartitions for PageCache {
    fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError> {
        validate_path(path)?;
        self.advance_generation();

        let removed = self.store.invalidate_path(path);
        for key in &removed {
            self.registry.unregister(key);
        }

        debug!(
            path,
            removed = removed.len(),
            tagged_pages = self.registry.key_count(),
            "revalidated path"
        );
        Ok(())
    }

    fn revalidate_tag(&self, tag: &str) -> Result<(), RevalidateError> {
        validate_tag(tag)?;
        self.advance_generation();

        let affected = self.registry.unregister_tag(tag);
        for key in &affected {
            self.store.invalidate(key);
        }

        debug!(
            tag,
            removed = affected.len(),
            tags = self.registry.tag_count(),
            "revalidated tag"
        );
        Ok(())
    }
}

pub fn validate_path(path: &str) -> Result<(), RevalidateError> {
    let invalid = |reason| RevalidateError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    if !path.starts_with('/') {
        return Err(invalid("path must start with `/`"));
    }
    if path.len() > MAX_PATH_BYTES {
        return Err(invalid("path exceeds 1024 bytes"));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("path contains whitespace or control characters"));
    }
    Ok(())
}

pub fn validate_tag(tag: &str) -> Result<(), RevalidateError> {
    let invalid = |reason| RevalidateError::InvalidTag {
        tag: tag.to_string(),
        reason,
    };

    if tag.is_empty() {
        return Err(invalid("tag is empty"));
    }
    if tag.len() > MAX_TAG_BYTES {
        return Err(invalid("tag exceeds 256 bytes"));
    }
    if tag.chars().any(char::is_control) {
        return Err(invalid("tag contains control characters"));
    }
    Ok(())
}
