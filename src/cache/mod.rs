//! Rendered page cache.
//!
//! Stores successful GET renderings in an LRU keyed by path and query, and
//! tracks the tags each page declared. Both are addressable for invalidation
//! through [`CachePartitions`]:
//!
//! - **by path**: drops every cached variant of one route
//! - **by tag**: drops every page that declared the tag while rendering

mod config;
pub mod deps;
mod keys;
mod lock;
mod middleware;
mod partitions;
mod registry;
mod store;

pub use config::CacheConfig;
pub use keys::{PageKey, hash_query};
pub use middleware::{CACHE_STATUS_HEADER, page_cache_layer};
pub use partitions::{CachePartitions, PageCache, RevalidateError, validate_path, validate_tag};
pub use registry::TagRegistry;
pub use store::{CachedPage, PageStore};
