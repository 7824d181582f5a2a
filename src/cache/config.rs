//! Page cache configuration.

use std::num::NonZeroUsize;

use crate::config::{CacheSettings, DEFAULT_CACHE_BODY_LIMIT_BYTES, DEFAULT_CACHE_RESPONSE_LIMIT};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve and store rendered pages.
    pub enabled: bool,
    /// Maximum number of cached pages before LRU eviction.
    pub response_limit: usize,
    /// Pages with larger bodies are served but never stored.
    pub body_limit_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            response_limit: DEFAULT_CACHE_RESPONSE_LIMIT,
            body_limit_bytes: DEFAULT_CACHE_BODY_LIMIT_BYTES,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            response_limit: settings.response_limit.get(),
            body_limit_bytes: settings.body_limit_bytes,
        }
    }
}

impl CacheConfig {
    /// Returns the response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.response_limit, 200);
        assert_eq!(config.body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            response_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.response_limit_non_zero().get(), 1);
    }
}
