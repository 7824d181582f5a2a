//! Wire types exchanged between the relay and the revalidation endpoint.

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

/// Millisecond-precision UTC timestamp, e.g. `2024-05-01T12:30:00.123Z`.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

pub const SERVICE_NAME: &str = "revalidation-endpoint";

/// Format an instant as an ISO-8601 UTC timestamp.
pub fn iso_timestamp(at: OffsetDateTime) -> String {
    at.to_offset(time::UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_default()
}

pub fn now_timestamp() -> String {
    iso_timestamp(OffsetDateTime::now_utc())
}

/// Signed request naming the cache partitions to invalidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl InvalidationRequest {
    pub fn new(path: Option<String>, tag: Option<String>, secret: impl Into<String>) -> Self {
        Self {
            path,
            tag,
            secret: Some(secret.into()),
        }
    }

    /// Targets in processing order: path first, then tag. Empty strings count as absent.
    pub fn targets(&self) -> Vec<Target> {
        let path = present(self.path.as_deref()).map(|value| Target::Path(value.to_string()));
        let tag = present(self.tag.as_deref()).map(|value| Target::Tag(value.to_string()));
        path.into_iter().chain(tag).collect()
    }

    pub fn has_target(&self) -> bool {
        present(self.path.as_deref()).is_some() || present(self.tag.as_deref()).is_some()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// A single cache partition addressed either by route path or by tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(String),
    Tag(String),
}

impl Target {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Path(_) => "path",
            Target::Tag(_) => "tag",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Target::Path(value) | Target::Tag(value) => value,
        }
    }

    pub fn success_entry(&self) -> String {
        format!("{}: {}", self.kind(), self.value())
    }

    pub fn failure_entry(&self, message: &str) -> String {
        format!(
            "Failed to revalidate {} {}: {message}",
            self.kind(),
            self.value()
        )
    }
}

/// Per-target outcome summary returned by the revalidation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revalidated: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub timestamp: String,
}

impl InvalidationResult {
    pub fn new(timestamp: String) -> Self {
        Self {
            revalidated: Vec::new(),
            errors: Vec::new(),
            timestamp,
        }
    }

    /// True when at least one target failed.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Static discoverability metadata served on `GET /api/revalidate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub service: &'static str,
    pub version: &'static str,
    pub supported_methods: [&'static str; 1],
    pub required_fields: [&'static str; 2],
    pub example: InvalidationRequest,
    pub timestamp: String,
}

impl ServiceDescriptor {
    pub fn current() -> Self {
        Self {
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            supported_methods: ["POST"],
            required_fields: ["secret", "path or tag"],
            example: InvalidationRequest {
                path: Some("/posts".to_string()),
                tag: Some("posts".to_string()),
                secret: Some("your-secret-key".to_string()),
            },
            timestamp: now_timestamp(),
        }
    }
}
