//! Shared-secret verification used by both the endpoint and the relay.

use std::fmt;

use subtle::ConstantTimeEq;

/// The configured shared secret.
///
/// Comparison is exact and case-sensitive, with no normalization, and runs in
/// constant time with respect to the secret's contents.
#[derive(Clone)]
pub struct SharedSecret(String);

impl SharedSecret {
    /// Wrap a configured value; blank values yield `None`.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.trim().is_empty()).then_some(Self(value))
    }

    pub fn from_config(value: Option<&String>) -> Option<Self> {
        value.and_then(|value| Self::new(value.clone()))
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Verify a presented credential against an optional configured secret.
///
/// An unset secret rejects everything, including an absent credential.
pub fn verify(configured: Option<&SharedSecret>, presented: Option<&str>) -> bool {
    match (configured, presented) {
        (Some(secret), Some(presented)) => secret.matches(presented),
        _ => false,
    }
}
