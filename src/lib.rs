//! Cache revalidation coordination: a secret-gated revalidation endpoint in
//! front of a rendered page cache, and a relay that forwards invalidation
//! intents to it.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
