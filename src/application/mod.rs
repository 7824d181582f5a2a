//! Application services: revalidation, relay and content triggers.

pub mod error;
pub mod relay;
pub mod revalidate;
pub mod secret;
pub mod trigger;
