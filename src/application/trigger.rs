//! Content mutation hooks that schedule cache revalidation.

use std::fmt::Display;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use super::relay::RelayService;

pub const CATEGORIES_PATH: &str = "/categories";
pub const CATEGORIES_TAG: &str = "categories";
pub const POSTS_TAG: &str = "posts";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const DASHBOARD_TAG: &str = "dashboard-stats";

/// Called by content handlers after a successful write.
///
/// Every hook returns immediately; the revalidation runs on a detached task.
#[derive(Debug, Clone)]
pub struct ContentTrigger {
    relay: Arc<RelayService>,
}

impl ContentTrigger {
    pub fn new(relay: Arc<RelayService>) -> Self {
        Self { relay }
    }

    pub fn category_changed(&self) -> JoinHandle<()> {
        self.fire("category_changed", CATEGORIES_PATH.to_string(), CATEGORIES_TAG)
    }

    pub fn post_changed(&self, id: impl Display) -> JoinHandle<()> {
        self.fire("post_changed", post_path(id), POSTS_TAG)
    }

    pub fn post_deleted(&self, id: impl Display) -> JoinHandle<()> {
        self.fire("post_deleted", post_path(id), POSTS_TAG)
    }

    pub fn dashboard_changed(&self) -> JoinHandle<()> {
        self.fire("dashboard_changed", DASHBOARD_PATH.to_string(), DASHBOARD_TAG)
    }

    fn fire(&self, event: &'static str, path: String, tag: &'static str) -> JoinHandle<()> {
        debug!(
            target = "revalidator::trigger",
            event,
            path = %path,
            tag,
            configured = self.relay.is_configured(),
            "content change observed"
        );
        self.relay.notify(Some(path), Some(tag.to_string()))
    }
}

fn post_path(id: impl Display) -> String {
    format!("/posts/{id}")
}
