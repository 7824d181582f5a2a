//! Tag collector for rendered pages.
//!
//! Handlers call [`record`] while rendering; the page cache middleware wraps
//! the handler in [`with_collector`] and registers the collected tags against
//! the stored page.

use std::cell::RefCell;
use std::collections::HashSet;

tokio::task_local! {
    static TAGS: RefCell<HashSet<String>>;
}

/// Declare that the page being rendered belongs to `tag`.
///
/// Outside a collector scope the call is ignored.
pub fn record(tag: impl Into<String>) {
    let tag = tag.into();
    let _ = TAGS.try_with(|tags| {
        tags.borrow_mut().insert(tag);
    });
}

/// Tags recorded so far in the current scope.
pub fn collect() -> HashSet<String> {
    TAGS.try_with(|tags| tags.borrow().clone())
        .unwrap_or_default()
}

/// Run a future with a fresh tag collector and return its output with the recorded tags.
pub async fn with_collector<F, R>(f: F) -> (R, HashSet<String>)
where
    F: std::future::Future<Output = R>,
{
    TAGS.scope(RefCell::new(HashSet::new()), async move {
        let result = f.await;
        (result, collect())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_without_collector_is_no_op() {
        record("posts");
        assert!(collect().is_empty());
    }

    #[tokio::test]
    async fn with_collector_captures_tags() {
        let (value, tags) = with_collector(async {
            record("posts");
            record("categories");
            7
        })
        .await;

        assert_eq!(value, 7);
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("posts"));
        assert!(tags.contains("categories"));
    }

    #[tokio::test]
    async fn record_deduplicates() {
        let (_, tags) = with_collector(async {
            record("posts");
            record("posts");
        })
        .await;

        assert_eq!(tags.len(), 1);
    }
}
