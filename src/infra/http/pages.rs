//! Rendered pages served through the page cache.

use axum::{
    http::{StatusCode, Uri},
    response::Response,
};

use crate::cache::deps;
use crate::domain::revalidation::now_timestamp;
use crate::presentation::views::{PageTemplate, PageView, render_template_response};

pub const HOME_TAG: &str = "home";

pub async fn render_page(uri: Uri) -> Response {
    let path = uri.path().to_string();
    let tag = page_tag(&path);
    deps::record(tag.clone());

    let view = PageView {
        path,
        tag,
        rendered_at: now_timestamp(),
    };
    render_template_response(PageTemplate { view }, StatusCode::OK)
}

/// The first path segment, or `home` for the root.
pub fn page_tag(path: &str) -> String {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(HOME_TAG)
        .to_string()
}
