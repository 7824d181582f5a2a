//! HTTP surfaces: the revalidation endpoint host and the relay host.

pub mod error;
mod middleware;
mod pages;
mod relay;
mod revalidate;

pub use middleware::REQUEST_ID_HEADER;
pub use pages::page_tag;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::relay::RelayService;
use crate::application::revalidate::RevalidationService;
use crate::cache::{PageCache, page_cache_layer};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct EndpointState {
    pub revalidation: Arc<RevalidationService>,
    pub cache: PageCache,
}

#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<RelayService>,
}

/// Rendered pages plus `GET`/`POST /api/revalidate`.
pub fn build_endpoint_router(state: EndpointState) -> Router {
    let pages = Router::new()
        .route("/", get(pages::render_page))
        .route("/{*path}", get(pages::render_page))
        .layer(axum_middleware::from_fn_with_state(
            state.cache.clone(),
            page_cache_layer,
        ));

    let api = Router::new()
        .route(
            "/api/revalidate",
            get(revalidate::describe).post(revalidate::revalidate),
        )
        .with_state(state);

    api.merge(pages)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

pub fn build_relay_router(state: RelayState) -> Router {
    Router::new()
        .route("/api/revalidate", post(relay::relay_revalidate))
        .route("/api/cache-test/invalidate", post(relay::cache_test_invalidate))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
