//! Page cache middleware.
//!
//! Serves successful GET renderings from the [`PageCache`] and stores misses,
//! registering the tags the handler declared through [`deps::record`].

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::{debug, instrument, warn};

use super::{deps, keys::PageKey, partitions::PageCache, store::CachedPage};

pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<PageCache>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
    );

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = "page", outcome = "hit", "serving cached page");
        return build_response(cached);
    }

    let generation = cache.generation();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let fits = response
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= cache.config.body_limit_bytes as u64);
    if !fits {
        debug!(cache = "page", outcome = "skip", "page body too large to cache");
        return with_cache_status(response, "BYPASS");
    }

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(cache = "page", error = %err, "failed to buffer rendered page");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedPage {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    debug!(cache = "page", tags = tags.len(), "caching page");

    if let Some(evicted) = cache.store.set(key.clone(), cached) {
        cache.registry.unregister(&evicted);
    }
    cache.registry.register(key.clone(), tags);

    // A revalidation that ran during the render may have missed this page.
    if cache.generation() != generation {
        cache.store.invalidate(&key);
        cache.registry.unregister(&key);
        debug!(cache = "page", "revalidated while rendering; not keeping page");
        return with_cache_status(Response::from_parts(parts, Body::from(bytes)), "BYPASS");
    }

    with_cache_status(Response::from_parts(parts, Body::from(bytes)), "MISS")
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

fn build_response(cached: CachedPage) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    let response = builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    with_cache_status(response, "HIT")
}
