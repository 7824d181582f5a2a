//! Routes of the invalidation relay host.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::application::error::ErrorReport;
use crate::application::relay::{RelayError, UpstreamResponse};
use crate::application::secret;
use crate::domain::relay::InvalidateCommand;
use crate::domain::revalidation::InvalidationRequest;

use super::RelayState;
use super::error::ApiError;

const SOURCE: &str = "infra::http::relay";

#[derive(Debug, Serialize)]
pub struct InvalidateSuccess {
    pub success: bool,
    pub message: &'static str,
    pub details: Value,
}

/// Check the caller's secret locally, then forward to the endpoint host.
pub async fn relay_revalidate(State(state): State<RelayState>, body: Bytes) -> Response {
    let Some(configured) = state.relay.secret() else {
        return ApiError::not_configured(SOURCE).into_response();
    };

    let request: InvalidationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return ApiError::relay_failed(SOURCE, &err).into_response(),
    };

    if !secret::verify(Some(configured), request.secret.as_deref()) {
        return ApiError::invalid_secret(SOURCE).into_response();
    }

    match state.relay.relay(request.path, request.tag).await {
        Ok(upstream) => upstream_response(upstream),
        Err(err) => ApiError::relay_failed(SOURCE, &err).into_response(),
    }
}

pub async fn cache_test_invalidate(State(state): State<RelayState>, body: Bytes) -> Response {
    if !state.relay.is_configured() {
        return ApiError::not_configured(SOURCE).into_response();
    }

    let command: InvalidateCommand = match serde_json::from_slice(&body) {
        Ok(command) => command,
        Err(err) => return ApiError::invalid_body(SOURCE, &err).into_response(),
    };

    let outcome = state
        .relay
        .invalidate(command.into_target())
        .await
        .and_then(UpstreamResponse::into_success);

    match outcome {
        Ok(details) => Json(InvalidateSuccess {
            success: true,
            message: "Cache invalidated successfully",
            details,
        })
        .into_response(),
        Err(err) => {
            let details = match &err {
                RelayError::Upstream { body, .. } => Some(body.clone()),
                _ => None,
            };
            ApiError::invalidate_failed(SOURCE, &err, details).into_response()
        }
    }
}

fn upstream_response(upstream: UpstreamResponse) -> Response {
    let status = upstream.status;
    let mut response = (status, Json(upstream.body)).into_response();
    if status.is_client_error() || status.is_server_error() {
        ErrorReport::from_message(
            SOURCE,
            status,
            format!("revalidation endpoint responded with {status}"),
        )
        .attach(&mut response);
    }
    response
}
