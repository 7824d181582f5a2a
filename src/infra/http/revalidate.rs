//! `/api/revalidate` on the endpoint host.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::counter;

use crate::application::revalidate::RevalidateOutcome;
use crate::domain::revalidation::{InvalidationRequest, ServiceDescriptor};

use super::EndpointState;
use super::error::ApiError;

const SOURCE: &str = "infra::http::revalidate";

pub async fn revalidate(State(state): State<EndpointState>, body: Bytes) -> Response {
    let request: InvalidationRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            counter!("revalidator_revalidate_requests_total", "outcome" => "error").increment(1);
            return ApiError::internal(SOURCE, &err).into_response();
        }
    };

    match state.revalidation.handle(&request) {
        RevalidateOutcome::Unauthorized => ApiError::invalid_secret(SOURCE).into_response(),
        RevalidateOutcome::MissingTarget => ApiError::missing_target(SOURCE).into_response(),
        RevalidateOutcome::Completed(result) => {
            let status = if result.is_partial() {
                StatusCode::MULTI_STATUS
            } else {
                StatusCode::OK
            };
            (status, Json(result)).into_response()
        }
    }
}

pub async fn describe(State(state): State<EndpointState>) -> Json<ServiceDescriptor> {
    Json(state.revalidation.describe())
}
