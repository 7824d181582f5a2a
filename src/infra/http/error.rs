//! JSON error responses for the revalidation and relay routes.

use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::application::error::ErrorReport;
use crate::domain::revalidation::now_timestamp;

pub const INVALID_SECRET: &str = "Invalid secret";
pub const MISSING_TARGET: &str = "Either path or tag must be provided";
pub const INTERNAL_ERROR: &str = "Internal server error";
pub const RELAY_FAILED: &str = "Failed to revalidate";
pub const NOT_CONFIGURED: &str = "Revalidation not configured";
pub const INVALID_BODY: &str = "Invalid request body";
pub const INVALIDATE_FAILED: &str = "Failed to invalidate cache";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiErrorBody {
    Plain {
        error: &'static str,
    },
    Internal {
        error: &'static str,
        message: String,
        timestamp: String,
    },
    Flagged {
        success: bool,
        error: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
    report: ErrorReport,
}

impl ApiError {
    fn new(status: StatusCode, body: ApiErrorBody, report: ErrorReport) -> Self {
        Self {
            status,
            body,
            report,
        }
    }

    fn plain(source: &'static str, status: StatusCode, error: &'static str) -> Self {
        Self::new(
            status,
            ApiErrorBody::Plain { error },
            ErrorReport::from_message(source, status, error),
        )
    }

    fn flagged(
        status: StatusCode,
        error: &'static str,
        details: Option<Value>,
        report: ErrorReport,
    ) -> Self {
        Self::new(
            status,
            ApiErrorBody::Flagged {
                success: false,
                error,
                details,
            },
            report,
        )
    }

    pub fn invalid_secret(source: &'static str) -> Self {
        Self::plain(source, StatusCode::UNAUTHORIZED, INVALID_SECRET)
    }

    pub fn missing_target(source: &'static str) -> Self {
        Self::plain(source, StatusCode::BAD_REQUEST, MISSING_TARGET)
    }

    /// 500 carrying the error text, for failures while handling an endpoint request.
    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self::new(
            status,
            ApiErrorBody::Internal {
                error: INTERNAL_ERROR,
                message: error.to_string(),
                timestamp: now_timestamp(),
            },
            ErrorReport::from_error(source, status, error),
        )
    }

    pub fn relay_failed(source: &'static str, error: &dyn StdError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self::new(
            status,
            ApiErrorBody::Plain {
                error: RELAY_FAILED,
            },
            ErrorReport::from_error(source, status, error),
        )
    }

    pub fn not_configured(source: &'static str) -> Self {
        let status = StatusCode::SERVICE_UNAVAILABLE;
        Self::flagged(
            status,
            NOT_CONFIGURED,
            None,
            ErrorReport::from_message(source, status, "relay endpoint url or secret missing"),
        )
    }

    pub fn invalid_body(source: &'static str, error: &dyn StdError) -> Self {
        let status = StatusCode::BAD_REQUEST;
        Self::flagged(
            status,
            INVALID_BODY,
            None,
            ErrorReport::from_error(source, status, error),
        )
    }

    pub fn invalidate_failed(
        source: &'static str,
        error: &dyn StdError,
        details: Option<Value>,
    ) -> Self {
        let status = StatusCode::BAD_GATEWAY;
        Self::flagged(
            status,
            INVALIDATE_FAILED,
            details,
            ErrorReport::from_error(source, status, error),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
