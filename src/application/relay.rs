//! Invalidation relay: forwards signed revalidation requests to the endpoint host.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, histogram};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RevalidateSettings;
use crate::domain::revalidation::{InvalidationRequest, Target};

use super::secret::SharedSecret;

/// Route of the revalidation endpoint relative to its host's base URL.
pub const REVALIDATE_ROUTE: &str = "api/revalidate";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("revalidation is not configured")]
    NotConfigured,
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("revalidation request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream returned non-JSON body (status {status}): {message}")]
    Decode { status: StatusCode, message: String },
    #[error("upstream rejected revalidation with status {status}")]
    Upstream { status: StatusCode, body: Value },
}

impl RelayError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

/// Status and JSON body returned by the revalidation endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body of a 2xx response, or [`RelayError::Upstream`].
    pub fn into_success(self) -> Result<Value, RelayError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(RelayError::Upstream {
                status: self.status,
                body: self.body,
            })
        }
    }
}

#[derive(Debug, Clone)]
struct RelayTarget {
    url: Url,
    secret: SharedSecret,
}

/// Outbound side of the revalidation webhook.
///
/// Configured once from [`RevalidateSettings`]; without both an endpoint URL and
/// a secret every call fails with [`RelayError::NotConfigured`] before touching
/// the network.
#[derive(Debug, Clone)]
pub struct RelayService {
    client: Client,
    target: Option<RelayTarget>,
}

impl RelayService {
    pub fn new(settings: &RevalidateSettings) -> Result<Self, RelayError> {
        let client = Client::builder()
            .user_agent(concat!("revalidator/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(RelayError::Client)?;

        let secret = SharedSecret::from_config(settings.secret.as_ref());
        let target = match (settings.endpoint_url.as_ref(), secret) {
            (Some(base), Some(secret)) => Some(RelayTarget {
                url: endpoint_route(base)?,
                secret,
            }),
            _ => None,
        };

        match &target {
            Some(target) => info!(
                target = "revalidator::relay",
                endpoint = %target.url,
                timeout_ms = settings.timeout.as_millis() as u64,
                "relay configured"
            ),
            None => warn!(
                target = "revalidator::relay",
                "relay not configured; set REVALIDATE_SECRET and NEXTJS_URL to enable it"
            ),
        }

        Ok(Self { client, target })
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }

    pub fn secret(&self) -> Option<&SharedSecret> {
        self.target.as_ref().map(|target| &target.secret)
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.target.as_ref().map(|target| &target.url)
    }

    /// Forward one signed request. Any upstream status with a JSON body is returned as-is.
    pub async fn relay(
        &self,
        path: Option<String>,
        tag: Option<String>,
    ) -> Result<UpstreamResponse, RelayError> {
        let Some(target) = self.target.as_ref() else {
            counter!("revalidator_relay_requests_total", "outcome" => "not_configured")
                .increment(1);
            return Err(RelayError::NotConfigured);
        };

        let payload = InvalidationRequest::new(path, tag, target.secret.expose());
        let started_at = Instant::now();
        let result = self.send(&target.url, &payload).await;
        histogram!("revalidator_relay_request_ms")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        let outcome = match &result {
            Ok(response) if response.is_success() => "ok",
            Ok(_) => "upstream_error",
            Err(_) => "transport_error",
        };
        counter!("revalidator_relay_requests_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(response) if !response.is_success() => warn!(
                target = "revalidator::relay",
                status = response.status.as_u16(),
                body = %response.body,
                "revalidation endpoint reported failure"
            ),
            Err(err) => warn!(
                target = "revalidator::relay",
                error = %err,
                "revalidation request failed"
            ),
            Ok(_) => debug!(target = "revalidator::relay", "revalidation relayed"),
        }

        result
    }

    /// Relay a single typed target.
    pub async fn invalidate(&self, target: Target) -> Result<UpstreamResponse, RelayError> {
        match target {
            Target::Path(path) => self.relay(Some(path), None).await,
            Target::Tag(tag) => self.relay(None, Some(tag)).await,
        }
    }

    /// Fire-and-forget relay on a detached task.
    ///
    /// Failures are logged and counted only; callers never observe them.
    pub fn notify(self: &Arc<Self>, path: Option<String>, tag: Option<String>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if !service.is_configured() {
                debug!(
                    target = "revalidator::relay",
                    ?path,
                    ?tag,
                    "skipping revalidation: relay not configured"
                );
                return;
            }

            match service
                .relay(path.clone(), tag.clone())
                .await
                .and_then(UpstreamResponse::into_success)
            {
                Ok(_) => debug!(
                    target = "revalidator::relay",
                    ?path,
                    ?tag,
                    "background revalidation completed"
                ),
                Err(err) => warn!(
                    target = "revalidator::relay",
                    ?path,
                    ?tag,
                    error = %err,
                    "background revalidation failed"
                ),
            }
        })
    }

    async fn send(
        &self,
        url: &Url,
        payload: &InvalidationRequest,
    ) -> Result<UpstreamResponse, RelayError> {
        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(RelayError::from_send)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(RelayError::from_send)?;
        let body = serde_json::from_slice(&bytes).map_err(|err| RelayError::Decode {
            status,
            message: err.to_string(),
        })?;

        Ok(UpstreamResponse { status, body })
    }
}

/// Resolve the revalidation route under `base`, keeping any path prefix.
pub fn endpoint_route(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(REVALIDATE_ROUTE)
}
