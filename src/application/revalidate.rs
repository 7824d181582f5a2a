//! Revalidation endpoint logic: authenticate, then invalidate each target independently.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use crate::cache::CachePartitions;
use crate::domain::revalidation::{
    InvalidationRequest, InvalidationResult, ServiceDescriptor, Target, now_timestamp,
};

use super::secret::{self, SharedSecret};

/// Terminal result of one invalidation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidateOutcome {
    /// Secret missing, unset or mismatched. Nothing was attempted.
    Unauthorized,
    /// Neither path nor tag was supplied. Nothing was attempted.
    MissingTarget,
    /// Every target was attempted; `errors` lists the ones that failed.
    Completed(InvalidationResult),
}

pub struct RevalidationService {
    secret: Option<SharedSecret>,
    partitions: Arc<dyn CachePartitions>,
}

impl RevalidationService {
    pub fn new(secret: Option<SharedSecret>, partitions: Arc<dyn CachePartitions>) -> Self {
        if secret.is_none() {
            warn!(
                target = "revalidator::revalidate",
                "no revalidation secret configured; every request will be rejected"
            );
        }
        Self { secret, partitions }
    }

    pub fn handle(&self, request: &InvalidationRequest) -> RevalidateOutcome {
        if !secret::verify(self.secret.as_ref(), request.secret.as_deref()) {
            counter!("revalidator_revalidate_requests_total", "outcome" => "unauthorized")
                .increment(1);
            return RevalidateOutcome::Unauthorized;
        }

        if !request.has_target() {
            counter!("revalidator_revalidate_requests_total", "outcome" => "bad_request")
                .increment(1);
            return RevalidateOutcome::MissingTarget;
        }

        let mut result = InvalidationResult::new(now_timestamp());
        for target in request.targets() {
            match self.apply(&target) {
                Ok(()) => {
                    counter!("revalidator_targets_revalidated_total", "kind" => target.kind())
                        .increment(1);
                    result.revalidated.push(target.success_entry());
                }
                Err(message) => {
                    counter!("revalidator_targets_failed_total", "kind" => target.kind())
                        .increment(1);
                    warn!(
                        target = "revalidator::revalidate",
                        kind = target.kind(),
                        key = target.value(),
                        error = %message,
                        "cache partition revalidation failed"
                    );
                    result.errors.push(target.failure_entry(&message));
                }
            }
        }

        let outcome = if result.is_partial() { "partial" } else { "ok" };
        counter!("revalidator_revalidate_requests_total", "outcome" => outcome).increment(1);
        info!(
            target = "revalidator::revalidate",
            revalidated = ?result.revalidated,
            failed = result.errors.len(),
            "revalidation request handled"
        );

        RevalidateOutcome::Completed(result)
    }

    pub fn describe(&self) -> ServiceDescriptor {
        ServiceDescriptor::current()
    }

    fn apply(&self, target: &Target) -> Result<(), String> {
        let attempt = match target {
            Target::Path(path) => self.partitions.revalidate_path(path),
            Target::Tag(tag) => self.partitions.revalidate_tag(tag),
        };
        attempt.map_err(|err| err.to_string())
    }
}
