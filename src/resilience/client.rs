//! Resilient outbound client.
//!
//! Runs each call through the fixed chain
//! `RateLimiter → CircuitBreaker → remote call (with deadline) → outcome`,
//! substituting a fallback payload whenever a gate rejects the call or the
//! call fails. Callers always get a payload back.

use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ResilienceConfig;
use crate::observability::metrics;
use crate::remote::RemoteCall;
use crate::resilience::{
    timeouts, CallOutcome, CallRequest, CircuitBreaker, FailureReason, FallbackProvider,
    FallbackResult, RateLimiter, Response,
};

/// Protects one or more downstream resources behind shared gates.
pub struct ResilientClient<R, F> {
    remote: R,
    fallback: F,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    policies: ResilienceConfig,
}

impl<R, F> ResilientClient<R, F>
where
    R: RemoteCall,
    F: FallbackProvider<R::Payload>,
{
    /// Build a client with limiter and breaker state for every configured
    /// resource.
    pub fn new(remote: R, fallback: F, policies: ResilienceConfig) -> Self {
        Self {
            limiter: RateLimiter::from_config(&policies),
            breaker: CircuitBreaker::from_config(&policies),
            remote,
            fallback,
            policies,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Fetch `key` from `resource`, returning the real or fallback payload.
    pub async fn fetch(&self, resource: &str, key: &str) -> R::Payload {
        self.call(CallRequest::new(resource, key)).await.into_payload()
    }

    /// Run one request through the chain.
    ///
    /// Dropping the returned future while the remote call is pending counts
    /// as one failure for the resource's breaker.
    pub async fn call(&self, request: CallRequest) -> Response<R::Payload> {
        let span = tracing::info_span!(
            "outbound_call",
            call_id = %Uuid::new_v4(),
            resource = %request.resource,
            key = %request.key
        );

        async move {
            let outcome = self.attempt(&request).await;
            self.resolve(&request, outcome)
        }
        .instrument(span)
        .await
    }

    async fn attempt(&self, request: &CallRequest) -> CallOutcome<R::Payload> {
        let resource = request.resource.as_str();

        if !self.limiter.try_acquire(resource) {
            return CallOutcome::Failure(FailureReason::RejectedByLimiter);
        }

        let Some(attempt) = self.breaker.begin(resource) else {
            tracing::debug!("Circuit open, skipping remote call");
            return CallOutcome::Failure(FailureReason::BreakerOpen);
        };

        let deadline = self.deadline_for(request);
        let started = Instant::now();
        let result = timeouts::with_deadline(
            deadline,
            self.remote.invoke(resource, &request.key, deadline),
        )
        .await;
        metrics::record_call_duration(resource, started.elapsed());

        match result {
            Ok(payload) => {
                attempt.succeed();
                CallOutcome::Success(payload)
            }
            Err(failure) => {
                attempt.fail();
                tracing::warn!(error = %failure, "Remote call failed");
                if failure.is_timeout() {
                    CallOutcome::Failure(FailureReason::Timeout)
                } else {
                    CallOutcome::Failure(FailureReason::DownstreamError)
                }
            }
        }
    }

    fn resolve(
        &self,
        request: &CallRequest,
        outcome: CallOutcome<R::Payload>,
    ) -> Response<R::Payload> {
        match outcome {
            CallOutcome::Success(payload) => {
                metrics::record_call(&request.resource, "success");
                Response::Live(payload)
            }
            CallOutcome::Failure(reason) => {
                tracing::info!(reason = %reason, "Serving fallback");
                metrics::record_call(&request.resource, reason.as_str());
                Response::Fallback(FallbackResult {
                    payload: self.fallback.fallback(request, reason),
                    reason,
                })
            }
        }
    }

    fn deadline_for(&self, request: &CallRequest) -> Duration {
        request
            .timeout
            .unwrap_or_else(|| self.policies.policy_for(&request.resource).call_timeout())
    }
}
