//! Request and outcome types shared by the gates and the client.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// One logical call to a downstream resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub resource: String,
    pub key: String,
    pub timeout: Option<Duration>,
}

impl CallRequest {
    pub fn new(resource: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            key: key.into(),
            timeout: None,
        }
    }

    /// Override the resource's configured call timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Why a call was answered with a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No permit left in the current refill window. Back off.
    RejectedByLimiter,
    /// The circuit is open. Retriable after the open timeout.
    BreakerOpen,
    /// The downstream answered with an error or was unreachable.
    DownstreamError,
    /// The remote call missed its deadline or was abandoned.
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::RejectedByLimiter => "rejected_by_limiter",
            FailureReason::BreakerOpen => "breaker_open",
            FailureReason::DownstreamError => "downstream_error",
            FailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a request through the gates and the remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<P> {
    Success(P),
    Failure(FailureReason),
}

/// A substitute payload and the reason it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackResult<P> {
    pub payload: P,
    pub reason: FailureReason,
}

/// What the caller of the resilient client receives: always a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<P> {
    Live(P),
    Fallback(FallbackResult<P>),
}

impl<P> Response<P> {
    pub fn payload(&self) -> &P {
        match self {
            Response::Live(payload) => payload,
            Response::Fallback(fallback) => &fallback.payload,
        }
    }

    pub fn into_payload(self) -> P {
        match self {
            Response::Live(payload) => payload,
            Response::Fallback(fallback) => fallback.payload,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, Response::Fallback(_))
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Response::Live(_) => None,
            Response::Fallback(fallback) => Some(fallback.reason),
        }
    }
}
