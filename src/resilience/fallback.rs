//! Fallback payloads for rejected or failed calls.

use crate::resilience::outcome::{CallRequest, FailureReason};

/// Produces a substitute payload for a request that did not get a real one.
///
/// Implementations must be deterministic and free of side effects: the same
/// request and reason always give the same payload.
pub trait FallbackProvider<P>: Send + Sync {
    fn fallback(&self, request: &CallRequest, reason: FailureReason) -> P;
}

impl<P, F> FallbackProvider<P> for F
where
    F: Fn(&CallRequest, FailureReason) -> P + Send + Sync,
{
    fn fallback(&self, request: &CallRequest, reason: FailureReason) -> P {
        self(request, reason)
    }
}
