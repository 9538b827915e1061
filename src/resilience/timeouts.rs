//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap the remote call with its deadline
//! - Keep timeout errors distinct from downstream errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - A downstream that reports its own timeout is classified the same way

use std::future::Future;
use std::time::Duration;

use crate::remote::RemoteError;

/// Why a bounded remote call did not produce a payload.
#[derive(Debug, thiserror::Error)]
pub enum CallFailure {
    #[error("call exceeded its {0:?} deadline")]
    TimedOut(Duration),

    #[error(transparent)]
    Remote(RemoteError),
}

impl CallFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CallFailure::TimedOut(_) | CallFailure::Remote(RemoteError::Timeout)
        )
    }
}

/// Await `call` for at most `limit`.
pub async fn with_deadline<F, T>(limit: Duration, call: F) -> Result<T, CallFailure>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CallFailure::Remote(err)),
        Err(_) => Err(CallFailure::TimedOut(limit)),
    }
}
