//! Remote call capability.
//!
//! The resilient client treats the downstream call as opaque: given a
//! resource (service) name, a lookup key and a deadline it either yields a
//! payload or an error. `http.rs` implements it over HTTP with service
//! discovery; tests and the in-process department store provide their own.

use std::time::Duration;

use async_trait::async_trait;

pub mod http;

pub use http::HttpRemoteCall;

/// Why a remote call produced no payload.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("no available instance of `{0}`")]
    NoInstance(String),

    #[error("downstream returned status {0}")]
    Status(u16),

    #[error("downstream did not answer in time")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("could not decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// A single outbound call to a downstream resource.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    type Payload: Send;

    async fn invoke(
        &self,
        resource: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<Self::Payload, RemoteError>;
}

#[async_trait]
impl<R: RemoteCall + ?Sized> RemoteCall for std::sync::Arc<R> {
    type Payload = R::Payload;

    async fn invoke(
        &self,
        resource: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<Self::Payload, RemoteError> {
        (**self).invoke(resource, key, timeout).await
    }
}
