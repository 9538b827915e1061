//! Remote call over HTTP.
//!
//! # Responsibilities
//! - Resolve the resource name to an instance through the registry
//! - Issue `GET http://{instance}{path}` with the key substituted into the path
//! - Decode a 2xx JSON body into the payload type
//! - Feed the outcome back into the instance's passive health
//!
//! # Design Decisions
//! - 5xx and transport errors count against instance health; 4xx do not
//! - The per-request reqwest timeout matches the caller's deadline

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::discovery::ServiceRegistry;
use crate::remote::{RemoteCall, RemoteError};

/// Remote call that fetches JSON payloads of type `T` from a service.
pub struct HttpRemoteCall<T> {
    client: reqwest::Client,
    registry: Arc<ServiceRegistry>,
    path: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T> HttpRemoteCall<T> {
    /// `path` must contain a `{key}` placeholder.
    pub fn new(registry: Arc<ServiceRegistry>, path: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), registry, path)
    }

    pub fn with_client(
        client: reqwest::Client,
        registry: Arc<ServiceRegistry>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry,
            path: path.into(),
            _payload: PhantomData,
        }
    }

    fn path_for(&self, key: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.path.replace("{key}", &encoded)
    }
}

#[async_trait]
impl<T> RemoteCall for HttpRemoteCall<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Payload = T;

    async fn invoke(&self, resource: &str, key: &str, timeout: Duration) -> Result<T, RemoteError> {
        let instance = self
            .registry
            .resolve(resource)
            .ok_or_else(|| RemoteError::NoInstance(resource.to_string()))?;

        let url = format!("http://{}{}", instance.addr, self.path_for(key));
        tracing::debug!(resource = %resource, url = %url, "Sending remote request");

        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                instance.mark_failure();
                return Err(if err.is_timeout() {
                    RemoteError::Timeout
                } else {
                    RemoteError::Transport(err)
                });
            }
        };

        let status = response.status();
        if status.is_server_error() {
            instance.mark_failure();
        } else {
            instance.mark_success();
        }
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        response.json::<T>().await.map_err(|err| {
            if err.is_timeout() {
                RemoteError::Timeout
            } else {
                RemoteError::Decode(err)
            }
        })
    }
}
