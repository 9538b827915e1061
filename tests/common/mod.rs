//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use user_service::config::{ResilienceConfig, ResiliencePolicy};
use user_service::remote::{RemoteCall, RemoteError};
use user_service::resilience::{CallRequest, FailureReason, ResilientClient};

/// What the scripted remote does on one invocation.
#[derive(Debug, Clone)]
pub enum Step {
    Ok(String),
    Fail,
    /// Sleep, then succeed.
    Slow(Duration),
}

/// Remote call that replays a script and counts invocations.
pub struct ScriptedRemote {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Step>>,
    otherwise: Step,
}

impl ScriptedRemote {
    /// Once the script runs out every call does `otherwise`.
    pub fn new(script: impl IntoIterator<Item = Step>, otherwise: Step) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into_iter().collect()),
            otherwise,
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new([], step)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCall for ScriptedRemote {
    type Payload = String;

    async fn invoke(&self, _resource: &str, key: &str, _timeout: Duration) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.otherwise.clone());

        match step {
            Step::Ok(body) => Ok(body),
            Step::Fail => Err(RemoteError::Status(500)),
            Step::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(format!("slow:{key}"))
            }
        }
    }
}

pub type TextFallback = fn(&CallRequest, FailureReason) -> String;

pub fn text_fallback(request: &CallRequest, reason: FailureReason) -> String {
    format!("fallback:{}:{}", reason, request.key)
}

pub fn policy(capacity: u32, failure_threshold: u32) -> ResiliencePolicy {
    ResiliencePolicy {
        capacity,
        refill_window_ms: 1000,
        failure_threshold,
        open_timeout_secs: 30,
        call_timeout_ms: 200,
    }
}

pub fn client(
    remote: Arc<ScriptedRemote>,
    defaults: ResiliencePolicy,
) -> ResilientClient<Arc<ScriptedRemote>, TextFallback> {
    let policies = ResilienceConfig {
        defaults,
        resources: Vec::new(),
    };
    ResilientClient::new(remote, text_fallback as TextFallback, policies)
}

/// Start a mock HTTP backend on an ephemeral port. Each request is answered
/// with the status and body `f` produces.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    400 => "400 Bad Request",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that always returns the same status and body.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
