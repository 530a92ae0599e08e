//! Mock transport for testing
//!
//! Responses are scripted per `METHOD path` and consumed in order; the last
//! scripted response for a route repeats once the queue is down to one.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::ApiError;

/// A scripted reply
#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Failure(ApiError),
}

/// Mock transport recording every request it sees.
///
/// # Example
/// ```ignore
/// let mock = MockTransport::new()
///     .with_json("POST", "/api/auth/refresh", 200, r#"{"accessToken":"t"}"#)
///     .await;
/// ```
#[derive(Default, Clone)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    captured: Arc<Mutex<Vec<HttpRequest>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method.to_uppercase(), path)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON (or empty) body
    pub async fn with_json(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.push(method, path, Reply::Response(HttpResponse::new(status, body)))
            .await;
        self
    }

    /// Queue a bare status response
    pub async fn with_status(self, method: &str, path: &str, status: u16) -> Self {
        self.with_json(method, path, status, "").await
    }

    /// Queue a transport failure
    pub async fn with_failure(self, method: &str, path: &str, error: ApiError) -> Self {
        self.push(method, path, Reply::Failure(error)).await;
        self
    }

    /// Delay every reply, to hold requests in flight
    pub async fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().await = Some(delay);
        self
    }

    async fn push(&self, method: &str, path: &str, reply: Reply) {
        self.routes
            .lock()
            .await
            .entry(route_key(method, path))
            .or_default()
            .push_back(reply);
    }

    /// All requests seen so far
    pub async fn requests(&self) -> Vec<HttpRequest> {
        self.captured.lock().await.clone()
    }

    /// Number of requests seen for a route
    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.captured
            .lock()
            .await
            .iter()
            .filter(|r| r.method.as_str() == method.to_uppercase() && r.url == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, ApiError> {
        let key = route_key(request.method.as_str(), &request.url);
        self.captured.lock().await.push(request);

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = {
            let mut routes = self.routes.lock().await;
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(error)) => Err(error),
            None => Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")),
        }
    }
}
