//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use url::Url;

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{ApiError, ConfigError, Result};

/// Request timeout for every call
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Transport talking to a real webmail server
pub struct ReqwestTransport {
    http: HttpClient,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport for the given base URL
    pub fn new(base_url: &str) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("Invalid base URL {}: {}", base_url, e)))?;

        Ok(Self { http, base_url })
    }

    /// Resolve a request target against the base URL
    fn resolve(&self, target: &str) -> std::result::Result<Url, ApiError> {
        self.base_url
            .join(target)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request URL {}: {}", target, e)))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, ApiError> {
        let url = self.resolve(&request.url)?;
        log::debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(ApiError::from)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;

        log::debug!("-> {}", status);
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
