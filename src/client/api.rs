//! Unauthenticated webmail endpoints: login, logout and signup

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

use super::models::{
    ErrorResponse, LoginRequest, LoginResponse, MessageResponse, SignupCodeRequest,
    VerifyCodeRequest,
};
use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{ApiError, Result};

const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const SIGNUP_CODE_PATH: &str = "/api/signup/request-code";
const SIGNUP_VERIFY_PATH: &str = "/api/signup/verify";

/// Client for the endpoints that do not need a bearer token
#[derive(Clone)]
pub struct WebmailClient {
    transport: Arc<dyn HttpTransport>,
}

impl WebmailClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Exchange credentials for an access/refresh token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.post_json(LOGIN_PATH, &body).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized.into());
        }
        let response = check_response(response)?;
        Ok(response.json()?)
    }

    /// Notify the server of a logout; tokens are stateless so this is advisory
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .transport
            .send(HttpRequest::post(LOGOUT_PATH))
            .await?;
        check_response(response)?;
        Ok(())
    }

    /// Ask the server to email a verification code
    pub async fn request_signup_code(&self, email: &str, pop3_password: &str) -> Result<String> {
        let body = SignupCodeRequest {
            email: email.to_string(),
            pop3_password: pop3_password.to_string(),
        };
        let response = check_response(self.post_json(SIGNUP_CODE_PATH, &body).await?)?;
        Ok(message_or_default(&response, "Verification code sent."))
    }

    /// Complete signup with the emailed code
    pub async fn verify_signup_code(&self, email: &str, code: &str) -> Result<String> {
        let body = VerifyCodeRequest {
            email: email.to_string(),
            code: code.to_string(),
        };
        let response = check_response(self.post_json(SIGNUP_VERIFY_PATH, &body).await?)?;
        Ok(message_or_default(&response, "Signup complete."))
    }

    async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<HttpResponse> {
        let mut request = HttpRequest::post(path).json(body)?;
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self.transport.send(request).await?)
    }
}

fn message_or_default(response: &HttpResponse, default: &str) -> String {
    response
        .json::<MessageResponse>()
        .map(|m| m.message)
        .unwrap_or_else(|_| default.to_string())
}

/// Server-provided error message, falling back to the raw body
fn error_message(response: &HttpResponse, fallback: &str) -> String {
    match response.json::<ErrorResponse>() {
        Ok(err) => err.message,
        Err(_) if !response.body.trim().is_empty() => response.body.clone(),
        Err(_) => fallback.to_string(),
    }
}

/// Map non-success statuses onto `ApiError`
pub fn check_response(response: HttpResponse) -> std::result::Result<HttpResponse, ApiError> {
    let status = response.status;
    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(error_message(
            &response,
            "Resource not found",
        ))),
        StatusCode::CONFLICT => Err(ApiError::Conflict(error_message(
            &response,
            "Resource already exists",
        ))),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Err(ApiError::BadRequest(
            error_message(&response, "Bad request"),
        )),
        s if s.is_server_error() => Err(ApiError::ServerError(error_message(
            &response,
            &format!("Server error: {}", s),
        ))),
        _ => Err(ApiError::InvalidResponse(format!(
            "Unexpected status code: {}",
            status
        ))),
    }
}
