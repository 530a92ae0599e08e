//! Wire models for the webmail auth and signup endpoints

use serde::{Deserialize, Serialize};

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,

    /// Token type, normally "Bearer"
    #[serde(default)]
    pub token_type: Option<String>,

    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub email: Option<String>,
}

/// Refresh request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Refresh response; only `accessToken` is required
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Start of the signup flow: sends a verification code to `email`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupCodeRequest {
    pub email: String,
    pub pop3_password: String,
}

/// Completes signup with the emailed 6-digit code
#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// Generic message body
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Standard error body returned by the server
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Business error code, e.g. "AUTH-001"
    #[serde(default)]
    pub code: Option<String>,

    pub message: String,

    #[serde(default)]
    pub detail: Option<String>,
}
