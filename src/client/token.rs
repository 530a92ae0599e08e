//! Access token inspection
//!
//! Tokens are never verified here; the client only reads the `exp` claim to
//! decide when to refresh.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::error::ApiError;

/// Decode base64 payload segments.
///
/// Accepts the standard and URL-safe alphabets, with or without padding.
fn base64_decode_segment(input: &str) -> std::result::Result<Vec<u8>, String> {
    use base64::{Engine as _, engine::general_purpose};

    // Base64url uses - instead of + and _ instead of /
    let standard_b64 = input
        .trim_end_matches('=')
        .replace('-', "+")
        .replace('_', "/");

    // Add padding if needed
    let padding = match standard_b64.len() % 4 {
        0 => "",
        2 => "==",
        3 => "=",
        _ => return Err("Invalid base64 length".to_string()),
    };

    let padded = format!("{}{}", standard_b64, padding);

    general_purpose::STANDARD
        .decode(&padded)
        .map_err(|e| e.to_string())
}

/// Claims the client cares about
#[derive(Debug, Deserialize)]
struct AccessClaims {
    /// Expiry, Unix seconds (may be fractional)
    exp: f64,
}

/// Extract the expiry time from a `header.payload.signature` token
pub fn decode_expiry(token: &str) -> std::result::Result<DateTime<Utc>, ApiError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ApiError::MalformedToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let payload_bytes = base64_decode_segment(parts[1])
        .map_err(|e| ApiError::MalformedToken(format!("payload is not base64: {}", e)))?;

    let claims: AccessClaims = serde_json::from_slice(&payload_bytes)
        .map_err(|e| ApiError::MalformedToken(format!("payload is not valid claims: {}", e)))?;

    if !claims.exp.is_finite() {
        return Err(ApiError::MalformedToken("exp is not a number".to_string()));
    }

    // Expiries beyond chrono's range clamp to its bounds
    let expires_at = DateTime::from_timestamp_millis((claims.exp * 1000.0) as i64);
    Ok(expires_at.unwrap_or(if claims.exp > 0.0 {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    }))
}

/// Freshness of an access token relative to the refresh threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Expires later than the threshold
    Valid,
    /// Still valid but inside the near-expiry window
    NearExpiry,
    /// `now >= exp`
    Expired,
}

impl TokenStatus {
    /// Classify an expiry against `now`
    pub fn classify(expires_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> Self {
        let remaining = expires_at - now;
        if remaining <= Duration::zero() {
            TokenStatus::Expired
        } else if remaining < threshold {
            TokenStatus::NearExpiry
        } else {
            TokenStatus::Valid
        }
    }

    /// Whether the guard should refresh before continuing
    pub fn needs_refresh(self) -> bool {
        !matches!(self, TokenStatus::Valid)
    }
}
