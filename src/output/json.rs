//! JSON envelope for `--format json`
//!
//! Every report is printed as
//! `{ "data": ..., "meta": { "client": "dsnmail", "version", "generatedAt" } }`
//! so scripts can tell which build produced it and when.

use chrono::Utc;
use serde::Serialize;

/// Name reported in the envelope metadata
pub const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");

/// A dsnmail report together with envelope metadata
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: ?Sized> {
    pub data: &'a T,
    pub meta: EnvelopeMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    pub client: &'static str,
    pub version: &'static str,
    /// RFC 3339, UTC
    pub generated_at: String,
}

impl<'a, T: ?Sized> Envelope<'a, T> {
    pub fn wrap(data: &'a T) -> Self {
        Self {
            data,
            meta: EnvelopeMeta {
                client: CLIENT_NAME,
                version: env!("CARGO_PKG_VERSION"),
                generated_at: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Render a report inside the envelope as pretty-printed JSON
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Envelope::wrap(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Clone)]
    struct TestItem {
        email: String,
        status: String,
    }

    #[test]
    fn test_envelope_wrap() {
        let envelope = Envelope::wrap("redirecting");

        assert_eq!(envelope.data, "redirecting");
        assert_eq!(envelope.meta.client, "dsnmail");
        assert_eq!(envelope.meta.version, env!("CARGO_PKG_VERSION"));
        assert!(!envelope.meta.generated_at.is_empty());
    }

    #[test]
    fn test_format_json_basic() {
        let item = TestItem {
            email: "u@dsntech.com".to_string(),
            status: "valid".to_string(),
        };

        let result = format_json(&item).unwrap();

        assert!(result.contains("\"data\""));
        assert!(result.contains("\"client\": \"dsnmail\""));
        assert!(result.contains("\"email\": \"u@dsntech.com\""));
        assert!(result.contains("\"status\": \"valid\""));
        assert!(result.contains("\"generatedAt\""));
        assert!(result.contains("\"version\""));
    }

    #[test]
    fn test_format_json_null_field() {
        let result = format_json(&serde_json::json!({ "expiresAt": null })).unwrap();

        assert!(result.contains("\"expiresAt\": null"));
    }
}
