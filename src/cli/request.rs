//! Authorized request command

use colored::Colorize;
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;

use crate::cli::context::print_redirect_hint;
use crate::cli::{CommandContext, GlobalOptions};
use crate::client::HttpRequest;
use crate::client::api::check_response;
use crate::error::{Error, Result};
use crate::output::{self, Formattable};

/// Arguments of the `request` command
#[derive(Debug, Clone)]
pub struct RequestArgs {
    pub path: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub data: Option<String>,
    pub from: Option<String>,
}

/// Final response of an authorized request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReport {
    pub status: u16,
    /// Parsed JSON when the body is JSON, the raw text otherwise
    pub body: serde_json::Value,
}

impl Formattable for ResponseReport {
    fn pretty(&self) -> String {
        let status = format!("HTTP {}", self.status);
        let status = if (200..300).contains(&self.status) {
            status.green()
        } else {
            status.red()
        };
        let body = match &self.body {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        if body.is_empty() {
            status.to_string()
        } else {
            format!("{}\n{}", status, body)
        }
    }
}

/// Build the outgoing request from command-line arguments
pub fn build_request(args: &RequestArgs) -> Result<HttpRequest> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .map_err(|_| Error::Other(format!("Invalid HTTP method: {}", args.method)))?;

    let mut request = HttpRequest::new(method, args.path.clone());
    for (name, value) in &args.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::Other(format!("Invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::Other(format!("Invalid value for header {}", name)))?;
        request.headers.append(name, value);
    }
    if let Some(data) = &args.data {
        request = request.body(data.clone());
    }
    Ok(request)
}

/// Send one request through the session guard
pub async fn run(opts: &GlobalOptions, args: RequestArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let page = args
        .from
        .clone()
        .unwrap_or_else(|| ctx.default_page().to_string());
    let (session, navigator) = ctx.session(&page);

    let request = build_request(&args)?;
    let response = match session.authorized_request(request).await {
        Ok(response) => response,
        Err(e) => {
            print_redirect_hint(&navigator);
            return Err(e);
        }
    };

    let body = if response.body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&response.body)
            .unwrap_or_else(|_| serde_json::Value::String(response.body.clone()))
    };
    let report = ResponseReport {
        status: response.status.as_u16(),
        body,
    };
    output::print(&report, ctx.format)?;
    print_redirect_hint(&navigator);

    // Non-2xx (including a 401 that survived the retry) exits non-zero
    check_response(response)?;
    Ok(())
}
