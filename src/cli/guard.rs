//! Guard and refresh commands

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cli::context::print_redirect_hint;
use crate::cli::{CommandContext, GlobalOptions};
use crate::error::Result;
use crate::output::{self, Formattable, formatters};
use crate::session::{GuardOutcome, RefreshOutcome};

/// Terminal state of a guarded page load
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardReport {
    pub path: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GuardReport {
    fn new(path: &str, outcome: GuardOutcome) -> Self {
        let mut report = Self {
            path: path.to_string(),
            outcome: "",
            expires_at: None,
            location: None,
            reason: None,
        };
        match outcome {
            GuardOutcome::Unprotected => report.outcome = "unprotected",
            GuardOutcome::Valid { expires_at } => {
                report.outcome = "valid";
                report.expires_at = Some(expires_at);
            }
            GuardOutcome::Refreshed => report.outcome = "refreshed",
            GuardOutcome::Redirecting { location, reason } => {
                report.outcome = "redirecting";
                report.location = Some(location);
                report.reason = Some(reason.to_string());
            }
        }
        report
    }
}

impl Formattable for GuardReport {
    fn pretty(&self) -> String {
        let path = self.path.bold();
        match self.outcome {
            "unprotected" => format!("{} {} is public, no session needed", "○".dimmed(), path),
            "valid" => {
                let remaining = self
                    .expires_at
                    .map(|at| formatters::format_remaining(at - Utc::now()))
                    .unwrap_or_default();
                format!(
                    "{} {} loaded, token valid (expires in {})",
                    "✓".green(),
                    path,
                    remaining
                )
            }
            "refreshed" => format!("{} {} loaded after refreshing the token", "✓".green(), path),
            _ => format!(
                "{} {} requires sign-in: {}",
                "✗".red(),
                path,
                self.reason.as_deref().unwrap_or("session unavailable")
            ),
        }
    }
}

/// Result of an explicit refresh
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Formattable for RefreshReport {
    fn pretty(&self) -> String {
        if self.refreshed {
            format!("{} Access token refreshed", "✓".green())
        } else {
            format!(
                "{} Refresh failed: {}",
                "✗".red(),
                self.reason.as_deref().unwrap_or("session unavailable")
            )
        }
    }
}

/// Run the guard for a page load
pub async fn guard(opts: &GlobalOptions, path: Option<String>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let path = path.unwrap_or_else(|| ctx.default_page().to_string());
    let (session, navigator) = ctx.session(&path);

    let outcome = session.on_load(&path).await?;
    output::print(&GuardReport::new(&path, outcome), ctx.format)?;
    print_redirect_hint(&navigator);
    Ok(())
}

/// Refresh the access token immediately
pub async fn refresh(opts: &GlobalOptions, path: Option<String>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let path = path.unwrap_or_else(|| ctx.default_page().to_string());
    let (session, navigator) = ctx.session(&path);

    let report = match session.refresh().await? {
        RefreshOutcome::Refreshed => RefreshReport {
            refreshed: true,
            location: None,
            reason: None,
        },
        RefreshOutcome::LoginRequired { location, reason } => RefreshReport {
            refreshed: false,
            location: Some(location),
            reason: Some(reason.to_string()),
        },
    };

    output::print(&report, ctx.format)?;
    print_redirect_hint(&navigator);
    Ok(())
}
