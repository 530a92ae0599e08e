//! Status command implementation

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cli::{CommandContext, GlobalOptions};
use crate::client::token::TokenStatus;
use crate::config::Config;
use crate::error::Result;
use crate::output::{self, Formattable, formatters};
use crate::storage::SIGNUP_EMAIL_KEY;

/// Stored access token, as seen without contacting the server
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "state")]
pub enum AccessTokenState {
    Missing,
    Malformed { detail: String },
    Valid { expires_at: DateTime<Utc> },
    NearExpiry { expires_at: DateTime<Utc> },
    Expired { expires_at: DateTime<Utc> },
}

/// Configuration and session overview
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub config_path: String,
    pub config_found: bool,
    pub base_url: String,
    pub access_token: AccessTokenState,
    pub refresh_token: bool,
    pub signup_draft: Option<String>,
}

impl Formattable for StatusReport {
    fn pretty(&self) -> String {
        let mut lines = vec![format!("{}\n", "dsnmail Status".bold())];

        let found = if self.config_found {
            String::new()
        } else {
            format!(" {}", "(not found, using defaults)".dimmed())
        };
        lines.push(format!("Config file: {}{}", self.config_path.cyan(), found));
        lines.push(format!("Server: {}", self.base_url.cyan()));
        lines.push(String::new());

        let now = Utc::now();
        lines.push(match &self.access_token {
            AccessTokenState::Missing => {
                format!("{} Not signed in\n  → Run 'dsnmail login' to sign in", "✗".red())
            }
            AccessTokenState::Malformed { detail } => {
                format!("{} Access token is malformed ({})", "✗".red(), detail)
            }
            AccessTokenState::Valid { expires_at } => format!(
                "{} Access token valid (expires in {})",
                "✓".green(),
                formatters::format_remaining(*expires_at - now)
            ),
            AccessTokenState::NearExpiry { expires_at } => format!(
                "{} Access token expires soon ({}), will refresh on next load",
                "⚠".yellow(),
                formatters::format_remaining(*expires_at - now)
            ),
            AccessTokenState::Expired { expires_at } => format!(
                "{} Access token {}, will refresh on next load",
                "⚠".yellow(),
                formatters::format_remaining(*expires_at - now)
            ),
        });

        if self.refresh_token {
            lines.push(format!("{} Refresh token stored", "✓".green()));
        } else {
            lines.push(format!("{} No refresh token stored", "○".dimmed()));
        }

        if let Some(draft) = &self.signup_draft {
            lines.push(format!("{} Signup draft: {}", "○".dimmed(), draft));
        }

        lines.join("\n")
    }
}

/// Run the status command
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let config_path = Config::resolve_path(opts.config_ref())?;
    let ctx = CommandContext::new(opts)?;
    let (session, _) = ctx.session(ctx.default_page());
    let snapshot = session.snapshot()?;

    let access_token = match snapshot.access {
        None => AccessTokenState::Missing,
        Some(Err(e)) => AccessTokenState::Malformed {
            detail: e.to_string(),
        },
        Some(Ok((expires_at, TokenStatus::Valid))) => AccessTokenState::Valid { expires_at },
        Some(Ok((expires_at, TokenStatus::NearExpiry))) => {
            AccessTokenState::NearExpiry { expires_at }
        }
        Some(Ok((expires_at, TokenStatus::Expired))) => AccessTokenState::Expired { expires_at },
    };

    let report = StatusReport {
        config_found: config_path.exists(),
        config_path: config_path.display().to_string(),
        base_url: ctx.config.base_url.clone(),
        access_token,
        refresh_token: snapshot.has_refresh_token,
        signup_draft: ctx.store.get(SIGNUP_EMAIL_KEY)?,
    };

    output::print(&report, ctx.format)
}
