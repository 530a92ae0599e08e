//! Login and logout commands

use chrono::{DateTime, Utc};
use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use serde::Serialize;

use crate::cli::{CommandContext, GlobalOptions};
use crate::client::token::decode_expiry;
use crate::error::{Error, Result};
use crate::output::{self, Formattable, formatters};
use crate::signup::validate::validate_email;

/// Result of a successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReport {
    pub email: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Formattable for LoginReport {
    fn pretty(&self) -> String {
        let mut out = format!("{} Signed in as {}", "✓".green(), self.email.bold());
        if let Some(expires_at) = self.expires_at {
            out.push_str(&format!(
                "\n  Access token expires {}",
                formatters::format_timestamp_local(expires_at).cyan()
            ));
        }
        out
    }
}

/// Result of a logout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutReport {
    /// Whether the server acknowledged the logout
    pub server_notified: bool,
}

impl Formattable for LogoutReport {
    fn pretty(&self) -> String {
        if self.server_notified {
            format!("{} Signed out", "✓".green())
        } else {
            format!(
                "{} Signed out locally (server could not be notified)",
                "⚠".yellow()
            )
        }
    }
}

/// Run the login command
pub async fn login(
    opts: &GlobalOptions,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    let email = match email {
        Some(email) => email,
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Email")
            .interact_text()?,
    };
    let feedback = validate_email(&email, &ctx.config.signup.allowed_domains[..]);
    if !feedback.passes() {
        return Err(Error::Other(feedback.message));
    }

    let password = match password {
        Some(password) => password,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()?,
    };

    let tokens = ctx.webmail().login(email.trim(), &password).await?;

    let (session, _) = ctx.session(ctx.default_page());
    session.establish(&tokens)?;
    log::info!("Session established for {}", email.trim());

    let report = LoginReport {
        email: tokens.email.clone().unwrap_or_else(|| email.trim().to_string()),
        expires_at: decode_expiry(&tokens.access_token).ok(),
    };
    output::print(&report, ctx.format)
}

/// Run the logout command.
///
/// Local storage is cleared even if the server call fails.
pub async fn logout(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    let server_notified = match ctx.webmail().logout().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Logout request failed: {}", e);
            false
        }
    };

    let (session, _) = ctx.session(ctx.default_page());
    session.clear()?;

    output::print(&LogoutReport { server_notified }, ctx.format)
}
