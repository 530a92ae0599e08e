//! Signup and verification commands

use std::io::IsTerminal;
use std::time::Duration;

use colored::Colorize;
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::cli::{CommandContext, GlobalOptions};
use crate::error::{Error, Result};
use crate::output::{self, Formattable};
use crate::signup::{
    FieldFeedback, FieldState, PasswordStrength, SignupForm, SubmitDecision,
    validate_verification_code,
};

/// Values supplied on the command line instead of prompts
#[derive(Debug, Clone, Default)]
pub struct SignupArgs {
    pub email: Option<String>,
    pub password: Option<String>,
    pub pop3_password: Option<String>,
    pub agree_terms: bool,
}

/// Server acknowledgement of a signup step
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupReport {
    pub email: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}

impl Formattable for SignupReport {
    fn pretty(&self) -> String {
        let mut out = format!("{} {}", "✓".green(), self.message);
        if let Some(next) = &self.next_step {
            out.push_str(&format!("\n  Next: {}", next.cyan()));
        }
        out
    }
}

fn feedback_line(feedback: &FieldFeedback) -> String {
    let mark = match feedback.state {
        FieldState::Valid => "✓".green(),
        FieldState::Invalid => "✗".red(),
        FieldState::Warning => "⚠".yellow(),
        FieldState::Info => "○".cyan(),
    };
    format!("  {} {}", mark, feedback.message)
}

/// `[██████░░░]`-style bar for the strength indicator
fn strength_bar(strength: PasswordStrength) -> String {
    const WIDTH: usize = 9;
    let filled = WIDTH * strength.percent() as usize / 100;
    let bar = format!(
        "[{}{}] {}",
        "█".repeat(filled),
        "░".repeat(WIDTH - filled),
        strength.label()
    );
    match strength {
        PasswordStrength::Weak => bar.red().to_string(),
        PasswordStrength::Medium => bar.yellow().to_string(),
        PasswordStrength::Strong => bar.green().to_string(),
    }
}

/// Prompt (or take the preset) until `apply` accepts the value.
///
/// Without a terminal a missing or rejected value is an error.
fn collect_field(
    flag: &str,
    preset: Option<String>,
    interactive: bool,
    prompt: impl Fn() -> Result<String>,
    mut apply: impl FnMut(&str) -> FieldFeedback,
) -> Result<()> {
    let mut preset = preset;
    loop {
        let value = match preset.take() {
            Some(value) => value,
            None if interactive => prompt()?,
            None => {
                return Err(Error::Other(format!(
                    "{} is required when not running in a terminal",
                    flag
                )));
            }
        };

        let feedback = apply(&value);
        eprintln!("{}", feedback_line(&feedback));
        if feedback.passes() {
            return Ok(());
        }
        if !interactive {
            return Err(Error::Other(feedback.message));
        }
    }
}

/// Run the interactive signup form
pub async fn signup(opts: &GlobalOptions, args: SignupArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let mut form = SignupForm::load(ctx.store.clone(), ctx.config.signup.clone());
    let interactive = std::io::stdin().is_terminal();
    let theme = ColorfulTheme::default();

    if interactive {
        eprintln!("{}\n", "Create your DSN webmail account".bold());
    }

    let draft = form.state().email;
    collect_field(
        "--email",
        args.email,
        interactive,
        || {
            let mut input = Input::<String>::with_theme(&theme).with_prompt("Email");
            if !draft.is_empty() {
                input = input.default(draft.clone());
            }
            Ok(input.interact_text()?)
        },
        |value| form.set_email(value),
    )?;

    collect_field(
        "--password",
        args.password,
        interactive,
        || {
            Ok(Password::with_theme(&theme)
                .with_prompt("Login password (8-64 chars, upper, lower, digit, @$!%*?&)")
                .interact()?)
        },
        |value| {
            let feedback = form.set_login_password(value);
            if let Some(strength) = form.state().strength {
                eprintln!("  Strength: {}", strength_bar(strength));
            }
            feedback
        },
    )?;

    collect_field(
        "--pop3-password",
        args.pop3_password,
        interactive,
        || {
            Ok(Password::with_theme(&theme)
                .with_prompt("POP3 mailbox password")
                .interact()?)
        },
        |value| form.set_pop3_password(value),
    )?;

    if let Some(advisory) = form.password_advisory() {
        eprintln!("{}", feedback_line(&advisory));
    }

    let agree = if args.agree_terms {
        true
    } else if interactive {
        Confirm::with_theme(&theme)
            .with_prompt("Do you agree to the terms of service?")
            .default(false)
            .interact()?
    } else {
        false
    };
    form.set_agree_terms(agree);

    let (email, pop3_password) = match form.submit() {
        SubmitDecision::Blocked { message } => {
            return Err(Error::Other(message));
        }
        SubmitDecision::Proceed {
            email,
            pop3_password,
        } => (email, pop3_password),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Sending verification code...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let webmail = ctx.webmail();
    let result = {
        let request = webmail.request_signup_code(&email, &pop3_password);
        tokio::pin!(request);
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        let mut warned = false;

        loop {
            tokio::select! {
                result = &mut request => break result,
                _ = ticker.tick() => {
                    // The watchdog only re-enables the form; the request keeps going
                    if !warned && !form.state().submitting {
                        warned = true;
                        spinner.set_message("Still waiting for the server...");
                    }
                }
            }
        }
    };
    spinner.finish_and_clear();

    match result {
        Ok(message) => {
            form.complete_success();
            let report = SignupReport {
                next_step: Some(format!(
                    "dsnmail verify --email {} --code <6-digit code>",
                    email
                )),
                email,
                message,
            };
            output::print(&report, ctx.format)
        }
        Err(e) => {
            form.complete_failure(&e.to_string());
            Err(e)
        }
    }
}

/// Confirm the account with the emailed code
pub async fn verify(opts: &GlobalOptions, email: &str, code: &str) -> Result<()> {
    let feedback = validate_verification_code(code);
    if !feedback.passes() {
        return Err(Error::Other(feedback.message));
    }

    let ctx = CommandContext::new(opts)?;
    let message = ctx
        .webmail()
        .verify_signup_code(email.trim(), code.trim())
        .await?;

    let report = SignupReport {
        email: email.trim().to_string(),
        message,
        next_step: Some("dsnmail login".to_string()),
    };
    output::print(&report, ctx.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_bar_fill() {
        colored::control::set_override(false);
        assert_eq!(strength_bar(PasswordStrength::Weak), "[██░░░░░░░] weak");
        assert_eq!(strength_bar(PasswordStrength::Medium), "[█████░░░░] medium");
        assert_eq!(strength_bar(PasswordStrength::Strong), "[█████████] strong");
    }

    #[test]
    fn test_collect_field_non_interactive_rejects() {
        let err = collect_field(
            "--email",
            Some("bad".to_string()),
            false,
            || unreachable!(),
            |_| FieldFeedback::invalid("nope"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_collect_field_non_interactive_requires_value() {
        let err = collect_field(
            "--email",
            None,
            false,
            || unreachable!(),
            |_| FieldFeedback::valid("ok"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("--email"));
    }
}
