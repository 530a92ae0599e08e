//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod auth;
pub mod context;
pub mod guard;
pub mod init;
pub mod request;
pub mod signup;
pub mod status;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// dsnmail - command-line client for the DSN webmail service
#[derive(Parser, Debug)]
#[command(name = "dsnmail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, json)
    #[arg(
        long,
        global = true,
        env = "DSNMAIL_FORMAT",
        default_value = "pretty",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "DSNMAIL_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Webmail server base URL
    #[arg(long, global = true, env = "DSNMAIL_BASE_URL", hide_env = true)]
    pub base_url: Option<String>,

    /// Keep the session in memory only (nothing is written to disk)
    #[arg(long, global = true, env = "DSNMAIL_EPHEMERAL", hide_env = true)]
    pub ephemeral: bool,

    /// Enable debug logging
    #[arg(long, global = true, env = "DSNMAIL_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init,

    /// Sign in and store the session tokens
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long, env = "DSNMAIL_PASSWORD", hide_env = true, hide = true)]
        password: Option<String>,
    },

    /// Sign out and clear local session storage
    Logout,

    /// Show configuration and session status
    Status,

    /// Load a page through the session guard
    Guard {
        /// Page path (defaults to the protected prefix)
        path: Option<String>,
    },

    /// Refresh the access token now
    Refresh {
        /// Page to return to if the session has to be abandoned
        #[arg(long)]
        path: Option<String>,
    },

    /// Send an authorized request to the webmail API
    Request {
        /// Request path, resolved against the base URL
        path: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = args::parse_header)]
        headers: Vec<(String, String)>,

        /// Request body
        #[arg(short = 'd', long = "data")]
        data: Option<String>,

        /// Page the request is issued from
        #[arg(long)]
        from: Option<String>,
    },

    /// Create a webmail account
    Signup {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,

        /// Login password (prompted when omitted)
        #[arg(long, env = "DSNMAIL_SIGNUP_PASSWORD", hide_env = true, hide = true)]
        password: Option<String>,

        /// POP3 mailbox password (prompted when omitted)
        #[arg(long, env = "DSNMAIL_POP3_PASSWORD", hide_env = true, hide = true)]
        pop3_password: Option<String>,

        /// Accept the terms of service without prompting
        #[arg(long)]
        agree_terms: bool,
    },

    /// Confirm signup with the emailed verification code
    Verify {
        /// Account email
        #[arg(long)]
        email: String,

        /// 6-digit verification code
        #[arg(long)]
        code: String,
    },

    /// Display version information
    Version,
}
