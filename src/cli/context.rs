//! Command execution context
//!
//! Loads configuration once and builds the store, transport and clients that
//! command handlers share.

use std::sync::Arc;

use colored::Colorize;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::{HttpTransport, ReqwestTransport, WebmailClient};
use crate::config::Config;
use crate::error::Result;
use crate::session::{ConsoleNavigator, SessionClient};
use crate::storage::{MemoryStore, SessionStore, SqliteStore};

/// Context for command execution
pub struct CommandContext {
    /// Loaded configuration with CLI overrides applied
    pub config: Config,
    /// Local session storage
    pub store: Arc<dyn SessionStore>,
    /// HTTP transport bound to the configured base URL
    pub transport: Arc<dyn HttpTransport>,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load config, apply overrides and open storage.
    ///
    /// # Errors
    /// Returns error if the config is invalid or storage cannot be opened.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_or_default(opts.config_ref())?;

        if let Some(base_url) = opts.base_url_ref() {
            config.base_url = base_url.to_string();
            config.validate()?;
        }

        let store: Arc<dyn SessionStore> = if opts.ephemeral {
            log::debug!("Using in-memory session storage");
            Arc::new(MemoryStore::new())
        } else {
            match &config.storage_path {
                Some(path) => Arc::new(SqliteStore::open_file(path)?),
                None => Arc::new(SqliteStore::open()?),
            }
        };

        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.base_url)?);

        Ok(Self {
            config,
            store,
            transport,
            format: opts.format,
        })
    }

    /// Session guard for a command acting on `page`
    pub fn session(&self, page: &str) -> (SessionClient, Arc<ConsoleNavigator>) {
        let navigator = Arc::new(ConsoleNavigator::new(page));
        let client = SessionClient::new(
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            navigator.clone(),
            self.config.session.clone(),
        );
        (client, navigator)
    }

    /// Client for login, logout and signup endpoints
    pub fn webmail(&self) -> WebmailClient {
        WebmailClient::new(Arc::clone(&self.transport))
    }

    /// Protected page used when a command is given no path
    pub fn default_page(&self) -> &str {
        &self.config.session.protected_prefix
    }
}

/// Tell the user where the guard sent them
pub fn print_redirect_hint(navigator: &ConsoleNavigator) {
    if let Some(location) = navigator.redirected_to() {
        eprintln!("{} Session ended, redirected to {}", "→".yellow(), location.cyan());
        eprintln!("  Run {} to sign in again.", "dsnmail login".cyan());
    }
}
