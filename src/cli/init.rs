//! Init command implementation

use std::io::IsTerminal;

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::cli::GlobalOptions;
use crate::config::Config;
use crate::error::Result;

/// Write a default config file, keeping an existing one unless confirmed
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;

    if path.exists() {
        let overwrite = std::io::stdin().is_terminal()
            && Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("{} already exists. Overwrite?", path.display()))
                .default(false)
                .interact()?;
        if !overwrite {
            println!("{} Kept existing configuration at {}", "○".dimmed(), path.display());
            return Ok(());
        }
    }

    let mut config = Config::default();
    if let Some(base_url) = opts.base_url_ref() {
        config.base_url = base_url.to_string();
    }
    config.validate()?;
    config.save_at(opts.config_ref())?;

    println!(
        "{} Configuration saved to: {}",
        "✓".green(),
        path.display().to_string().cyan()
    );
    println!("  Server: {}", config.base_url.bold());
    println!("\n{}", "Next steps:".bold());
    println!("  {} - Create an account", "dsnmail signup".cyan());
    println!("  {} - Sign in", "dsnmail login".cyan());

    Ok(())
}
