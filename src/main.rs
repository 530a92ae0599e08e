//! dsnmail - command-line client for the DSN webmail service

use clap::Parser;

mod cli;
mod client;
mod config;
mod error;
mod output;
mod session;
mod signup;
mod storage;

use cli::request::RequestArgs;
use cli::signup::SignupArgs;
use cli::{Cli, Commands, GlobalOptions};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    log::debug!("Debug mode enabled");

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init => cli::init::run(&opts),
        Commands::Login { email, password } => cli::auth::login(&opts, email, password).await,
        Commands::Logout => cli::auth::logout(&opts).await,
        Commands::Status => cli::status::run(&opts),
        Commands::Guard { path } => cli::guard::guard(&opts, path).await,
        Commands::Refresh { path } => cli::guard::refresh(&opts, path).await,
        Commands::Request {
            path,
            method,
            headers,
            data,
            from,
        } => {
            let args = RequestArgs {
                path,
                method,
                headers,
                data,
                from,
            };
            cli::request::run(&opts, args).await
        }
        Commands::Signup {
            email,
            password,
            pop3_password,
            agree_terms,
        } => {
            let args = SignupArgs {
                email,
                password,
                pop3_password,
                agree_terms,
            };
            cli::signup::signup(&opts, args).await
        }
        Commands::Verify { email, code } => cli::signup::verify(&opts, &email, &code).await,
        Commands::Version => {
            println!("dsnmail version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
