//! HR portal command-line host for the authentication session.

mod auth;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use portal_config_and_utils::{init_logging, Config, Paths};

/// HR portal command-line interface.
#[derive(Parser)]
#[command(name = "hr-portal")]
#[command(about = "Sign in to the HR portal and inspect the current session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Overrides the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, storage and logs. Defaults to ~/.hr-portal
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Username or email
        #[arg(short, long)]
        username: String,
        /// Password (prompted for when omitted)
        #[arg(short, long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Keep the session after this process exits
        #[arg(short, long)]
        remember: bool,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the stored session
    Status,
    /// Mark the mandatory first-login setup as done
    CompleteSetup,
    /// Interactive session; a session without --remember lives as long as the shell
    Shell,
}

/// The `--log-level` flag wins over `log_level` from config and `PORTAL_LOG_LEVEL`.
fn log_level<'a>(flag: Option<&'a str>, config: &'a Config) -> &'a str {
    flag.unwrap_or(&config.log_level)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    init_logging(&paths, log_level(cli.log_level.as_deref(), &config));

    let manager = auth::build_manager(&config, &paths)?;

    match cli.command {
        Some(Commands::Login {
            username,
            password,
            remember,
        }) => {
            let password = match password {
                Some(password) => password,
                None => auth::prompt("Password: ")?,
            };
            auth::login::run(&manager, &username, &password, remember).await?;
        }
        Some(Commands::Logout) => auth::logout::run(&manager),
        Some(Commands::Status) | None => auth::status::run(&manager)?,
        Some(Commands::CompleteSetup) => auth::setup::run(&manager)?,
        Some(Commands::Shell) => shell::run(&manager).await?,
    }

    Ok(())
}
