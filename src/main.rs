//! channel-relay CLI entry point.
//!
//! Provides `start` (the default) to run the relay and `check` to validate
//! configuration without connecting.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use channel_relay::config::Config;
use channel_relay::supervisor::SupervisorExit;
use channel_relay::{discord, logging};

/// channel-relay — mirrors one Discord channel into another.
#[derive(Parser)]
#[command(name = "channel-relay", version, about)]
struct Cli {
    /// Config file path (defaults to `$RELAY_CONFIG_PATH` or `./relay.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Connect and relay messages until interrupted.
    Start,
    /// Validate configuration and exit without connecting.
    Check,
}

// Single-threaded: gateway handler tasks must reach the relay queue in
// the order the events arrived.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; everything can come from the real environment.
    let _ = dotenvy::dotenv();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => handle_start(config).await,
        Command::Check => handle_check(&config),
    }
}

/// Run the relay under the supervisor.
async fn handle_start(config: Config) -> anyhow::Result<()> {
    let logs_dir = config.logging.resolve_logs_dir()?;
    let _logging_guard = logging::init_production(&logs_dir, &config.logging.level)?;

    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "fatal configuration error, not connecting");
            return Err(e.into());
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match discord::run(settings, shutdown).await {
        SupervisorExit::Interrupted => {
            info!("relay shut down cleanly");
            Ok(())
        }
        SupervisorExit::AttemptsExhausted { attempts } => Err(anyhow::anyhow!(
            "gave up after {attempts} connection attempts"
        )),
    }
}

/// Validate configuration and print a redacted summary.
fn handle_check(config: &Config) -> anyhow::Result<()> {
    logging::init_cli(&config.logging.level);

    match config.validate() {
        Ok(settings) => {
            println!("configuration ok");
            println!("  source channel: {}", settings.rule.source);
            println!("  target channel: {}", settings.rule.target);
            println!("  webhook name:   {}", settings.webhook_name);
            println!("  impersonate:    {}", settings.impersonate);
            println!("  retry delay:    {}s", settings.retry.delay.as_secs());
            match settings.retry.max_attempts {
                Some(max) => println!("  max attempts:   {max}"),
                None => println!("  max attempts:   unlimited"),
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "configuration invalid");
            Err(e.into())
        }
    }
}
