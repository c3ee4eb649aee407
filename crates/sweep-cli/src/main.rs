mod commands;
mod logging;
mod signals;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "permit-sweep",
    version,
    about = "Resumable, token-gated sweep of a permit directory"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config TOML (default: ~/.config/permit-sweep/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sweep, consuming tokens from the configured source (default)
    Run,
    /// Show resume point and stored counts without contacting the service
    Status {
        /// Number of recent checkpoints to list
        #[arg(long, default_value_t = 5)]
        history: u32,
    },
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = cli.config.as_deref();
    let result = runtime.block_on(async {
        match cli.command.unwrap_or(Commands::Run) {
            Commands::Run => commands::run::execute(config).await,
            Commands::Status { history } => commands::status::execute(config, history).await,
            Commands::Init { force } => commands::init::execute(config, force),
        }
    });

    // A pending stdin read sits on a blocking thread that cannot be cancelled.
    runtime.shutdown_timeout(Duration::from_secs(1));

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
