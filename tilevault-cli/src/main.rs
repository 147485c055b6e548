//! TileVault CLI - offline map pack management from the terminal.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::PackCommands;

/// Offline map packs for devices that keep working without a network.
#[derive(Debug, Parser)]
#[command(name = "tilevault", version, about)]
struct Cli {
    /// Path to an alternative config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog URL override.
    #[arg(long, global = true)]
    catalog_url: Option<String>,

    #[command(subcommand)]
    command: PackCommands,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let ctx = commands::load_context(cli.config, cli.catalog_url)?;
        commands::run(cli.command, ctx).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
