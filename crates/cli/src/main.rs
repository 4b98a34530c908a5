use clap::Parser;
use tracing_subscriber::EnvFilter;
use vigil_cli::commands::{Cmd, Command};

/// Vigil CLI
///
/// Vigil is a static analyzer for the DELEGATECALL surface of EVM bytecode:
/// it enumerates call sites, recovers the symbolic target of each one,
/// recognizes standard proxy patterns, and assigns risk levels.
#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Vigil: EVM DELEGATECALL surface analyzer")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Vigil CLI with the provided arguments.
#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    if let Err(err) = cli.command.execute().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
