mod config;
mod sign;
mod telemetry;

use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "printgate", about = "Signing proxy for the PrintOS PrintBeat API")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the configured resources
    Proxy(ConfigArgs),
    /// Print the signed request for one resource without calling the vendor
    Sign(sign::SignArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, default_value = "printgate.yaml")]
    config_file_path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Proxy(args) => run_proxy(args),
        CliCommand::Sign(args) => sign::run(args),
    }
}

fn run_proxy(args: ConfigArgs) -> Result<(), Box<dyn Error>> {
    let config = config::Config::from_file(&args.config_file_path)?;

    let _sentry_guard = telemetry::init_logging(&config.common.logging)?;
    if let Some(metrics) = &config.common.metrics {
        telemetry::init_metrics(metrics)?;
    }

    tracing::info!(config = %args.config_file_path.display(), "starting proxy");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(signing_proxy::run(config.proxy))?;

    Ok(())
}
