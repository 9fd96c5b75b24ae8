//! CLI entrypoint for `docweave`.

use clap::Parser;
use docweave_cli::cli::Args;
use docweave_cli::error::CliError;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    docweave_cli::run(&args, &mut std::io::stdout().lock())
}
