use std::process::ExitCode;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use docforge::cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse first so --help and argument errors skip subscriber setup.
    let args = cli::parse_cli();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    cli::run_with_cli(args).await
}
