mod app;
mod cli;
mod cli_command;
mod display;
mod scripting;
mod state;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = cli.client_config()?;
    info!("Starting scan-sign CLI");

    match cli.script()? {
        Some(script) => app::run_script(config, script).await,
        None => app::run(config).await,
    }
}
