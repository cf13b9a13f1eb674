use anyhow::Result;
use clap::Parser;

use scowatch_daemon::cli::DaemonCli;
use scowatch_daemon::logging;
use scowatch_daemon::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = orchestrator::load_config(&cli).await?;
    logging::init_tracing(&config.general)?;

    if cli.validate {
        let definitions = orchestrator::validate_config(&config).await?;
        tracing::info!(definitions, "configuration is valid");
        return Ok(());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "scowatch starting");

    let orchestrator = Orchestrator::build_from_config(config).await?;
    let stats = orchestrator.run().await?;

    tracing::info!(
        stats = %serde_json::to_string(&stats)?,
        "scowatch shut down"
    );
    Ok(())
}
