//! Tally server entry point.

use tally_server::boot::run_with_shutdown;
use tally_server::config::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tally=info".parse()?))
        .json()
        .init();

    let config = ServerConfig::from_env_or_yaml()?;
    tracing::info!(?config, "starting tally server");

    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
