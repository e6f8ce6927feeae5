use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use replicated_value::{cli::Cli, node::NodeContext, server};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.node_config().context("failed to load node configuration")?;
    let node = Arc::new(NodeContext::new(config).context("failed to build node")?);

    let bind_addr = format!("0.0.0.0:{}", node.config().port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        self_address = node.self_address(),
        cluster_mode = node.config().cluster_mode,
        "listening"
    );

    server::serve(listener, node, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = ?err, "failed to install ctrl-c handler");
        }
    })
    .await
    .context("server exited with error")?;

    info!("node shut down");
    Ok(())
}
