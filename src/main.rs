//! taixiu-node binary
//!
//! Serves `GET /api/taixiu/lottery` on the configured port.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use taixiu_node::api::{create_router, AppState};
use taixiu_node::config::Config;
use taixiu_node::history::HistoryBuffer;
use taixiu_node::predictor::RulePolicy;
use taixiu_node::upstream::UpstreamClient;

#[derive(Parser)]
#[command(name = "taixiu-node")]
#[command(about = "Tai/Xiu lottery relay with rolling history and pattern prediction")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "taixiu-node.toml")]
    config: PathBuf,

    /// HTTP port (overrides config file)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Upstream draw feed URL (overrides config file)
    #[arg(long, env = "TAIXIU_UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Upstream timeout in seconds (overrides config file)
    #[arg(long, env = "TAIXIU_UPSTREAM_TIMEOUT")]
    upstream_timeout: Option<u64>,

    /// Prediction rule set (overrides config file)
    #[arg(long, env = "TAIXIU_POLICY", value_enum)]
    policy: Option<RulePolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taixiu_node=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting taixiu-node");
    info!("Config file: {}", cli.config.display());

    let mut config = Config::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.upstream_url {
        config.upstream.url = url;
    }
    if let Some(timeout) = cli.upstream_timeout {
        config.upstream.timeout_secs = timeout;
    }
    if let Some(policy) = cli.policy {
        config.predictor.policy = policy;
    }

    info!("Upstream timeout: {}s", config.upstream.timeout_secs);
    info!("Policy: {}", config.predictor.policy.as_str());

    let source = UpstreamClient::new(config.upstream.url.clone(), config.upstream.timeout())?;
    info!("Upstream: {}", source.url());
    let state = Arc::new(AppState::new(
        Arc::new(source),
        config.predictor.settings(),
        HistoryBuffer::with_capacity(config.history.capacity),
    ));

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
