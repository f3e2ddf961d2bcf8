use std::net::SocketAddr;

use clap::Parser;
use mcp_gateway::config::{GatewayConfig, GatewayMode};

#[derive(Debug, Parser)]
struct Args {
    /// YAML config file. Without it every setting takes its default.
    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum)]
    mode: Option<GatewayMode>,

    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Catalog document (path or URL) for the proxy deployment.
    #[arg(long)]
    modules: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => {
            tracing::info!(config = %path, "loading config");
            GatewayConfig::from_yaml_bytes(&tokio::fs::read(path).await?)?
        }
        None => GatewayConfig::default(),
    };
    if let Some(mode) = args.mode {
        cfg.mode = mode;
    }
    if let Some(addr) = args.listen_addr {
        cfg.listen_addr = Some(addr);
    }
    if let Some(modules) = args.modules {
        cfg.modules = modules;
    }

    mcp_gateway::server::run(cfg).await
}
