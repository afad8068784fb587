use anyhow::{Context, Result};
use clap::Parser;
use docsearch_server::{build_app_with, ServerConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// Serve search over a documentation index artifact.
#[derive(Parser)]
#[command(name = "docsearch-server")]
struct Args {
    /// Artifact to load (js, json or bincode); `POST /reload` re-reads it
    #[arg(long, default_value = "./build/search_index.js")]
    index: PathBuf,
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let config = ServerConfig::from_env();
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, /reload is disabled");
    }
    let app = build_app_with(&args.index, config)
        .with_context(|| format!("loading {}", args.index.display()))?;

    let addr = SocketAddr::new(args.host, args.port);
    let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, index = %args.index.display(), "serving search");
    axum::serve(listener, app).with_graceful_shutdown(shutdown()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
