use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relation_engine_api::{config, router, AppState};

#[derive(Parser)]
#[command(name = "relation-engine-api")]
#[command(about = "Relation Engine API - authenticated query relay for ArangoDB")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Spec checkout with views/ and schemas/ (overrides SPECS_PATH)")]
    specs_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up ARANGO_URL, AUTH_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(specs_path) = args.specs_path {
        config.specs.path = specs_path;
    }

    tracing::info!(
        "Starting Relation Engine API in {:?} mode (auth: {:?}, specs: {})",
        config.environment,
        config.auth.mode,
        config.specs.path.display()
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Relation Engine API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
