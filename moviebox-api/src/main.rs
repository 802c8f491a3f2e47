use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use moviebox_api::http::{create_router, AppState};
use moviebox_client::MovieBoxClient;
use moviebox_core::{logging, Config};

#[derive(Parser)]
#[command(name = "moviebox-api", about = "MovieBox gateway HTTP server")]
struct Args {
    /// Config file path (env vars override file values)
    #[arg(long, env = "MOVIEBOX_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}");
        eprintln!("Using default configuration");
        Config::default()
    });

    logging::init_logging(&config.logging)?;

    let client = Arc::new(MovieBoxClient::new(&config.upstream));
    info!(
        primary = client.hosts().primary(),
        origin = %config.proxy.origin,
        "MovieBox gateway starting"
    );

    let state = AppState {
        client,
        origin: config.proxy.origin.clone(),
    };
    let router = create_router(state);

    let address = config.http_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| {
            error!(%address, error = %e, "failed to bind HTTP address");
            anyhow::anyhow!("Failed to bind {address}: {e}")
        })?;

    info!("HTTP server listening on {address}");
    axum::serve(listener, router).await?;

    Ok(())
}
