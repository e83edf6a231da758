//! pdfmark API server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use pdfmark_api::{app, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdfmark_api=info".parse()?)
                .add_directive("pdfmark_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = Config::from_env();
    info!("Initializing pdfmark API...");
    let port = config.port;
    let state = Arc::new(AppState::new(config).await?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting pdfmark API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
