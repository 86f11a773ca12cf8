use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use askme_api::{router, AppState};
use askme_common::Config;
use askme_graph::GraphClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("askme=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let client = GraphClient::from_config(&config).await?;
    client.ping().await?;
    askme_graph::migrate::migrate(&client).await?;

    let host = std::env::var("API_HOST").unwrap_or_else(|_| config.web_host.clone());
    let port = std::env::var("API_PORT").unwrap_or_else(|_| config.web_port.to_string());

    let app = router(Arc::new(AppState::from_graph(client)));

    let addr = format!("{host}:{port}");
    info!("AskMe API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
