use std::sync::Arc;

use anyhow::Context;

use storefront_infra::{store, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(backend = ?config.backend, "starting storefront api");

    let store = store::open(&config.backend)
        .await
        .context("failed to open store")?;
    let services = Arc::new(storefront_api::app::services::AppServices::new(store));
    let app = storefront_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
