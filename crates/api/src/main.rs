use anyhow::{Context, Result};

use hrpay_api::{app, config::ApiConfig};

#[tokio::main]
async fn main() -> Result<()> {
    hrpay_observability::init();

    let config = ApiConfig::from_env()?;
    tracing::info!(mode = %config.auth.mode, bind = %config.bind_addr, "starting hrpay-api");

    let service = app::services::build_service(&config).await?;
    let router = app::build_app(service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await.with_context(|| "serve")?;
    Ok(())
}
