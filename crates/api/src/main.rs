use std::sync::Arc;

use anyhow::Context;

use muster_infra::AccessConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    muster_observability::init();

    let config = AccessConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(muster_api::app::services::build_services(&config).await?);
    let app = muster_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
