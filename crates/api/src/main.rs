use std::sync::Arc;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = warden_api::config::Config::from_env().context("invalid configuration")?;
    warden_observability::init(config.log_format);
    if config.used_dev_secret {
        tracing::warn!(
            "{} not set; signing tokens with the public dev secret",
            warden_api::config::ENV_JWT_SECRET
        );
    }

    let services = warden_api::app::services::build_services(&config)
        .await
        .context("failed to start services")?;
    let app = warden_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
