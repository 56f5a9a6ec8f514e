use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use archigenie_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    archigenie_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let bind_addr = settings.bind_addr.clone();

    let services = archigenie_api::app::build_services(settings)
        .await
        .context("failed to initialize services")?;
    let app = archigenie_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
