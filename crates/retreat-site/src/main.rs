use anyhow::Result;
use retreat_site::config::load_config;
use retreat_site::AppState;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let rust_log = EnvFilter::try_from_default_env().ok();
    let from_env = rust_log.is_some();
    let (filter_layer, filter_handle) =
        reload::Layer::new(rust_log.unwrap_or_else(|| EnvFilter::new("info")));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .init();

    tracing::info!("Starting retreat-site");

    let settings = load_config()?;

    // RUST_LOG wins over the configured level.
    if !from_env {
        match EnvFilter::try_new(settings.logging.level.as_str()) {
            Ok(filter) => {
                if let Err(e) = filter_handle.modify(|current| *current = filter) {
                    tracing::warn!(error = %e, "Failed to update log filter from config");
                }
            }
            Err(_) => {
                tracing::warn!(level = %settings.logging.level, "Invalid log level in config, keeping info");
            }
        }
    }

    tracing::info!(
        timezone = %settings.calendar.timezone,
        max_occurrences = settings.calendar.max_occurrences,
        revalidate_secs = settings.content.revalidate_secs,
        "Configuration loaded"
    );

    let state = AppState::from_settings(&settings)?;
    let app = retreat_site::app(state);

    let bind_addr = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("retreat-site listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
