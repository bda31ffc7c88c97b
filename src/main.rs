use std::sync::Arc;

use api_rest::{cors_layer_from_env_value, router, AppState};
use hms_core::{config, CoreContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the hospital management service.
///
/// Serves the REST API, the `/ws` realtime stream and Swagger UI on one listener.
///
/// # Environment Variables
/// - `HMS_REST_ADDR`: listen address (default: "0.0.0.0:5000")
/// - `HMS_DATA_DIR`: record storage directory, created if missing (default: "hospital_data")
/// - `HMS_JWT_SECRET`: token signing secret
/// - `HMS_TOKEN_TTL_HOURS`, `HMS_PASSWORD_ITERATIONS`, `HMS_UTC_OFFSET_MINUTES`
/// - `HMS_CORS_ORIGINS`: comma-separated allowed origins (unset means permissive)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is invalid,
/// - the data directory cannot be opened, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hms=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |key: &str| std::env::var(key).ok();
    let cfg = config::resolve(None, env)?;
    if cfg.uses_default_secret() {
        tracing::warn!("HMS_JWT_SECRET not set; signing tokens with the built-in default secret");
    }
    let cors = cors_layer_from_env_value(env("HMS_CORS_ORIGINS"))?;
    let rest_addr = env("HMS_REST_ADDR").unwrap_or_else(|| "0.0.0.0:5000".into());

    let ctx = CoreContext::open(Arc::new(cfg))?;
    tracing::info!(data_dir = %ctx.cfg().data_dir().display(), "++ Store opened");

    let app = router(AppState::new(ctx), cors);

    tracing::info!("++ Starting hospital REST API on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("-- Shutting down");
}
