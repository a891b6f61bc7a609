//! Wicketgate binary entry point

use wicketgate::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start HTTP server
/// 6. Start background tasks (session sweeper)
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("WICKETGATE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wicketgate=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wicketgate=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Wicketgate...");

    // 2. Initialize metrics
    wicketgate::metrics::init_metrics();

    // 3. Load configuration (fails hard on missing provider credentials)
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config)?;

    // 5. Build Axum router
    let app = wicketgate::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", state.config.server.base_url());

    // 7. Start background tasks
    spawn_session_sweeper(state.clone());

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background session sweeper task
///
/// Purges expired session records on a fixed interval so the store
/// doesn't grow with abandoned sessions.
fn spawn_session_sweeper(state: AppState) {
    tokio::spawn(async move {
        let configured_interval_secs = state.config.auth.sweep_interval_seconds;
        let interval_secs = configured_interval_secs.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        if configured_interval_secs == 0 {
            tracing::warn!("auth.sweep_interval_seconds=0 is invalid; clamped to 1 second");
        }

        // Consume the immediate first tick to delay the initial sweep
        // until one interval passes.
        interval.tick().await;

        loop {
            interval.tick().await;

            let purged = state.sessions.purge_expired().await;
            if purged > 0 {
                tracing::info!(purged, "Expired sessions purged");
            }
        }
    });

    tracing::info!("Session sweeper task spawned");
}
