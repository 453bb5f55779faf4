use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::db::PgFeedbackStore;
use crate::routes::{
    api_test_handler, create_feedback_handler, delete_feedback_handler, health_handler,
    list_feedback_handler, stats_handler, AppState,
};
use crate::store::FeedbackStore;

pub fn build_router<S: FeedbackStore>(store: S, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState {
        store,
        environment: config.environment.clone(),
    });

    let api = Router::new()
        .route(
            "/feedback",
            get(list_feedback_handler::<S>).post(create_feedback_handler::<S>),
        )
        .route("/feedback/{id}", delete(delete_feedback_handler::<S>))
        .route("/stats", get(stats_handler::<S>))
        .route("/health", get(health_handler::<S>))
        .route("/test", get(api_test_handler::<S>));

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    // credentials cannot be combined with a wildcard origin
    if config.allows_any_origin() {
        return cors.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Serves until Ctrl+C or SIGTERM, then closes the pool.
pub async fn serve(store: PgFeedbackStore, config: &ServerConfig) -> anyhow::Result<()> {
    let app = build_router(store.clone(), config);

    let address = config.address();
    info!("Binding to {address}");

    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(environment = %config.environment, "Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutting down, closing database pool");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = ctrl_c().await {
            warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(error) => {
                warn!(%error, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
