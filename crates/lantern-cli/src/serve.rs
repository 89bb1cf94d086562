//! HTTP/SSE surface for the exhibition renderer: the engine's event bus
//! bridged onto `/events`, plus submit, cluster, stats and health
//! endpoints.

use std::convert::Infallible;
use std::io::Write;

use anyhow::{Context, Result};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::Stream;
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use lantern_core::EngineConfig;
use lantern_engine::{EngineError, TraversalEngine};
use lantern_store::MessageStore;

pub async fn run(store: MessageStore, config: EngineConfig, listen: &str) -> Result<()> {
    let engine = TraversalEngine::new(store, config)
        .map_err(|e| anyhow::anyhow!("failed to build engine: {e}"))?;
    engine
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("failed to initialize engine: {e}"))?;

    let app = axum::Router::new()
        .route("/healthz", get(healthz))
        .route("/events", get(events))
        .route("/cluster", get(cluster))
        .route("/stats", get(stats))
        .route("/submit", post(submit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(engine.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    let addr = listener.local_addr().context("failed to read bound address")?;

    // Printed (and flushed) so callers binding port 0 can read it back.
    println!("listening on http://{addr}");
    let _ = std::io::stdout().flush();
    tracing::info!(%addr, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    engine.stop();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

async fn healthz() -> &'static str {
    "ok"
}

async fn events(
    State(engine): State<TraversalEngine>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut rx = engine.subscribe();
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(e) => {
                            tracing::error!("event serialization failed: {e}");
                            continue;
                        }
                    };
                    yield Ok(Event::default().event(event.kind()).data(data));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Slow consumer: drop what it missed, keep streaming.
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn cluster(State(engine): State<TraversalEngine>) -> Response {
    Json(engine.current_cluster().await).into_response()
}

async fn stats(State(engine): State<TraversalEngine>) -> Response {
    Json(engine.stats().await).into_response()
}

#[derive(Deserialize)]
struct SubmitRequest {
    content: String,
}

async fn submit(
    State(engine): State<TraversalEngine>,
    Json(req): Json<SubmitRequest>,
) -> Response {
    match engine.submit(&req.content).await {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(EngineError::RejectedSubmission(reason)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": reason })),
        )
            .into_response(),
        Err(e @ EngineError::StoreUnavailable { .. }) => {
            tracing::error!("submit failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("submit failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
