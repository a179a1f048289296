// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The webhook routes
//! authenticate by body signature; the operator routes by bearer token.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use parley_core::ParleyError;
use parley_engine::Pipeline;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The event processing pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Shared secret for webhook signature verification. `None` rejects all
    /// webhook deliveries (fail-closed).
    pub app_secret: Option<String>,
    /// Token echoed during the GET subscription handshake.
    pub verify_token: Option<String>,
    /// Retry budget for operator-driven transitions.
    pub cas_max_attempts: u32,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors `GatewayConfig` from parley-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for the operator API (`None` = operator API disabled).
    pub operator_token: Option<String>,
}

/// Build the full gateway router.
///
/// Routes:
/// - `GET /health` (public)
/// - `GET /webhook` (subscription handshake), `POST /webhook` (deliveries)
/// - `GET /v1/conversations/{id}` and `POST .../claim|resume|close` (bearer auth)
pub fn build_router(config: &ServerConfig, state: GatewayState) -> Router {
    let auth_state = AuthConfig {
        bearer_token: config.operator_token.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::post_webhook),
        )
        .with_state(state.clone());

    let operator_routes = Router::new()
        .route("/v1/conversations/{id}", get(handlers::get_conversation))
        .route(
            "/v1/conversations/{id}/claim",
            post(handlers::claim_conversation),
        )
        .route(
            "/v1/conversations/{id}/resume",
            post(handlers::resume_conversation),
        )
        .route(
            "/v1/conversations/{id}/close",
            post(handlers::close_conversation),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(operator_routes)
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until the token is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ParleyError> {
    let app = build_router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ParleyError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
