// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Wires SQLite storage, the reply generator, the outbound dispatcher, the
//! escalation policy, and the event pipeline, then runs the HTTP gateway
//! until a shutdown signal arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_config::model::ParleyConfig;
use parley_core::ParleyError;
use parley_delivery::{ChatApiClient, Dispatcher};
use parley_engine::{KeywordEscalation, Pipeline};
use parley_gateway::{GatewayState, ServerConfig};
use parley_resilience::RetryPolicy;
use parley_responder::HttpReplyGenerator;
use parley_storage::Database;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `parley serve` command.
///
/// Fails fast when a required secret is missing, except the webhook app
/// secret: the gateway starts without one but rejects every delivery until
/// it is configured.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting parley serve");

    let api_key = config.responder.api_key.clone().ok_or_else(|| {
        ParleyError::Config(
            "responder API key required. Set responder.api_key or PARLEY_RESPONDER_API_KEY"
                .to_string(),
        )
    })?;
    let access_token = config.chat_api.access_token.clone().ok_or_else(|| {
        ParleyError::Config(
            "chat API token required. Set chat_api.access_token or PARLEY_CHAT_API_ACCESS_TOKEN"
                .to_string(),
        )
    })?;
    let phone_number_id = config.chat_api.phone_number_id.clone().ok_or_else(|| {
        ParleyError::Config("chat API sender id required. Set chat_api.phone_number_id".to_string())
    })?;

    if config.webhook.app_secret.is_none() {
        warn!("webhook.app_secret is not set; all webhook deliveries will be rejected");
    }

    // Create the data directory if the database lives in one.
    if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ParleyError::Config(format!(
                    "cannot create data directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = config.storage.database_path.as_str(), "storage ready");

    let generator = Arc::new(HttpReplyGenerator::new(
        config.responder.base_url.clone(),
        api_key,
        config.responder.model.clone(),
        config.responder.max_tokens,
        Duration::from_secs(config.responder.timeout_secs),
    ));
    info!(model = config.responder.model.as_str(), "reply generator ready");

    let client = ChatApiClient::new(
        config.chat_api.base_url.clone(),
        access_token,
        phone_number_id,
    );
    let dispatcher = Arc::new(Dispatcher::new(
        client,
        RetryPolicy::new(
            config.chat_api.max_attempts,
            Duration::from_millis(config.chat_api.base_delay_ms),
        ),
        Duration::from_millis(config.chat_api.min_send_interval_ms),
        config.chat_api.max_concurrent_sends,
    ));
    info!(
        max_attempts = config.chat_api.max_attempts,
        min_send_interval_ms = config.chat_api.min_send_interval_ms,
        max_concurrent_sends = config.chat_api.max_concurrent_sends,
        "dispatcher ready"
    );

    let escalation = Arc::new(KeywordEscalation::new(&config.handoff.escalation_keywords)?);

    let pipeline = Arc::new(Pipeline::new(
        db,
        generator,
        dispatcher,
        escalation,
        config.handoff.history_window,
        config.handoff.cas_max_attempts,
    ));

    if config.gateway.operator_token.is_none() {
        warn!("gateway.operator_token is not set; operator endpoints are disabled");
    }

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        operator_token: config.gateway.operator_token.clone(),
    };
    let state = GatewayState {
        pipeline,
        app_secret: config.webhook.app_secret.clone(),
        verify_token: config.webhook.verify_token.clone(),
        cas_max_attempts: config.handoff.cas_max_attempts,
        start_time: Instant::now(),
    };

    let cancel = shutdown::install_signal_handler();
    parley_gateway::start_server(&server_config, state, cancel).await?;

    info!("parley serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
