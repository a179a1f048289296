// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley webhook bot service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values;
/// secrets (webhook app secret, API tokens) have no defaults and must be
/// provided before the service will start.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Inbound webhook verification settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Outbound chat platform API settings.
    #[serde(default)]
    pub chat_api: ChatApiConfig,

    /// Reply generator backend settings.
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Human handoff and escalation settings.
    #[serde(default)]
    pub handoff: HandoffConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inbound webhook verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared secret used to verify `X-Hub-Signature-256` headers.
    /// `None` rejects all webhook deliveries.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token echoed during the GET subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,
}

/// Outbound chat platform API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatApiConfig {
    /// Base URL of the platform messages API.
    #[serde(default = "default_chat_api_base_url")]
    pub base_url: String,

    /// Bearer token for the platform API. `None` disables outbound sends.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Platform sender id (the business phone-number id).
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Minimum spacing between sends to the same recipient, in milliseconds.
    #[serde(default = "default_min_send_interval_ms")]
    pub min_send_interval_ms: u64,

    /// Maximum delivery attempts per outbound message.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum number of in-flight sends across all recipients.
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_api_base_url(),
            access_token: None,
            phone_number_id: None,
            min_send_interval_ms: default_min_send_interval_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}

fn default_chat_api_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

fn default_min_send_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_concurrent_sends() -> usize {
    8
}

/// Reply generator backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResponderConfig {
    /// Base URL of the reply generation API.
    #[serde(default = "default_responder_base_url")]
    pub base_url: String,

    /// API key for the reply backend. `None` requires environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier passed to the reply backend.
    #[serde(default = "default_responder_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_responder_max_tokens")]
    pub max_tokens: u32,

    /// Hard deadline for a single generation request, in seconds.
    #[serde(default = "default_responder_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            base_url: default_responder_base_url(),
            api_key: None,
            model: default_responder_model(),
            max_tokens: default_responder_max_tokens(),
            timeout_secs: default_responder_timeout_secs(),
        }
    }
}

fn default_responder_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_responder_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_responder_max_tokens() -> u32 {
    1024
}

fn default_responder_timeout_secs() -> u64 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind the HTTP listener to.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token protecting the operator endpoints.
    /// `None` disables the operator routes entirely.
    #[serde(default)]
    pub operator_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            operator_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8433
}

/// Human handoff and escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Inbound phrases that escalate a conversation to a human.
    /// Matched case-insensitively as whole words.
    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,

    /// Retry budget for compare-and-swap status transitions.
    #[serde(default = "default_cas_max_attempts")]
    pub cas_max_attempts: u32,

    /// Number of recent messages handed to the reply generator as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            escalation_keywords: default_escalation_keywords(),
            cas_max_attempts: default_cas_max_attempts(),
            history_window: default_history_window(),
        }
    }
}

fn default_escalation_keywords() -> Vec<String> {
    vec!["human".to_string(), "agent".to_string(), "operator".to_string()]
}

fn default_cas_max_attempts() -> u32 {
    3
}

fn default_history_window() -> usize {
    20
}
