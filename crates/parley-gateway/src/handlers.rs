// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! The webhook handler acknowledges with 200 whenever the delivery is
//! authentic, even if individual events fail downstream. Only an
//! authentication failure produces a non-2xx status; anything else would
//! make the provider redeliver events we have already reserved.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use parley_core::ParleyError;
use parley_engine::handoff;
use parley_storage::queries::conversations;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::server::GatewayState;
use crate::signature::{verify_signature, SIGNATURE_HEADER};
use crate::parse;

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// `GET /health`. Public liveness probe.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
    .into_response()
}

/// `GET /webhook`. Provider subscription handshake: echo `hub.challenge`
/// when `hub.mode` is `subscribe` and `hub.verify_token` matches.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    match (&state.verify_token, mode, token) {
        (Some(expected), Some("subscribe"), Some(got)) if got == expected => {
            info!("webhook subscription handshake accepted");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!("webhook subscription handshake rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// `POST /webhook`. Verify the body signature, normalize the payload, and
/// process each event independently.
///
/// Events run on a spawned task that the handler awaits, so a client
/// disconnect cannot cancel processing of an event that was already
/// reserved in the idempotency ledger.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(ref app_secret) = state.app_secret else {
        error!("webhook secret not configured, rejecting delivery");
        return error_body(StatusCode::UNAUTHORIZED, "webhook verification unavailable");
    };

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = verify_signature(app_secret, &body, header) {
        warn!(error = %e, "webhook signature verification failed");
        return error_body(StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let events = match parse::parse_events(&body) {
        Ok(events) => events,
        Err(e) => {
            // Authentic but unparseable; acknowledge so the provider does
            // not redeliver a permanently broken payload.
            warn!(error = %e, "ignoring malformed webhook payload");
            return Json(json!({ "status": "ignored" })).into_response();
        }
    };

    let total = events.len();
    for event in events {
        let pipeline = state.pipeline.clone();
        let handle = tokio::spawn(async move {
            match pipeline.process_event(&event).await {
                Ok(outcome) => info!(event_id = %event.event_id, ?outcome, "event processed"),
                Err(e) => error!(event_id = %event.event_id, error = %e, "event processing failed"),
            }
        });
        if let Err(e) = handle.await {
            error!(error = %e, "event processing task panicked");
        }
    }

    Json(json!({ "status": "ok", "events": total })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct OperatorAction {
    /// Name recorded as the transition actor.
    pub operator: String,
}

/// `GET /v1/conversations/{id}`.
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match conversations::get_conversation(state.pipeline.database(), &id).await {
        Ok(Some(conversation)) => Json(conversation).into_response(),
        Ok(None) => error_body(StatusCode::NOT_FOUND, "conversation not found"),
        Err(e) => {
            error!(conversation_id = %id, error = %e, "conversation lookup failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
        }
    }
}

/// `POST /v1/conversations/{id}/claim`. Moves an active conversation to
/// human handling.
pub async fn claim_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(action): Json<OperatorAction>,
) -> Response {
    let db = state.pipeline.database();
    run_transition(
        &id,
        handoff::operator_claim(db, &id, &action.operator, state.cas_max_attempts).await,
    )
}

/// `POST /v1/conversations/{id}/resume`. Hands a human conversation back to
/// the automated responder.
pub async fn resume_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(action): Json<OperatorAction>,
) -> Response {
    let db = state.pipeline.database();
    run_transition(
        &id,
        handoff::operator_resume(db, &id, &action.operator, state.cas_max_attempts).await,
    )
}

/// `POST /v1/conversations/{id}/close`. Idempotent: closing a closed
/// conversation succeeds.
pub async fn close_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(action): Json<OperatorAction>,
) -> Response {
    let db = state.pipeline.database();
    run_transition(
        &id,
        handoff::operator_close(db, &id, &action.operator, state.cas_max_attempts).await,
    )
}

fn run_transition(id: &str, result: Result<parley_core::Conversation, ParleyError>) -> Response {
    match result {
        Ok(conversation) => Json(conversation).into_response(),
        Err(ParleyError::Internal(message)) if message.contains("not found") => {
            error_body(StatusCode::NOT_FOUND, "conversation not found")
        }
        Err(e @ ParleyError::InvalidTransition { .. }) => {
            error_body(StatusCode::CONFLICT, e.to_string())
        }
        Err(e @ ParleyError::StateMachine { .. }) => {
            error_body(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => {
            error!(conversation_id = %id, error = %e, "operator transition failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "transition failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use parley_core::ConversationStatus;
    use parley_storage::queries::{conversations, users};
    use parley_test_utils::{sign_payload, text_message_envelope, TestHarness};
    use tower::ServiceExt;

    use crate::server::{build_router, GatewayState, ServerConfig};

    const SECRET: &str = "hook-secret";
    const VERIFY_TOKEN: &str = "verify-me";
    const OPERATOR_TOKEN: &str = "op-token";

    fn router_for(harness: &TestHarness) -> Router {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            operator_token: Some(OPERATOR_TOKEN.to_string()),
        };
        let state = GatewayState {
            pipeline: harness.pipeline.clone(),
            app_secret: Some(SECRET.to_string()),
            verify_token: Some(VERIFY_TOKEN.to_string()),
            cas_max_attempts: 3,
            start_time: Instant::now(),
        };
        build_router(&config, state)
    }

    fn signed_webhook_request(body: &serde_json::Value) -> Request<Body> {
        let bytes = serde_json::to_vec(body).unwrap();
        let signature = sign_payload(SECRET, &bytes);
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-hub-signature-256", signature)
            .body(Body::from(bytes))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signed_webhook_produces_a_reply() {
        let harness = TestHarness::new().await;
        harness.generator.push_reply("hi there");
        let app = router_for(&harness);

        let envelope = text_message_envelope("wamid.1", "15551234567", "Ada", "hello");
        let response = app.oneshot(signed_webhook_request(&envelope)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["events"], 1);
        assert_eq!(
            harness.transport.sent(),
            vec![("15551234567".to_string(), "hi there".to_string())]
        );
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_without_processing() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let bytes =
            serde_json::to_vec(&text_message_envelope("wamid.1", "1555", "Ada", "hi")).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-hub-signature-256", sign_payload("wrong-secret", &bytes))
            .body(Body::from(bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(harness.transport.sent().is_empty());
        assert_eq!(harness.generator.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_but_authentic_payload_is_acknowledged() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let bytes = b"{\"entry\": \"not an array\"}".to_vec();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-hub-signature-256", sign_payload(SECRET, &bytes))
            .body(Body::from(bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ignored");
        assert!(harness.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn redelivered_webhook_sends_only_one_reply() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let envelope = text_message_envelope("wamid.1", "1555", "Ada", "hello");
        let first = app
            .clone()
            .oneshot(signed_webhook_request(&envelope))
            .await
            .unwrap();
        let second = app.oneshot(signed_webhook_request(&envelope)).await.unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(harness.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn handshake_echoes_challenge_for_matching_token() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let uri = format!(
            "/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=12345"
        );
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"12345");
    }

    #[tokio::test]
    async fn handshake_with_wrong_token_is_forbidden() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let uri = "/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=12345";
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn health_is_public() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    async fn seeded_conversation(harness: &TestHarness) -> String {
        let user = users::get_or_create_user(&harness.db, "1555", Some("Ada"))
            .await
            .unwrap();
        conversations::create_conversation(&harness.db, &user.id)
            .await
            .unwrap()
            .id
    }

    fn operator_request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(r#"{"operator":"kim"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn operator_routes_require_bearer_token() {
        let harness = TestHarness::new().await;
        let id = seeded_conversation(&harness).await;
        let app = router_for(&harness);

        let response = app
            .oneshot(operator_request(&format!("/v1/conversations/{id}/claim"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn claim_moves_conversation_to_human() {
        let harness = TestHarness::new().await;
        let id = seeded_conversation(&harness).await;
        let app = router_for(&harness);

        let response = app
            .oneshot(operator_request(
                &format!("/v1/conversations/{id}/claim"),
                Some(OPERATOR_TOKEN),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "human");

        let stored = conversations::get_conversation(&harness.db, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ConversationStatus::Human);
    }

    #[tokio::test]
    async fn claim_of_unknown_conversation_is_not_found() {
        let harness = TestHarness::new().await;
        let app = router_for(&harness);

        let response = app
            .oneshot(operator_request(
                "/v1/conversations/no-such-id/claim",
                Some(OPERATOR_TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resume_of_active_conversation_conflicts() {
        let harness = TestHarness::new().await;
        let id = seeded_conversation(&harness).await;
        let app = router_for(&harness);

        let response = app
            .oneshot(operator_request(
                &format!("/v1/conversations/{id}/resume"),
                Some(OPERATOR_TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn close_is_idempotent_over_http() {
        let harness = TestHarness::new().await;
        let id = seeded_conversation(&harness).await;
        let app = router_for(&harness);
        let path = format!("/v1/conversations/{id}/close");

        let first = app
            .clone()
            .oneshot(operator_request(&path, Some(OPERATOR_TOKEN)))
            .await
            .unwrap();
        let second = app
            .oneshot(operator_request(&path, Some(OPERATOR_TOKEN)))
            .await
            .unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::OK);
        let body = body_json(second).await;
        assert_eq!(body["status"], "closed");
    }

    #[tokio::test]
    async fn conversation_lookup_returns_stored_row() {
        let harness = TestHarness::new().await;
        let id = seeded_conversation(&harness).await;
        let app = router_for(&harness);

        let request = Request::builder()
            .uri(format!("/v1/conversations/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {OPERATOR_TOKEN}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], serde_json::Value::String(id));
        assert_eq!(body["status"], "active");
    }
}
