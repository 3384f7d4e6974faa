//! Relay endpoint handlers.
//!
//! The relay handler runs one linear pipeline per request:
//! 1. Authenticate the caller
//! 2. Parse the body (multipart fields, or JSON then form data)
//! 3. Forward the payload to the downstream once
//! 4. Echo the downstream status and body back

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::config::{AuthMode, Config, ConfigError};
use crate::error::RelayError;
use crate::forward::{ForwardError, Forwarder};
use crate::payload::{parse_multipart, parse_payload, BodyKind, Payload, PayloadError};
use crate::token::{TokenService, FORWARD_SUBJECT, ISSUED_SUBJECT};
use crate::web::auth::AuthStrategy;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthStrategy,
    pub tokens: Option<TokenService>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppStateError> {
        let tokens = config
            .jwt_secret
            .as_deref()
            .map(|secret| TokenService::new(secret, config.token_ttl));
        let auth = AuthStrategy::from_config(&config, tokens.as_ref())?;
        let forwarder = Forwarder::new(
            config.forward_url.clone(),
            config.forward_format,
            config.forward_timeout,
        )?;

        Ok(Self {
            config: Arc::new(config),
            auth,
            tokens,
            forwarder,
        })
    }
}

/// Failure assembling the state at startup.
#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Forwarder(#[from] ForwardError),
}

// =============================================================================
// Liveness
// =============================================================================

/// Static message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Liveness check.
pub async fn liveness() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "API is live. Use POST to send data securely.",
    })
}

// =============================================================================
// Token issuance
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Hand out a short-lived bearer token (bearer mode only).
pub async fn issue_token(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, RelayError> {
    let tokens = state.tokens.as_ref().ok_or(RelayError::TokenIssue)?;

    let token = tokens.issue(ISSUED_SUBJECT).map_err(|e| {
        error!(error = %e, "token_issue_failed");
        RelayError::TokenIssue
    })?;

    info!(ttl_seconds = state.config.token_ttl.as_secs(), "token_issued");

    Ok(Json(TokenResponse { token }))
}

// =============================================================================
// Relay
// =============================================================================

/// Successful relay response.
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    pub message: &'static str,
    pub received_data: Payload,
    pub zoho_status: u16,
    pub zoho_response: String,
}

/// Relay endpoint.
///
/// The body is only read once the caller is authorized.
pub async fn relay(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<RelayResponse>), RelayError> {
    state.auth.authorize(request.headers())?;

    let payload = read_payload(request, &state).await.map_err(|e| {
        error!(error = %e, "Failed to parse request data");
        RelayError::InvalidRequestData
    })?;

    info!(data = %serde_json::Value::Object(payload.clone()), "POST Webhook hit!");

    let internal_token = match state.config.auth_mode {
        AuthMode::None => {
            let tokens = state.tokens.as_ref().ok_or(RelayError::TokenIssue)?;
            let token = tokens.issue(FORWARD_SUBJECT).map_err(|e| {
                error!(error = %e, "forward_token_issue_failed");
                RelayError::TokenIssue
            })?;
            Some(token)
        }
        AuthMode::StaticKey | AuthMode::Bearer => None,
    };

    let forwarded = state
        .forwarder
        .forward(&payload, internal_token.as_deref())
        .await
        .map_err(|_| RelayError::ForwardFailed)?;

    Ok((
        StatusCode::OK,
        Json(RelayResponse {
            message: "POST request received and forwarded successfully",
            received_data: payload,
            zoho_status: forwarded.status,
            zoho_response: forwarded.body,
        }),
    ))
}

async fn read_payload(request: Request, state: &AppState) -> Result<Payload, PayloadError> {
    let kind = BodyKind::from_content_type(
        request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    );

    if kind == BodyKind::Multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| PayloadError::Multipart(e.body_text()))?;
        return parse_multipart(multipart).await;
    }

    let body = Bytes::from_request(request, state)
        .await
        .map_err(|e| PayloadError::Undecodable {
            json: e.body_text(),
            form: "body could not be read".to_string(),
        })?;
    parse_payload(&body, kind)
}
