//! Inbound caller authentication.
//!
//! One [`AuthStrategy`] is chosen at startup from [`AuthMode`] and applied to
//! every relay request before the body is parsed.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderName};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::{AuthMode, Config, ConfigError};
use crate::error::RelayError;
use crate::token::TokenService;

/// Authentication policy for the relay endpoint.
#[derive(Clone)]
pub enum AuthStrategy {
    /// Accept every caller.
    Open,
    /// Header value must equal the shared secret.
    StaticKey { header: HeaderName, secret: String },
    /// `Authorization: Bearer <token>` verified against the token service.
    Bearer(TokenService),
}

impl AuthStrategy {
    pub fn from_config(
        config: &Config,
        tokens: Option<&TokenService>,
    ) -> Result<Self, ConfigError> {
        match config.auth_mode {
            AuthMode::None => Ok(AuthStrategy::Open),
            AuthMode::StaticKey => {
                let secret = config
                    .api_token
                    .clone()
                    .ok_or(ConfigError::Missing("API_TOKEN"))?;
                let header = HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(
                    |e| ConfigError::Invalid {
                        name: "API_KEY_HEADER",
                        value: config.api_key_header.clone(),
                        reason: e.to_string(),
                    },
                )?;
                Ok(AuthStrategy::StaticKey { header, secret })
            }
            AuthMode::Bearer => tokens
                .cloned()
                .map(AuthStrategy::Bearer)
                .ok_or(ConfigError::Missing("JWT_SECRET")),
        }
    }

    /// Check the request headers against this policy.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), RelayError> {
        match self {
            AuthStrategy::Open => Ok(()),
            AuthStrategy::StaticKey { header, secret } => {
                let provided = headers.get(header).and_then(|v| v.to_str().ok());
                match provided {
                    Some(value) if keys_match(value, secret) => Ok(()),
                    provided => {
                        warn!(
                            header = %header,
                            has_header = provided.is_some(),
                            "Unauthorized token attempt"
                        );
                        Err(RelayError::Unauthorized(
                            "Unauthorized: Invalid API token".to_string(),
                        ))
                    }
                }
            }
            AuthStrategy::Bearer(tokens) => {
                let token = bearer_token(headers)?;
                tokens
                    .verify(token)
                    .map(|_| ())
                    .map_err(|e| RelayError::Unauthorized(e.to_string()))
            }
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, RelayError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Authorization header missing"))?
        .to_str()
        .map_err(|_| unauthorized("Invalid authorization header format"))?;

    let mut parts = value.split_whitespace();
    let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => return Err(unauthorized("Invalid authorization header format")),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(unauthorized("Invalid authentication scheme"));
    }

    Ok(token)
}

fn unauthorized(detail: &str) -> RelayError {
    warn!(reason = detail, "bearer_auth_rejected");
    RelayError::Unauthorized(detail.to_string())
}

/// Compare two secrets without leaking where they differ.
///
/// Both sides are hashed first so the comparison length is fixed, then
/// compared with `subtle` so the optimizer cannot reintroduce branches.
fn keys_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());

    a.as_slice().ct_eq(b.as_slice()).into()
}
