//! Short-lived HS256 tokens.
//!
//! The same service issues tokens to callers (bearer mode), verifies the
//! tokens callers present, and mints the internal token that authenticates
//! the outbound call in open mode.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Subject of tokens handed out by the issuance endpoint.
pub const ISSUED_SUBJECT: &str = "webhook-relay";

/// Subject of tokens attached to outbound calls.
pub const FORWARD_SUBJECT: &str = "relay-forward";

/// Token verification and signing failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Claim set carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Purpose of the token
    pub sub: String,
    /// Issued at (unix timestamp)
    pub iat: u64,
    /// Expiration time (unix timestamp)
    pub exp: u64,
}

/// Issues and verifies tokens signed with one shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Sign a token for `subject` that expires after the configured TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now = unix_now();
        self.sign(&Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        })
    }

    /// Sign an explicit claim set.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => {
                    warn!("token_expired");
                    Err(TokenError::Expired)
                }
                kind => {
                    warn!(reason = ?kind, "token_invalid");
                    Err(TokenError::Invalid)
                }
            },
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
