//! Outbound delivery to the downstream webhook.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::ForwardFormat;
use crate::payload::{to_form_pairs, Payload};

/// Transport-level failure talking to the downstream.
///
/// A downstream error status is not a `ForwardError`.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("downstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("downstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Status and body text returned by the downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarded {
    pub status: u16,
    pub body: String,
}

/// Shared client that posts payloads to the configured downstream URL.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    url: Url,
    format: ForwardFormat,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(url: Url, format: ForwardFormat, timeout: Duration) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ForwardError::Client)?;

        Ok(Self {
            client,
            url,
            format,
            timeout,
        })
    }

    /// Post the payload once. No retries.
    pub async fn forward(
        &self,
        payload: &Payload,
        bearer: Option<&str>,
    ) -> Result<Forwarded, ForwardError> {
        let mut request = self.client.post(self.url.clone());

        request = match self.format {
            ForwardFormat::Form => request.form(&to_form_pairs(payload)),
            ForwardFormat::Json => request.json(payload),
        };

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let result = async {
            let resp = request.send().await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>(Forwarded { status, body })
        }
        .await;

        match result {
            Ok(forwarded) => {
                info!(
                    url = %self.url,
                    status_code = forwarded.status,
                    response = %forwarded.body,
                    "forward_complete"
                );
                Ok(forwarded)
            }
            Err(e) if e.is_timeout() => {
                error!(
                    url = %self.url,
                    timeout_seconds = self.timeout.as_secs_f64(),
                    error = %e,
                    "forward_timeout"
                );
                Err(ForwardError::Timeout(self.timeout))
            }
            Err(e) => {
                error!(url = %self.url, error = %e, "forward_failed");
                Err(ForwardError::Transport(e))
            }
        }
    }
}
