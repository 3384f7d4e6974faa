//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup into a [`Config`] that is then shared
//! read-only with every request.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that prevent the relay from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How inbound callers are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No inbound check; an internal token authenticates the outbound call.
    None,
    /// Shared secret compared against a request header.
    StaticKey,
    /// Signed bearer token in the `Authorization` header.
    Bearer,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "open" => Ok(AuthMode::None),
            "api_key" | "static_key" | "key" => Ok(AuthMode::StaticKey),
            "bearer" | "jwt" => Ok(AuthMode::Bearer),
            other => Err(format!("unknown auth mode {other:?}")),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMode::None => "none",
            AuthMode::StaticKey => "api_key",
            AuthMode::Bearer => "bearer",
        })
    }
}

/// Body encoding used for the outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardFormat {
    Form,
    Json,
}

impl FromStr for ForwardFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(ForwardFormat::Form),
            "json" => Ok(ForwardFormat::Json),
            other => Err(format!("unknown forward format {other:?}")),
        }
    }
}

/// Log line format for both sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Inbound authentication strategy
    pub auth_mode: AuthMode,

    /// Static shared secret (static-key mode)
    pub api_token: Option<String>,

    /// Header carrying the static shared secret
    pub api_key_header: String,

    /// Downstream URL every payload is forwarded to
    pub forward_url: Url,

    /// Body encoding for the outbound call
    pub forward_format: ForwardFormat,

    /// Outbound request timeout
    pub forward_timeout: Duration,

    /// HS256 secret for issuing and verifying tokens
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,

    /// Path serving both the liveness check (GET) and the relay (POST)
    pub relay_path: String,

    /// Token issuance path, only routed in bearer mode
    pub token_path: String,

    /// Port for the web server to listen on
    pub port: u16,

    /// Append-only log file
    pub log_file: String,

    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_mode", &self.auth_mode)
            .field("api_token_set", &self.api_token.is_some())
            .field("api_key_header", &self.api_key_header)
            .field("forward_url", &self.forward_url.as_str())
            .field("forward_format", &self.forward_format)
            .field("forward_timeout", &self.forward_timeout)
            .field("jwt_secret_set", &self.jwt_secret.is_some())
            .field("token_ttl", &self.token_ttl)
            .field("relay_path", &self.relay_path)
            .field("token_path", &self.token_path)
            .field("port", &self.port)
            .field("log_file", &self.log_file)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let auth_mode = match var("AUTH_MODE") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: "AUTH_MODE",
                value: raw,
                reason,
            })?,
            None => AuthMode::StaticKey,
        };

        let api_token = var("API_TOKEN");
        if auth_mode == AuthMode::StaticKey && api_token.is_none() {
            return Err(ConfigError::Missing("API_TOKEN"));
        }

        let jwt_secret = var("JWT_SECRET");
        if auth_mode != AuthMode::StaticKey && jwt_secret.is_none() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        let raw_url = var("ZOHO_WEBHOOK_URL").ok_or(ConfigError::Missing("ZOHO_WEBHOOK_URL"))?;
        let forward_url = parse_forward_url(&raw_url)?;

        let default_format = match auth_mode {
            AuthMode::StaticKey => ForwardFormat::Form,
            AuthMode::None | AuthMode::Bearer => ForwardFormat::Json,
        };
        let forward_format = match var("FORWARD_FORMAT") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: "FORWARD_FORMAT",
                value: raw,
                reason,
            })?,
            None => default_format,
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("text") | None => LogFormat::Text,
            Some(other) => {
                warn!(env_var = "LOG_FORMAT", value = %other, "Invalid log format, using text");
                LogFormat::Text
            }
        };

        let relay_path = normalize_path(var("RELAY_PATH"), "/FinaurtAPI");
        let token_path = normalize_path(var("TOKEN_PATH"), "/token");
        if auth_mode == AuthMode::Bearer && token_path == relay_path {
            return Err(ConfigError::Invalid {
                name: "TOKEN_PATH",
                value: token_path,
                reason: "must differ from RELAY_PATH".to_string(),
            });
        }

        Ok(Config {
            auth_mode,
            api_token,
            api_key_header: var("API_KEY_HEADER")
                .unwrap_or_else(|| "x-api-key".to_string())
                .to_ascii_lowercase(),
            forward_url,
            forward_format,
            forward_timeout: Duration::from_millis(parse_or(
                "FORWARD_TIMEOUT_MS",
                var("FORWARD_TIMEOUT_MS"),
                15_000,
            )),
            jwt_secret,
            token_ttl: Duration::from_secs(parse_or(
                "TOKEN_TTL_SECS",
                var("TOKEN_TTL_SECS"),
                1800,
            )),
            relay_path,
            token_path,
            port: parse_or("PORT", var("PORT"), 8000),
            log_file: var("LOG_FILE").unwrap_or_else(|| "api_requests.log".to_string()),
            log_format,
        })
    }
}

fn parse_forward_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "ZOHO_WEBHOOK_URL",
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(invalid(format!("unsupported scheme {scheme:?}"))),
    }
}

/// Parse an optional numeric value, falling back to the default on garbage.
fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
{
    match raw {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
                default
            }
        },
    }
}

fn normalize_path(raw: Option<String>, default: &str) -> String {
    match raw {
        Some(p) if p.starts_with('/') => p,
        Some(p) => format!("/{p}"),
        None => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_static_key_defaults() {
        let config = load(&[
            ("API_TOKEN", "secret123"),
            ("ZOHO_WEBHOOK_URL", "https://flow.zoho.com/hook"),
        ])
        .unwrap();

        assert_eq!(config.auth_mode, AuthMode::StaticKey);
        assert_eq!(config.api_token.as_deref(), Some("secret123"));
        assert_eq!(config.api_key_header, "x-api-key");
        assert_eq!(config.forward_format, ForwardFormat::Form);
        assert_eq!(config.forward_timeout, Duration::from_secs(15));
        assert_eq!(config.relay_path, "/FinaurtAPI");
        assert_eq!(config.port, 8000);
        assert_eq!(config.log_file, "api_requests.log");
    }

    #[test]
    fn test_missing_api_token_is_fatal() {
        let err = load(&[("ZOHO_WEBHOOK_URL", "https://flow.zoho.com/hook")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("API_TOKEN"));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let err = load(&[
            ("AUTH_MODE", "bearer"),
            ("JWT_SECRET", "   "),
            ("ZOHO_WEBHOOK_URL", "https://flow.zoho.com/hook"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_missing_forward_url_is_fatal() {
        let err = load(&[("API_TOKEN", "secret123")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ZOHO_WEBHOOK_URL"));
    }

    #[test]
    fn test_forward_url_scheme_checked() {
        let err = load(&[
            ("API_TOKEN", "secret123"),
            ("ZOHO_WEBHOOK_URL", "ftp://example.com/"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ZOHO_WEBHOOK_URL", .. }));
    }

    #[test]
    fn test_open_mode_defaults_to_json() {
        let config = load(&[
            ("AUTH_MODE", "none"),
            ("JWT_SECRET", "signing"),
            ("ZOHO_WEBHOOK_URL", "http://localhost:9000/"),
        ])
        .unwrap();
        assert_eq!(config.auth_mode, AuthMode::None);
        assert_eq!(config.forward_format, ForwardFormat::Json);
    }

    #[test]
    fn test_unknown_auth_mode_rejected() {
        let err = load(&[
            ("AUTH_MODE", "oauth"),
            ("ZOHO_WEBHOOK_URL", "http://localhost:9000/"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "AUTH_MODE", .. }));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = load(&[
            ("API_TOKEN", "secret123"),
            ("ZOHO_WEBHOOK_URL", "http://localhost:9000/"),
            ("PORT", "eighty"),
            ("FORWARD_TIMEOUT_MS", "2500"),
            ("RELAY_PATH", "hooks/in"),
        ])
        .unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.forward_timeout, Duration::from_millis(2500));
        assert_eq!(config.relay_path, "/hooks/in");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = load(&[
            ("API_TOKEN", "secret123"),
            ("ZOHO_WEBHOOK_URL", "http://localhost:9000/"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret123"));
        assert!(rendered.contains("api_token_set: true"));
    }
}
