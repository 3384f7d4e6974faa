//! Webhook relay.
//!
//! Accepts a webhook call, checks the caller's credential, decodes the body
//! as JSON or form data, forwards it once to a fixed downstream URL and
//! returns the downstream's status and body to the caller.
//!
//! ## Architecture
//!
//! ```text
//! Caller → AuthStrategy → parse_payload → Forwarder → downstream
//!        ←──────────────── RelayResponse ←───────────┘
//! ```

pub mod config;
pub mod error;
pub mod forward;
pub mod logging;
pub mod payload;
pub mod token;
pub mod web;

// Re-export commonly used types
pub use config::{AuthMode, Config, ConfigError, ForwardFormat};
pub use error::RelayError;
pub use forward::{Forwarded, Forwarder};
pub use payload::{parse_payload, Payload};
pub use token::TokenService;
pub use web::{router, AppState};
