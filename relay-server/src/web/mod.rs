//! HTTP surface of the relay.
//!
//! - `GET  <relay path>`: liveness check
//! - `POST <relay path>`: authenticate, parse, forward, respond
//! - `GET  <token path>`: token issuance, bearer mode only

pub mod auth;
pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::config::AuthMode;

pub use auth::AuthStrategy;
pub use handlers::{
    issue_token, liveness, relay, AppState, AppStateError, MessageResponse, RelayResponse,
    TokenResponse,
};

/// Build the router for the configured auth mode.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route(&state.config.relay_path, get(liveness).post(relay));

    if state.config.auth_mode == AuthMode::Bearer {
        app = app.route(&state.config.token_path, get(issue_token));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
