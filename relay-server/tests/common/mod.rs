//! Shared helpers for relay integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    routing::post as route_post,
    Router,
};
use relay::{router, AppState, Config};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// One request as seen by the mock downstream.
#[derive(Debug, Clone)]
pub struct Captured {
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

/// In-process downstream that records every call and answers with a fixed
/// status and body.
#[derive(Clone)]
pub struct MockDownstream {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<Captured>>>,
}

#[derive(Clone)]
struct MockState {
    calls: Arc<Mutex<Vec<Captured>>>,
    status: StatusCode,
    body: &'static str,
    delay: Duration,
}

impl MockDownstream {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        Self::start_delayed(status, body, Duration::ZERO).await
    }

    /// Like [`MockDownstream::start`], but every answer waits `delay` first.
    pub async fn start_delayed(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            calls: calls.clone(),
            status,
            body,
            delay,
        };

        let app = Router::new()
            .route("/hook", route_post(record))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, calls }
    }

    pub fn url(&self) -> String {
        format!("http://{}/hook", self.addr)
    }

    pub fn calls(&self) -> Vec<Captured> {
        self.calls.lock().unwrap().clone()
    }
}

async fn record(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.calls.lock().unwrap().push(Captured {
        content_type: header("content-type"),
        authorization: header("authorization"),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    tokio::time::sleep(state.delay).await;
    (state.status, state.body)
}

/// A URL nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/hook")
}

pub fn config(vars: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|name| map.get(name).cloned()).unwrap()
}

pub fn app(config: Config) -> Router {
    router(AppState::new(config).unwrap())
}

/// Send one request through the router and return status plus JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn post(
    path: &str,
    content_type: &str,
    headers: &[(&str, &str)],
    body: &'static str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", content_type);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}
