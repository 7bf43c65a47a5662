//! In-process fake of the console backend proxy.
//!
//! Serves the login endpoint and whatever GET responses a test installs,
//! recording every request so tests can assert on headers and query strings.

#![allow(dead_code)]

use awsconsole::app::resource_explorer::BackendClient;
use awsconsole::app::session::{SessionController, SessionStore};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub session_header: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct FakeState {
    routes: Mutex<HashMap<String, (u16, Value)>>,
    login: Mutex<Option<(u16, Value)>>,
    logins: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct FakeBackend {
    pub base_url: String,
    state: Arc<FakeState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/api/backend-home/", post(handle_login))
            .fallback(handle_get)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Serve `body` with `status` for GET `path`
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    /// Override the login response. By default logins succeed with
    /// `sid-1`, `sid-2`, ... in order.
    pub fn login_response(&self, status: u16, body: Value) {
        *self.state.login.lock().unwrap() = Some((status, body));
    }

    /// Hold every GET for `ms` before answering
    pub fn delay(&self, ms: u64) {
        self.state.delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn controller(&self) -> Arc<SessionController> {
        controller_for(&self.base_url, Arc::new(SessionStore::in_memory()))
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn controller_for(base_url: &str, store: Arc<SessionStore>) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        store,
        BackendClient::new(base_url).unwrap(),
    ))
}

/// An origin nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn record(state: &FakeState, method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        session_header: headers
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(body).ok(),
    });
}

async fn handle_login(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, &uri, &headers, &body);

    if let Some((status, body)) = state.login.lock().unwrap().clone() {
        return reply(status, body);
    }

    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "session_id": format!("sid-{}", n),
        "expiration": "2026-10-19T12:00:00+00:00"
    }))
    .into_response()
}

async fn handle_get(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, &uri, &headers, &body);

    let current = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let route = state.routes.lock().unwrap().get(uri.path()).cloned();
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    match route {
        Some((status, body)) => reply(status, body),
        None => reply(404, json!({"detail": "Not Found"})),
    }
}

fn reply(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

pub fn ec2_payload() -> Value {
    json!([
        {
            "instance_id": "i-0abc",
            "name": "web-1",
            "instance_type": "t3.micro",
            "state": "running",
            "az": "us-east-1a",
            "private_ip": "10.0.1.10",
            "public_ip": null,
            "security_groups": [{"group_id": "sg-web", "group_name": "web"}],
            "tags": [{"Key": "Environment", "Value": "Production"}]
        },
        {
            "instance_id": "i-0def",
            "instance_type": "t3.small",
            "state": "stopped",
            "az": "us-east-1b",
            "private_ip": "10.0.2.20",
            "public_ip": "N/A",
            "tags": [{"key": "Environment", "value": "staging"}]
        }
    ])
}

pub fn security_groups_payload() -> Value {
    json!({
        "sg-web": {
            "sg_id": "sg-web",
            "sg_name": "web",
            "vpc_id": "vpc-1",
            "region": "us-east-1",
            "inbound_rules": [
                {"protocol": "tcp", "port": "443", "cidr": "0.0.0.0/0"},
                {"protocol": "tcp", "port": "80", "cidr": "0.0.0.0/0",
                 "instance_id": "i-0abc", "instance_name": "web-1"}
            ],
            "outbound_rules": [{"protocol": "-1", "cidr": "0.0.0.0/0"}],
            "tags": [{"Key": "Team", "Value": "Platform"}]
        },
        "sg-db": {
            "sg_id": "sg-db",
            "sg_name": "db",
            "vpc_id": "vpc-2",
            "region": "us-east-1",
            "inbound_rules": [{"protocol": "tcp", "port": "5432", "cidr": "10.0.0.0/8"}],
            "outbound_rules": [],
            "tags": []
        }
    })
}

pub fn s3_payload() -> Value {
    json!([
        {"name": "logs-bucket", "region": "us-east-1", "encrypted": true,
         "tags": [{"Key": "Environment", "Value": "Production"}]},
        {"name": "scratch", "region": "Unknown", "encrypted": false, "tags": []}
    ])
}

pub fn network_payload() -> Value {
    json!({
        "vpcs": [
            {"name": "main", "vpc_id": "vpc-1", "cidr_block": "10.0.0.0/16",
             "tags": [{"Key": "Name", "Value": "main"}]}
        ],
        "subnets": [
            {"subnet_name": "public-a", "subnet_id": "subnet-1", "vpc_id": "vpc-1",
             "cidr_block": "10.0.1.0/24", "availability_zone": "us-east-1a",
             "route_table": null, "available_ips": 251}
        ],
        "nat_gateways": [
            {"nat_name": "nat-a", "nat_gateway_id": "nat-1", "vpc_id": "vpc-1",
             "type": "public", "elastic_ip": "3.3.3.3", "subnet_id": "subnet-1"}
        ]
    })
}
