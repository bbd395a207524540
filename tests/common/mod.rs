#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use tourdesk_client::config::GatewayConfig;
use tourdesk_client::{FileTokenStore, Gateway, ReqwestTransport};

pub const PASSWORD: &str = "machu-picchu";

#[derive(Default)]
pub struct StubState {
    access: HashSet<String>,
    refresh: HashSet<String>,
    issued: u32,
    pub refresh_calls: u32,
    pub logout_calls: u32,
    pub user_inactive: bool,
    pub refresh_rejected: bool,
}

type Shared = Arc<Mutex<StubState>>;

/// In-process TourDesk API on a free port
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: Shared,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}/api", port);
        let state: Shared = Arc::new(Mutex::new(StubState::default()));

        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/me", get(me))
            .route("/api/auth/logout", post(logout))
            .route("/api/trips", get(trips))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind stub server")?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self { port, base_url, state, task };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("http://127.0.0.1:{}/health", self.port);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("stub server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn config(&self, dir: &PathBuf) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.api.base_url = self.base_url.clone();
        config.session.config_dir = Some(dir.clone());
        config
    }

    /// Gateway over `reqwest` with its session file in `dir`
    pub fn gateway(&self, dir: &PathBuf) -> Result<Gateway> {
        let config = self.config(dir);
        let transport = ReqwestTransport::new(&config)?;
        let store = FileTokenStore::open(dir)?;
        Ok(Gateway::new(Arc::new(transport), Arc::new(store), &config))
    }

    /// Invalidate every access token handed out so far
    pub fn expire_access_tokens(&self) {
        self.state.lock().unwrap().access.clear();
    }

    pub fn refresh_calls(&self) -> u32 {
        self.state.lock().unwrap().refresh_calls
    }

    pub fn logout_calls(&self) -> u32 {
        self.state.lock().unwrap().logout_calls
    }

    pub fn deactivate_user(&self) {
        self.state.lock().unwrap().user_inactive = true;
    }

    pub fn reject_refresh(&self) {
        self.state.lock().unwrap().refresh_rejected = true;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fresh scratch directory for a session file
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tourdesk-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn user() -> Value {
    json!({
        "id": 7,
        "name": "Ana Quispe",
        "email": "ana@andestours.example",
        "role": "admin",
        "companyId": 3,
        "companyName": "Andes Tours"
    })
}

fn issue(state: &mut StubState) -> Value {
    state.issued += 1;
    let access = format!("access-{}", state.issued);
    let refresh = format!("refresh-{}", state.issued);
    state.access.insert(access.clone());
    state.refresh.insert(refresh.clone());
    json!({ "accessToken": access, "refreshToken": refresh })
}

fn unauthorized(code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": true, "message": "Unauthorized", "code": code })),
    )
        .into_response()
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Authorize a protected route, or the 401 to answer with
fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), Response> {
    let state = state.lock().unwrap();
    if state.user_inactive {
        return Err(unauthorized("USER_INACTIVE"));
    }
    match bearer(headers) {
        Some(token) if state.access.contains(&token) => Ok(()),
        _ => Err(unauthorized("TOKEN_EXPIRED")),
    }
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["password"] != json!(PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": true, "message": "Invalid credentials", "code": "INVALID_CREDENTIALS" })),
        )
            .into_response();
    }
    let tokens = issue(&mut state.lock().unwrap());
    ok(json!({ "user": user(), "tokens": tokens }))
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    // Long enough for concurrent callers to pile up behind one renewal
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut state = state.lock().unwrap();
    state.refresh_calls += 1;
    if state.refresh_rejected {
        return unauthorized("TOKEN_INVALID");
    }
    let presented = body["refreshToken"].as_str().unwrap_or_default().to_string();
    if !state.refresh.remove(&presented) {
        return unauthorized("TOKEN_INVALID");
    }
    let tokens = issue(&mut state);
    ok(json!({ "tokens": tokens }))
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(()) => ok(json!({ "user": user() })),
        Err(response) => response,
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    state.logout_calls += 1;
    if let Some(token) = bearer(&headers) {
        state.access.remove(&token);
    }
    ok(json!({}))
}

async fn trips(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match authorize(&state, &headers) {
        Ok(()) => ok(json!([
            { "id": 1, "name": "Valle Sagrado" },
            { "id": 2, "name": "Lago Titicaca" }
        ])),
        Err(response) => response,
    }
}
