use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::GatewayResult;
use crate::gateway::transport::{ApiRequest, RawResponse, Transport};
use crate::types::{Role, SessionUser};

/// How the scripted server answers `POST /auth/refresh`
#[derive(Debug, Clone, Copy)]
pub enum RefreshMode {
    /// Accept a known refresh token and rotate the pair
    Rotate,
    /// Answer 401 with this code
    Reject(&'static str),
    /// Never answer
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

struct FakeState {
    access: HashSet<String>,
    refresh: HashSet<String>,
    issued: u32,
    refresh_mode: RefreshMode,
    refresh_delay: Duration,
    path_delays: HashMap<String, Duration>,
    reject_all_access: bool,
    user_inactive: bool,
    inactive_tokens: HashSet<String>,
    calls: Vec<RecordedCall>,
}

/// In-memory stand-in for the TourDesk API
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub const REFRESH_PATH: &'static str = "/auth/refresh";

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                access: HashSet::new(),
                refresh: HashSet::new(),
                issued: 0,
                refresh_mode: RefreshMode::Rotate,
                refresh_delay: Duration::ZERO,
                path_delays: HashMap::new(),
                reject_all_access: false,
                user_inactive: false,
                inactive_tokens: HashSet::new(),
                calls: Vec::new(),
            }),
        })
    }

    pub fn grant(&self, access: &str, refresh: &str) {
        let mut state = self.state.lock().unwrap();
        state.access.insert(access.to_string());
        state.refresh.insert(refresh.to_string());
    }

    pub fn grant_refresh(&self, refresh: &str) {
        self.state.lock().unwrap().refresh.insert(refresh.to_string());
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        self.state.lock().unwrap().refresh_mode = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state.lock().unwrap().refresh_delay = delay;
    }

    /// Hold the response for `path` after deciding it
    pub fn set_path_delay(&self, path: &str, delay: Duration) {
        self.state.lock().unwrap().path_delays.insert(path.to_string(), delay);
    }

    pub fn reject_all_access_tokens(&self) {
        self.state.lock().unwrap().reject_all_access = true;
    }

    pub fn deactivate_user(&self) {
        self.state.lock().unwrap().user_inactive = true;
    }

    /// Answer `USER_INACTIVE` to any call carrying `token`
    pub fn deactivate_token(&self, token: &str) {
        self.state.lock().unwrap().inactive_tokens.insert(token.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls_to(Self::REFRESH_PATH)
    }

    pub fn refresh_requests_were_public(&self) -> bool {
        self.calls()
            .iter()
            .filter(|c| c.path == Self::REFRESH_PATH)
            .all(|c| c.bearer.is_none())
    }

    fn refresh(&self, request: &ApiRequest) -> RawResponse {
        let mut state = self.state.lock().unwrap();

        if let RefreshMode::Reject(code) = state.refresh_mode {
            return unauthorized(code);
        }

        let presented = request
            .body
            .as_ref()
            .and_then(|b| b.get("refreshToken"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !state.refresh.remove(&presented) {
            return unauthorized("TOKEN_INVALID");
        }

        state.issued += 1;
        let access = format!("access-{}", state.issued);
        let refresh = format!("refresh-{}", state.issued);
        state.access.insert(access.clone());
        state.refresh.insert(refresh.clone());

        RawResponse::new(
            200,
            json!({
                "success": true,
                "data": { "tokens": { "accessToken": access, "refreshToken": refresh } }
            }),
        )
    }

    /// Login, registration, `me` and logout
    fn auth(&self, request: &ApiRequest) -> Option<RawResponse> {
        let mut state = self.state.lock().unwrap();
        let field = |name: &str| {
            request
                .body
                .as_ref()
                .and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match request.path.as_str() {
            "/auth/login" | "/auth/register" => {
                let accepted = request.path == "/auth/register" || field("password") == SAMPLE_PASSWORD;
                if !accepted {
                    return Some(RawResponse::new(
                        401,
                        json!({ "error": true, "message": "Invalid credentials", "code": "INVALID_CREDENTIALS" }),
                    ));
                }

                state.issued += 1;
                let access = format!("access-{}", state.issued);
                let refresh = format!("refresh-{}", state.issued);
                state.access.insert(access.clone());
                state.refresh.insert(refresh.clone());

                let mut user = serde_json::to_value(sample_user()).unwrap_or_default();
                if request.path == "/auth/register" {
                    user["email"] = json!(field("email"));
                    user["name"] = json!(field("name"));
                }

                Some(RawResponse::new(
                    200,
                    json!({
                        "success": true,
                        "data": {
                            "user": user,
                            "tokens": { "accessToken": access, "refreshToken": refresh }
                        }
                    }),
                ))
            }
            "/auth/me" => {
                let valid = request.bearer.as_ref().map_or(false, |t| state.access.contains(t));
                Some(if valid && !state.reject_all_access {
                    RawResponse::new(200, json!({ "success": true, "data": { "user": sample_user() } }))
                } else {
                    unauthorized("TOKEN_EXPIRED")
                })
            }
            "/auth/logout" => {
                if let Some(token) = &request.bearer {
                    state.access.remove(token);
                }
                Some(RawResponse::new(200, json!({ "success": true, "data": {} })))
            }
            _ => None,
        }
    }

    fn resource(&self, request: &ApiRequest) -> (RawResponse, Duration) {
        let state = self.state.lock().unwrap();
        let delay = state.path_delays.get(&request.path).copied().unwrap_or_default();

        if request.path == "/missing" {
            return (
                RawResponse::new(404, json!({ "success": false, "error": "Not found" })),
                delay,
            );
        }
        let token_inactive = request
            .bearer
            .as_ref()
            .map_or(false, |t| state.inactive_tokens.contains(t));
        if state.user_inactive || token_inactive {
            return (unauthorized("USER_INACTIVE"), delay);
        }

        let valid = request
            .bearer
            .as_ref()
            .map_or(false, |t| state.access.contains(t));

        if !valid || state.reject_all_access {
            return (unauthorized("TOKEN_EXPIRED"), delay);
        }

        (
            RawResponse::new(
                200,
                json!({ "success": true, "data": { "path": request.path, "token": request.bearer } }),
            ),
            delay,
        )
    }
}

fn unauthorized(code: &str) -> RawResponse {
    RawResponse::new(401, json!({ "error": true, "message": "Unauthorized", "code": code }))
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, request: &ApiRequest) -> GatewayResult<RawResponse> {
        let (mode, refresh_delay) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(RecordedCall {
                method: request.method.to_string(),
                path: request.path.clone(),
                query: request.query.clone(),
                body: request.body.clone(),
                bearer: request.bearer.clone(),
            });
            (state.refresh_mode, state.refresh_delay)
        };

        if request.path == Self::REFRESH_PATH {
            if let RefreshMode::Hang = mode {
                std::future::pending::<()>().await;
            }
            if !refresh_delay.is_zero() {
                tokio::time::sleep(refresh_delay).await;
            }
            return Ok(self.refresh(request));
        }

        if let Some(response) = self.auth(request) {
            return Ok(response);
        }

        let (response, delay) = self.resource(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(response)
    }
}

pub const SAMPLE_PASSWORD: &str = "correct horse";

pub fn sample_user() -> SessionUser {
    SessionUser {
        id: json!(12),
        name: "Lucía Ramos".to_string(),
        email: "lucia@andestours.example".to_string(),
        role: Role::Seller,
        company_id: Some(json!(3)),
        company_name: Some("Andes Tours".to_string()),
        extra: Map::new(),
    }
}
