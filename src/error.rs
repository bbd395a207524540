// Client-side API error types
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::session::events::ForcedLogout;

/// Server-emitted codes that steer session handling on a 401.
///
/// Anything the backend sends that is not listed here is treated as a
/// permanent authorization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    /// Access token is past its expiry. Renewal may help.
    TokenExpired,
    /// Access token is malformed or signed with a rotated key. Renewal may help.
    TokenInvalid,
    /// Session was ended server-side because the user went idle.
    SessionInactive,
    /// Account was deactivated.
    UserInactive,
}

impl AuthSignal {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "TOKEN_EXPIRED" => Some(AuthSignal::TokenExpired),
            "TOKEN_INVALID" => Some(AuthSignal::TokenInvalid),
            "SESSION_INACTIVE" => Some(AuthSignal::SessionInactive),
            "USER_INACTIVE" => Some(AuthSignal::UserInactive),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            AuthSignal::TokenExpired => "TOKEN_EXPIRED",
            AuthSignal::TokenInvalid => "TOKEN_INVALID",
            AuthSignal::SessionInactive => "SESSION_INACTIVE",
            AuthSignal::UserInactive => "USER_INACTIVE",
        }
    }

    /// Whether exchanging the refresh token can recover the call
    pub fn is_renewable(&self) -> bool {
        matches!(self, AuthSignal::TokenExpired | AuthSignal::TokenInvalid)
    }
}

/// Coarse classification of a failed response so callers can branch on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    UnprocessableEntity,
    TooManyRequests,
    Server,
    Other,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            422 => ErrorKind::UnprocessableEntity,
            429 => ErrorKind::TooManyRequests,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Other,
        }
    }
}

/// A non-2xx response, with the server's error payload preserved
#[derive(Debug, Clone)]
pub struct ApiFailure {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub field_errors: Option<HashMap<String, String>>,
    pub payload: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    field_errors: Option<HashMap<String, String>>,
}

impl ApiFailure {
    /// Build from a status and whatever body the server sent back.
    ///
    /// Accepts both `{ "message", "code" }` and the enveloped
    /// `{ "success": false, "error": "..." }` shapes.
    pub fn from_response(status: u16, payload: Value) -> Self {
        let body: ErrorBody = serde_json::from_value(payload.clone()).unwrap_or_default();

        let error_text = match &body.error {
            Some(Value::String(text)) => Some(text.clone()),
            _ => None,
        };

        let message = body
            .message
            .or(error_text)
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        Self {
            status,
            code: body.code,
            message,
            field_errors: body.field_errors,
            payload,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_status(self.status)
    }

    pub fn signal(&self) -> Option<AuthSignal> {
        self.code.as_deref().and_then(AuthSignal::from_code)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// 401 carrying a code that a token renewal can fix
    pub fn is_renewable(&self) -> bool {
        self.is_unauthorized() && self.signal().map_or(false, |s| s.is_renewable())
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({}, HTTP {})", self.message, code, self.status),
            None => write!(f, "{} (HTTP {})", self.message, self.status),
        }
    }
}

/// Everything a gateway call can fail with.
///
/// `Clone` so a single renewal outcome can be handed to every queued caller.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Api(ApiFailure),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Session ended: {}", .0.message)]
    SessionEnded(ForcedLogout),

    #[error("Token renewal was abandoned before it settled")]
    RenewalAbandoned,

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api(failure) => Some(failure.status),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Api(failure) => failure.kind(),
            GatewayError::SessionEnded(_) => ErrorKind::Unauthorized,
            _ => ErrorKind::Other,
        }
    }

    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            GatewayError::Api(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn forced_logout(&self) -> Option<&ForcedLogout> {
        match self {
            GatewayError::SessionEnded(event) => Some(event),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Storage(err.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        GatewayError::Config(format!("invalid URL: {}", err))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
