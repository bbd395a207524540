use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub refresh_path: String,
    pub refresh_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding `session.json`; `None` means the per-user default
    pub config_dir: Option<PathBuf>,
    pub idle_timeout_secs: u64,
    pub idle_grace_secs: u64,
    pub idle_tick_secs: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("TOURDESK_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("TOURDESK_API_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("TOURDESK_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }

        // Auth overrides
        if let Ok(v) = env::var("TOURDESK_REFRESH_TIMEOUT_SECS") {
            self.auth.refresh_timeout_secs = v.parse().unwrap_or(self.auth.refresh_timeout_secs);
        }

        // Session overrides
        if let Ok(v) = env::var("TOURDESK_CONFIG_DIR") {
            self.session.config_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("TOURDESK_IDLE_TIMEOUT_SECS") {
            self.session.idle_timeout_secs = v.parse().unwrap_or(self.session.idle_timeout_secs);
        }
        if let Ok(v) = env::var("TOURDESK_IDLE_GRACE_SECS") {
            self.session.idle_grace_secs = v.parse().unwrap_or(self.session.idle_grace_secs);
        }

        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.refresh_timeout_secs)
    }

    /// Resolve the directory holding the persisted session, creating it if needed
    pub fn config_dir(&self) -> Result<PathBuf, crate::error::GatewayError> {
        let dir = match &self.session.config_dir {
            Some(dir) => dir.clone(),
            None => {
                let home = env::var("HOME").map_err(|_| {
                    crate::error::GatewayError::Config("HOME environment variable not set".to_string())
                })?;
                PathBuf::from(home).join(".config").join("tourdesk")
            }
        };

        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }

        Ok(dir)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:3001/api".to_string(),
                request_timeout_secs: 30,
                user_agent: format!("tourdesk-client/{}", env!("CARGO_PKG_VERSION")),
            },
            auth: AuthConfig {
                refresh_path: "/auth/refresh".to_string(),
                refresh_timeout_secs: 15,
            },
            session: SessionConfig {
                config_dir: None,
                idle_timeout_secs: 60 * 60, // 1 hour
                idle_grace_secs: 60,
                idle_tick_secs: 1,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.tourdesk.app/api".to_string(),
                request_timeout_secs: 20,
                user_agent: format!("tourdesk-client/{}", env!("CARGO_PKG_VERSION")),
            },
            auth: AuthConfig {
                refresh_path: "/auth/refresh".to_string(),
                refresh_timeout_secs: 15,
            },
            session: SessionConfig {
                config_dir: None,
                idle_timeout_secs: 30 * 60,
                idle_grace_secs: 60,
                idle_tick_secs: 1,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://tourdesk.app/api".to_string(),
                request_timeout_secs: 15,
                user_agent: format!("tourdesk-client/{}", env!("CARGO_PKG_VERSION")),
            },
            auth: AuthConfig {
                refresh_path: "/auth/refresh".to_string(),
                refresh_timeout_secs: 10,
            },
            session: SessionConfig {
                config_dir: None,
                idle_timeout_secs: 15 * 60, // 15 minutes
                idle_grace_secs: 60,
                idle_tick_secs: 1,
            },
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<GatewayConfig> = Lazy::new(GatewayConfig::from_env);

pub fn config() -> &'static GatewayConfig {
    &CONFIG
}
