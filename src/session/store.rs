use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::GatewayResult;
use crate::types::{SessionUser, TokenPair};

/// Everything persisted for a session, under the same keys the web client uses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    /// Both tokens, if both are present
    pub fn tokens(&self) -> Option<TokenPair> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access.clone(), refresh.clone())),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    fn apply_tokens(&mut self, tokens: TokenPair) {
        self.access_token = Some(tokens.access_token);
        self.refresh_token = Some(tokens.refresh_token);
        self.updated_at = Some(Utc::now());
    }
}

/// Holder of the token pair and cached user.
///
/// Every mutation swaps the whole record under one lock, so readers see
/// either the old pair or the new pair, never a mix.
pub trait TokenStore: Send + Sync {
    fn snapshot(&self) -> StoredSession;

    /// Login/registration: install a fresh pair and user together
    fn save_session(&self, tokens: TokenPair, user: SessionUser) -> GatewayResult<()>;

    /// Renewal: replace the pair, keep the cached user
    fn replace_tokens(&self, tokens: TokenPair) -> GatewayResult<()>;

    fn set_user(&self, user: SessionUser) -> GatewayResult<()>;

    /// Drop tokens and user in one step
    fn clear(&self) -> GatewayResult<()>;

    fn access_token(&self) -> Option<String> {
        self.snapshot().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.snapshot().refresh_token
    }

    fn user(&self) -> Option<SessionUser> {
        self.snapshot().user
    }
}

fn lock(session: &Mutex<StoredSession>) -> MutexGuard<'_, StoredSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: Mutex<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn snapshot(&self) -> StoredSession {
        lock(&self.session).clone()
    }

    fn save_session(&self, tokens: TokenPair, user: SessionUser) -> GatewayResult<()> {
        let mut session = lock(&self.session);
        session.apply_tokens(tokens);
        session.user = Some(user);
        Ok(())
    }

    fn replace_tokens(&self, tokens: TokenPair) -> GatewayResult<()> {
        lock(&self.session).apply_tokens(tokens);
        Ok(())
    }

    fn set_user(&self, user: SessionUser) -> GatewayResult<()> {
        lock(&self.session).user = Some(user);
        Ok(())
    }

    fn clear(&self) -> GatewayResult<()> {
        *lock(&self.session) = StoredSession::default();
        Ok(())
    }
}

/// `session.json` on disk, mirrored in memory
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    session: Mutex<StoredSession>,
}

impl FileTokenStore {
    pub const FILE_NAME: &'static str = "session.json";

    /// Open the store in `dir`, loading any session left by a previous run
    pub fn open(dir: &Path) -> GatewayResult<Self> {
        let path = dir.join(Self::FILE_NAME);

        let session = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("Discarding unreadable session file {}: {}", path.display(), e);
                    StoredSession::default()
                }
            }
        } else {
            StoredSession::default()
        };

        Ok(Self {
            path,
            session: Mutex::new(session),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, session: &StoredSession) -> GatewayResult<()> {
        if session.is_empty() {
            if self.path.exists() {
                if let Err(e) = fs::remove_file(&self.path) {
                    // Leave no tokens behind for the next run even if the file stays
                    tracing::warn!("Could not remove {}: {}; truncating instead", self.path.display(), e);
                    fs::write(&self.path, "{}")?;
                }
            }
            return Ok(());
        }

        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply in memory first; a failed write leaves the in-memory session current
    fn update(&self, apply: impl FnOnce(&mut StoredSession)) -> GatewayResult<()> {
        let mut session = lock(&self.session);
        apply(&mut session);
        self.persist(&session)
    }
}

impl TokenStore for FileTokenStore {
    fn snapshot(&self) -> StoredSession {
        lock(&self.session).clone()
    }

    fn save_session(&self, tokens: TokenPair, user: SessionUser) -> GatewayResult<()> {
        self.update(|session| {
            session.apply_tokens(tokens);
            session.user = Some(user);
        })
    }

    fn replace_tokens(&self, tokens: TokenPair) -> GatewayResult<()> {
        self.update(|session| session.apply_tokens(tokens))
    }

    fn set_user(&self, user: SessionUser) -> GatewayResult<()> {
        self.update(|session| session.user = Some(user))
    }

    fn clear(&self) -> GatewayResult<()> {
        self.update(|session| *session = StoredSession::default())
    }
}
