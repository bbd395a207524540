use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{ApiRequest, Gateway};
use crate::types::{AuthSession, Credentials, CurrentUser, Registration, SessionUser};

/// Login, registration and session lifecycle on top of a [`Gateway`]
pub struct AuthApi<'a> {
    gateway: &'a Gateway,
}

impl Gateway {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { gateway: self }
    }
}

impl<'a> AuthApi<'a> {
    /// `POST /auth/login`; stores the returned pair and user
    pub async fn login(&self, credentials: &Credentials) -> GatewayResult<SessionUser> {
        let request = ApiRequest::post("/auth/login").public().with_json(credentials)?;
        let session: AuthSession = self.gateway.request(request).await?;

        tracing::info!("Logged in as {} ({:?})", session.user.email, session.user.role);
        self.install(session)
    }

    /// `POST /auth/register`; a successful registration is also a login
    pub async fn register(&self, registration: &Registration) -> GatewayResult<SessionUser> {
        let request = ApiRequest::post("/auth/register").public().with_json(registration)?;
        let session: AuthSession = self.gateway.request(request).await?;

        tracing::info!("Registered {}", session.user.email);
        self.install(session)
    }

    /// `GET /auth/me`, refreshing the cached user
    pub async fn me(&self) -> GatewayResult<SessionUser> {
        let current: CurrentUser = self.gateway.request(ApiRequest::get("/auth/me")).await?;
        self.gateway.store().set_user(current.user.clone())?;
        Ok(current.user)
    }

    /// Validate a session persisted by an earlier run.
    ///
    /// Returns `None` when there is nothing stored or the server no longer
    /// accepts it; in the latter case storage is cleared.
    pub async fn restore_session(&self) -> GatewayResult<Option<SessionUser>> {
        if self.gateway.store().access_token().is_none() {
            return Ok(None);
        }

        match self.me().await {
            Ok(user) => Ok(Some(user)),
            Err(GatewayError::SessionEnded(event)) => {
                tracing::info!("Stored session rejected: {}", event.reason);
                Ok(None)
            }
            Err(e) if e.status() == Some(401) => {
                // A renewable 401 on the retry leaves the pair in place
                self.gateway.store().clear()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Renew the token pair now
    pub async fn refresh(&self) -> GatewayResult<()> {
        self.gateway.renew().await.map(|_| ())
    }

    /// User-initiated logout.
    ///
    /// The server call is best effort and goes out without renewal; local
    /// storage is cleared regardless of how it ends.
    pub async fn logout(&self) -> GatewayResult<()> {
        if let Some(token) = self.gateway.store().access_token() {
            let request = ApiRequest::post("/auth/logout").public().with_bearer(Some(token));
            if let Err(e) = self.gateway.dispatch(request).await {
                tracing::debug!("Ignoring logout failure: {}", e);
            }
        }

        self.gateway.store().clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    fn install(&self, session: AuthSession) -> GatewayResult<SessionUser> {
        self.gateway
            .store()
            .save_session(session.tokens, session.user.clone())?;
        Ok(session.user)
    }
}
