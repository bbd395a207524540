pub mod dispatcher;
pub mod refresh;
pub mod transport;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::session::events::{ForcedLogout, LogoutReason, SessionEventBus, Subscription};
use crate::session::store::{FileTokenStore, TokenStore};

pub use dispatcher::{unwrap_envelope, Dispatcher};
pub use refresh::RefreshCoordinator;
pub use transport::{ApiRequest, RawResponse, ReqwestTransport, Transport};

/// Authenticated request gateway.
///
/// Attaches the stored access token to every call and, when the server says
/// the token expired, renews it once per failure wave and retries. Terminal
/// failures clear the session and are announced on the event bus.
pub struct Gateway {
    dispatcher: Dispatcher,
    coordinator: RefreshCoordinator,
    store: Arc<dyn TokenStore>,
    events: SessionEventBus,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>, config: &GatewayConfig) -> Self {
        let events = SessionEventBus::new();
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            events.clone(),
            config.auth.refresh_path.clone(),
            config.refresh_timeout(),
        );

        Self {
            dispatcher: Dispatcher::new(transport),
            coordinator,
            store,
            events,
        }
    }

    /// `reqwest` transport plus the on-disk session from the config directory
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let transport = ReqwestTransport::new(config)?;
        let store = FileTokenStore::open(&config.config_dir()?)?;
        Ok(Self::new(Arc::new(transport), Arc::new(store), config))
    }

    /// Send `request`, returning the unwrapped payload
    pub async fn dispatch(&self, request: ApiRequest) -> GatewayResult<Value> {
        let request_id = Uuid::new_v4().to_string();
        let request = request.with_header("X-Request-Id", request_id.clone());

        if request.public {
            return self.dispatcher.send(&request, None).await;
        }

        let sent_with = self.store.access_token();

        let failure = match self.dispatcher.send(&request, sent_with.clone()).await {
            Err(GatewayError::Api(failure)) if failure.is_unauthorized() => failure,
            other => return other,
        };

        if !failure.is_renewable() {
            tracing::warn!(
                "{} [{}] rejected as unauthorized without a renewable code",
                request.describe(),
                request_id
            );
            self.coordinator.force_logout(LogoutReason::Unauthorized);
            return Err(GatewayError::Api(failure));
        }

        // Another wave may have renewed or ended the session while this call was out
        let token = match self.coordinator.renew_after_rejection(sent_with.as_deref()).await? {
            Some(token) => token,
            None => return Err(GatewayError::Api(failure)),
        };

        tracing::debug!("{} [{}] retrying with renewed token", request.describe(), request_id);

        // One retry only. A renewable 401 goes back as-is; a permanent one
        // still ends the session.
        match self.dispatcher.send(&request, Some(token)).await {
            Err(GatewayError::Api(failure)) if failure.is_unauthorized() && !failure.is_renewable() => {
                tracing::warn!(
                    "{} [{}] retry rejected as unauthorized without a renewable code",
                    request.describe(),
                    request_id
                );
                self.coordinator.force_logout(LogoutReason::Unauthorized);
                Err(GatewayError::Api(failure))
            }
            other => other,
        }
    }

    /// Dispatch and deserialize the payload into `T`
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> GatewayResult<T> {
        let payload = self.dispatch(request).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Register for forced-logout notifications
    pub fn on_forced_logout<F>(&self, subscriber: F) -> Subscription
    where
        F: Fn(&ForcedLogout) + Send + Sync + 'static,
    {
        self.events.subscribe(subscriber)
    }

    /// Renew the token pair now, sharing any renewal already in flight
    pub async fn renew(&self) -> GatewayResult<String> {
        self.coordinator.renew().await
    }

    /// End the session from outside (inactivity timer, admin action)
    pub fn force_logout(&self, reason: LogoutReason) -> ForcedLogout {
        self.coordinator.force_logout(reason)
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn events(&self) -> &SessionEventBus {
        &self.events
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }
}
