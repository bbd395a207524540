use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{AuthSignal, GatewayError, GatewayResult};
use crate::gateway::dispatcher::unwrap_envelope;
use crate::gateway::transport::{ApiRequest, Transport};
use crate::session::events::{ForcedLogout, LogoutReason, SessionEventBus};
use crate::session::store::TokenStore;
use crate::types::{RefreshedTokens, TokenPair};

type Waiter = oneshot::Sender<GatewayResult<String>>;

/// In-flight flag and pending queue. Always read and written together.
#[derive(Default)]
struct RenewalState {
    in_flight: bool,
    waiters: Vec<Waiter>,
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<GatewayResult<String>>),
}

/// Single-flight exchange of the refresh token for a new pair.
///
/// The first caller of a failure wave runs the exchange; everyone arriving
/// while it is outstanding waits in arrival order and gets the same outcome.
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    events: SessionEventBus,
    refresh_path: String,
    timeout: Duration,
    state: Mutex<RenewalState>,
    exchanges: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        events: SessionEventBus,
        refresh_path: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            events,
            refresh_path: refresh_path.into(),
            timeout,
            state: Mutex::new(RenewalState::default()),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Obtain a renewed access token, joining an in-flight renewal if there is one
    pub async fn renew(&self) -> GatewayResult<String> {
        let role = {
            let mut state = lock(&self.state);
            self.join_or_lead(&mut state)
        };
        self.run(role).await
    }

    /// Renewal on behalf of a call rejected while carrying `sent_with`.
    ///
    /// The store is compared against `sent_with` under the same lock that
    /// guards the in-flight flag, so a wave that settled while the call was
    /// out is observed instead of starting a second exchange. Returns `None`
    /// when the session was cleared in the meantime.
    pub async fn renew_after_rejection(&self, sent_with: Option<&str>) -> GatewayResult<Option<String>> {
        let role = {
            let mut state = lock(&self.state);
            if state.in_flight {
                self.join_or_lead(&mut state)
            } else {
                match self.store.access_token() {
                    Some(current) if Some(current.as_str()) != sent_with => {
                        tracing::debug!("Rejected call carried a superseded token");
                        return Ok(Some(current));
                    }
                    None if sent_with.is_some() => {
                        tracing::debug!("Session ended while the rejected call was out");
                        return Ok(None);
                    }
                    _ => self.join_or_lead(&mut state),
                }
            }
        };
        self.run(role).await.map(Some)
    }

    fn join_or_lead(&self, state: &mut RenewalState) -> Role {
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            tracing::debug!("Renewal in flight, queued caller #{}", state.waiters.len());
            Role::Follower(rx)
        } else {
            state.in_flight = true;
            Role::Leader
        }
    }

    async fn run(&self, role: Role) -> GatewayResult<String> {
        match role {
            Role::Follower(rx) => rx.await.unwrap_or(Err(GatewayError::RenewalAbandoned)),
            Role::Leader => {
                let flight = InFlight {
                    state: &self.state,
                    released: false,
                };

                match self.exchange().await {
                    Ok(tokens) => {
                        let access = tokens.access_token.clone();
                        if let Err(e) = self.store.replace_tokens(tokens) {
                            tracing::warn!("Renewed tokens could not be persisted: {}", e);
                        }
                        tracing::info!("Access token renewed");
                        flight.release(Ok(access.clone()));
                        Ok(access)
                    }
                    Err(reason) => {
                        let event = ForcedLogout::new(reason);
                        self.clear_store();
                        flight.release(Err(GatewayError::SessionEnded(event.clone())));
                        self.events.publish(&event);
                        Err(GatewayError::SessionEnded(event))
                    }
                }
            }
        }
    }

    /// End the session without trying to renew it
    pub fn force_logout(&self, reason: LogoutReason) -> ForcedLogout {
        let event = ForcedLogout::new(reason);
        self.clear_store();
        self.events.publish(&event);
        event
    }

    /// Number of renewal requests actually sent to the server
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.state).in_flight
    }

    /// Clear the session, trying once more if the first attempt fails so
    /// stale tokens are not left for the next run
    fn clear_store(&self) {
        if let Err(first) = self.store.clear() {
            tracing::warn!("Failed to clear session storage, retrying: {}", first);
            if let Err(e) = self.store.clear() {
                tracing::error!("Session storage still holds tokens after logout: {}", e);
            }
        }
    }

    /// The renewal call itself. Goes straight to the transport, so a 401 here
    /// can never re-enter the coordinator.
    async fn exchange(&self) -> Result<TokenPair, LogoutReason> {
        let refresh_token = match self.store.refresh_token() {
            Some(token) => token,
            None => {
                tracing::info!("No refresh token stored, skipping renewal");
                return Err(LogoutReason::RefreshFailed);
            }
        };

        let request = ApiRequest::post(self.refresh_path.clone())
            .public()
            .with_body(json!({ "refreshToken": refresh_token }));

        self.exchanges.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Exchanging refresh token at {}", self.refresh_path);

        let response = match tokio::time::timeout(self.timeout, self.transport.send(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!("Renewal request failed: {}", e);
                return Err(LogoutReason::RefreshFailed);
            }
            Err(_) => {
                tracing::warn!("Renewal request timed out after {:?}", self.timeout);
                return Err(LogoutReason::RefreshFailed);
            }
        };

        let payload = match unwrap_envelope(response) {
            Ok(payload) => payload,
            Err(e) => {
                let inactive = e
                    .api_failure()
                    .map_or(false, |f| f.signal() == Some(AuthSignal::SessionInactive));
                tracing::warn!("Renewal rejected: {}", e);
                return Err(if inactive {
                    LogoutReason::Inactivity
                } else {
                    LogoutReason::RefreshFailed
                });
            }
        };

        match serde_json::from_value::<RefreshedTokens>(payload) {
            Ok(refreshed) => Ok(refreshed.tokens),
            Err(e) => {
                tracing::warn!("Renewal response had no token pair: {}", e);
                Err(LogoutReason::RefreshFailed)
            }
        }
    }
}

/// Owns the in-flight flag for the leader.
///
/// Dropping it without `release` (leader cancelled mid-exchange) still clears
/// the flag and fails every queued caller.
struct InFlight<'a> {
    state: &'a Mutex<RenewalState>,
    released: bool,
}

impl InFlight<'_> {
    fn release(mut self, outcome: GatewayResult<String>) {
        self.released = true;
        drain(self.state, outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Renewal leader dropped before the exchange settled");
            drain(self.state, Err(GatewayError::RenewalAbandoned));
        }
    }
}

/// Clear the flag and hand `outcome` to every waiter, in enqueue order
fn drain(state: &Mutex<RenewalState>, outcome: GatewayResult<String>) {
    let waiters = {
        let mut state = lock(state);
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    };

    if !waiters.is_empty() {
        tracing::debug!("Releasing {} queued caller(s)", waiters.len());
    }

    for waiter in waiters {
        // A waiter whose caller went away is simply skipped
        let _ = waiter.send(outcome.clone());
    }
}

fn lock(state: &Mutex<RenewalState>) -> MutexGuard<'_, RenewalState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
