use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Why the session was ended without the user asking for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    Inactivity,
    RefreshFailed,
    Unauthorized,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::Inactivity => "inactivity",
            LogoutReason::RefreshFailed => "refresh_failed",
            LogoutReason::Unauthorized => "unauthorized",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LogoutReason::Inactivity => "Your session expired due to inactivity. Please sign in again.",
            LogoutReason::RefreshFailed => "Your session could not be renewed. Please sign in again.",
            LogoutReason::Unauthorized => "You are not authorized to continue. Please sign in again.",
        }
    }
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedLogout {
    pub reason: LogoutReason,
    pub message: String,
}

impl ForcedLogout {
    pub fn new(reason: LogoutReason) -> Self {
        Self {
            reason,
            message: reason.message().to_string(),
        }
    }
}

type Subscriber = Arc<dyn Fn(&ForcedLogout) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Subscriber)>>,
}

impl Registry {
    fn remove(&self, id: u64) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|(sid, _)| *sid != id);
        }
    }
}

/// In-process fan-out of forced-logout events
#[derive(Clone, Default)]
pub struct SessionEventBus {
    registry: Arc<Registry>,
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. It stays registered until the returned
    /// `Subscription` is dropped or `unsubscribe`d.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, subscriber: F) -> Subscription
    where
        F: Fn(&ForcedLogout) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subscribers) = self.registry.subscribers.lock() {
            subscribers.push((id, Arc::new(subscriber)));
        }

        tracing::debug!("Registered forced-logout subscriber {}", id);

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every current subscriber, synchronously.
    ///
    /// Subscribers run outside the registry lock, so they may subscribe or
    /// unsubscribe from inside the callback.
    pub fn publish(&self, event: &ForcedLogout) {
        let snapshot: Vec<Subscriber> = match self.registry.subscribers.lock() {
            Ok(subscribers) => subscribers.iter().map(|(_, s)| Arc::clone(s)).collect(),
            Err(_) => return,
        };

        tracing::warn!(
            "Forced logout ({}), notifying {} subscriber(s)",
            event.reason,
            snapshot.len()
        );

        for subscriber in snapshot {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Disposer returned by [`SessionEventBus::subscribe`]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
