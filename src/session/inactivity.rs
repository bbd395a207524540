use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::config::SessionConfig;
use crate::gateway::Gateway;
use crate::session::events::LogoutReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Warning { remaining: Duration },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactivityEvent {
    Warning { remaining: Duration },
    Expired,
}

/// Idle bookkeeping, driven by explicit timestamps.
///
/// Once the warning is showing, plain activity no longer counts; only
/// `extend` brings the session back.
#[derive(Debug)]
pub struct IdleTracker {
    idle_timeout: Duration,
    grace_period: Duration,
    last_activity: Instant,
    warned_at: Option<Instant>,
    expired: bool,
}

impl IdleTracker {
    pub fn new(idle_timeout: Duration, grace_period: Duration, now: Instant) -> Self {
        Self {
            idle_timeout,
            grace_period,
            last_activity: now,
            warned_at: None,
            expired: false,
        }
    }

    pub fn record_activity(&mut self, now: Instant) {
        if self.warned_at.is_none() && !self.expired {
            self.last_activity = now;
        }
    }

    pub fn extend(&mut self, now: Instant) {
        if !self.expired {
            self.last_activity = now;
            self.warned_at = None;
        }
    }

    pub fn poll(&mut self, now: Instant) -> IdleState {
        if self.expired {
            return IdleState::Expired;
        }

        if self.warned_at.is_none() {
            let warn_at = self.last_activity + self.idle_timeout;
            if now < warn_at {
                return IdleState::Active;
            }
            self.warned_at = Some(warn_at);
        }

        let warned_at = self.warned_at.unwrap_or(now);
        let elapsed = now.saturating_duration_since(warned_at);

        if elapsed >= self.grace_period {
            self.expired = true;
            IdleState::Expired
        } else {
            IdleState::Warning {
                remaining: self.grace_period - elapsed,
            }
        }
    }
}

/// Background driver around [`IdleTracker`].
///
/// Reports a warning on every tick while counting down and `Expired` once,
/// then stops.
pub struct InactivityTimer {
    tracker: Arc<Mutex<IdleTracker>>,
    task: JoinHandle<()>,
}

impl InactivityTimer {
    pub fn start<F>(idle_timeout: Duration, grace_period: Duration, tick: Duration, on_event: F) -> Self
    where
        F: Fn(InactivityEvent) + Send + Sync + 'static,
    {
        let tracker = Arc::new(Mutex::new(IdleTracker::new(idle_timeout, grace_period, Instant::now())));

        let task = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;
                    let state = lock(&tracker).poll(Instant::now());
                    match state {
                        IdleState::Active => {}
                        IdleState::Warning { remaining } => {
                            on_event(InactivityEvent::Warning { remaining });
                        }
                        IdleState::Expired => {
                            on_event(InactivityEvent::Expired);
                            break;
                        }
                    }
                }
            })
        };

        Self { tracker, task }
    }

    pub fn from_config<F>(config: &SessionConfig, on_event: F) -> Self
    where
        F: Fn(InactivityEvent) + Send + Sync + 'static,
    {
        Self::start(
            Duration::from_secs(config.idle_timeout_secs),
            Duration::from_secs(config.idle_grace_secs),
            Duration::from_secs(config.idle_tick_secs.max(1)),
            on_event,
        )
    }

    /// Watch `gateway`'s session and force an `inactivity` logout on expiry
    pub fn watch_gateway(gateway: Arc<Gateway>, config: &SessionConfig) -> Self {
        Self::from_config(config, move |event| match event {
            InactivityEvent::Warning { remaining } => {
                tracing::info!("Session idle, logging out in {}s unless extended", remaining.as_secs());
            }
            InactivityEvent::Expired => {
                gateway.force_logout(LogoutReason::Inactivity);
            }
        })
    }

    pub fn touch(&self) {
        lock(&self.tracker).record_activity(Instant::now());
    }

    pub fn extend(&self) {
        lock(&self.tracker).extend(Instant::now());
    }

    pub fn state(&self) -> IdleState {
        lock(&self.tracker).poll(Instant::now())
    }

    pub fn stop(self) {
        // Drop aborts the task
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock(tracker: &Mutex<IdleTracker>) -> MutexGuard<'_, IdleTracker> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
