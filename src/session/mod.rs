pub mod events;
pub mod inactivity;
pub mod store;

pub use events::{ForcedLogout, LogoutReason, SessionEventBus, Subscription};
pub use inactivity::{IdleState, IdleTracker, InactivityEvent, InactivityTimer};
pub use store::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};
