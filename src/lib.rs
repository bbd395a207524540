pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod types;

pub use error::{ApiFailure, AuthSignal, ErrorKind, GatewayError, GatewayResult};
pub use gateway::{ApiRequest, Gateway, ReqwestTransport, Transport};
pub use session::{FileTokenStore, ForcedLogout, LogoutReason, MemoryTokenStore, SessionEventBus, TokenStore};

#[cfg(test)]
pub mod testing;
