//! Session lifecycle management for Gatekeeper
//!
//! Sessions move from `Active` to one of two terminal states: `Stopped` on
//! explicit stop, or `Expired` once an idle or absolute timeout elapses.
//! [`NativeSessionManager`] is the only way hosts reach a session; it checks
//! validity on every access and can run a periodic background sweep.
//!
//! # Example
//!
//! ```rust
//! use auth_session::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<()> {
//! let manager = NativeSessionManager::new(Arc::new(InMemorySessionStore::new()), SessionConfig::default())?;
//!
//! let id = manager.start(SessionContext::new().with_host("10.0.0.7")).await?;
//! let key = SessionKey::from(&id);
//! manager.touch(&key).await?;
//! manager.stop(&key).await?;
//!
//! assert!(manager.get_session(&key).await.unwrap_err().is_invalid_session());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod id_generator;
pub mod listener;
pub mod manager;
pub mod models;
pub mod scheduler;
pub mod store;

pub use config::{SessionConfig, MAX_DURATION_SECS};
pub use context::SessionContext;
pub use error::*;
pub use id_generator::{SessionIdGenerator, UuidSessionIdGenerator};
pub use listener::SessionListener;
pub use manager::NativeSessionManager;
pub use models::{Session, SessionId, SessionKey, SessionState};
pub use scheduler::{SessionValidationScheduler, ValidatingSessionManager};
pub use store::{InMemorySessionStore, SessionStore};
