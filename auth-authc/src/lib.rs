//! Realm-backed authentication for Gatekeeper
//!
//! This module provides:
//! - Ports for account stores, caches and credential matchers, with
//!   in-memory, moka and argon2 implementations
//! - `AccountStoreRealm`, a cache-aside realm over an account store
//! - Three multi-realm aggregation strategies
//! - `ModularRealmAuthenticator`, the single entry point hosts call
//!
//! # Example
//!
//! ```rust
//! use auth_authc::*;
//! use auth_identity::{AuthorizationInfo, Credentials};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<()> {
//! let store = InMemoryAccountStore::new("sql");
//! store.insert_account("thedude", Credentials::Secret("abides".into()), AuthorizationInfo::new());
//!
//! let realm = AccountStoreRealm::new("sql", Arc::new(store), Arc::new(SimpleCredentialsMatcher))?
//!     .with_cache(Arc::new(InMemoryCache::new()));
//! let realm: Arc<dyn AuthenticatingRealm> = Arc::new(realm);
//! let authenticator = ModularRealmAuthenticator::new(
//!     vec![realm],
//!     AuthenticationStrategy::FirstSuccessful,
//! )?;
//!
//! let token = AuthenticationToken::username_password("thedude", "abides");
//! let account = authenticator.authenticate_account(&token).await?;
//! assert_eq!(account.identifiers().primary_identifier().unwrap().as_str(), "thedude");
//! # Ok(())
//! # }
//! ```

pub mod account_store;
pub mod authenticator;
pub mod cache;
pub mod config;
pub mod error;
pub mod matcher;
pub mod realm;
pub mod strategy;
pub mod token;

pub use account_store::{AccountStore, InMemoryAccountStore};
pub use authenticator::ModularRealmAuthenticator;
pub use cache::{Cache, InMemoryCache, MokaCache};
pub use config::{AuthcConfig, RealmCacheConfig};
pub use error::*;
pub use matcher::{CredentialsMatcher, PasswordMatcher, SimpleCredentialsMatcher};
pub use realm::{AccountStoreRealm, AuthenticatingRealm};
pub use strategy::AuthenticationStrategy;
pub use token::{AuthenticationToken, SuppliedCredentials};
