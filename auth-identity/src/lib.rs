//! Identity model shared by the Gatekeeper authentication and session crates
//!
//! This module provides:
//! - Identifier collections keyed by the source (realm) that resolved them
//! - Accounts carrying per-source credentials and authorization info
//! - A string-keyed context carrier used when creating sessions
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{Account, AuthorizationInfo, IdentifierCollection};
//!
//! let mut identifiers = IdentifierCollection::new();
//! identifiers.add("sql", "thedude").unwrap();
//! identifiers.add("ldap", "cn=thedude").unwrap();
//! assert_eq!(identifiers.primary_identifier().unwrap().as_str(), "thedude");
//!
//! let account = Account::new(identifiers)
//!     .with_authz_info("sql", AuthorizationInfo::new().with_role("bowler"));
//! assert!(account.authorization_info().has_role("bowler"));
//! ```

pub mod account;
pub mod context;
pub mod error;
pub mod identifier;

pub use account::{Account, AccountFragment, AuthorizationInfo, Credentials};
pub use context::MapContext;
pub use error::*;
pub use identifier::{Identifier, IdentifierCollection};
