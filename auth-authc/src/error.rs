use auth_identity::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by an account store or cache backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal store error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Why a single realm did not produce an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RealmFailureKind {
    AccountNotFound,
    CredentialsMismatch,
    StoreUnavailable(String),
    UnsupportedToken,
}

/// Per-realm failure recorded by an authentication strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmFailure {
    pub realm: String,
    pub kind: RealmFailureKind,
}

impl RealmFailure {
    pub fn new(realm: impl Into<String>, kind: RealmFailureKind) -> Self {
        Self {
            realm: realm.into(),
            kind,
        }
    }
}

impl fmt::Display for RealmFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RealmFailureKind::AccountNotFound => write!(f, "{}: account not found", self.realm),
            RealmFailureKind::CredentialsMismatch => {
                write!(f, "{}: credentials mismatch", self.realm)
            }
            RealmFailureKind::StoreUnavailable(reason) => {
                write!(f, "{}: store unavailable ({})", self.realm, reason)
            }
            RealmFailureKind::UnsupportedToken => write!(f, "{}: unsupported token", self.realm),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthcError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("No realms configured; authentication cannot be attempted")]
    Realmless,

    #[error("Authentication failed: {}", format_failures(.failures))]
    AuthenticationFailed { failures: Vec<RealmFailure> },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthcError {
    /// Per-realm failures attached to an overall authentication failure.
    pub fn failures(&self) -> &[RealmFailure] {
        match self {
            AuthcError::AuthenticationFailed { failures } => failures,
            _ => &[],
        }
    }
}

impl From<IdentityError> for AuthcError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidArgument(msg) => AuthcError::InvalidArgument(msg),
        }
    }
}

impl From<config::ConfigError> for AuthcError {
    fn from(err: config::ConfigError) -> Self {
        AuthcError::Configuration(err.to_string())
    }
}

fn format_failures(failures: &[RealmFailure]) -> String {
    if failures.is_empty() {
        return "no realm succeeded".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, AuthcError>;
