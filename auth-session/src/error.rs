use crate::models::SessionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("There is no session with id [{0}]")]
    Unknown(SessionId),

    #[error("Session with id [{0}] has been stopped")]
    Stopped(SessionId),

    #[error("Session with id [{0}] has expired")]
    Expired(SessionId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not generate a unique session id after {0} attempts")]
    IdCollision(usize),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SessionError {
    /// True for errors raised by a session that existed but is no longer usable.
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, SessionError::Stopped(_) | SessionError::Expired(_))
    }
}

impl From<config::ConfigError> for SessionError {
    fn from(err: config::ConfigError) -> Self {
        SessionError::Configuration(err.to_string())
    }
}

impl From<auth_identity::IdentityError> for SessionError {
    fn from(err: auth_identity::IdentityError) -> Self {
        match err {
            auth_identity::IdentityError::InvalidArgument(msg) => SessionError::InvalidArgument(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
