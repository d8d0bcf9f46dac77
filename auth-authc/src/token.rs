use auth_identity::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Secret material a subject presents at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SuppliedCredentials {
    Password(String),
    Secret(Vec<u8>),
}

impl SuppliedCredentials {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SuppliedCredentials::Password(password) => password.as_bytes(),
            SuppliedCredentials::Secret(bytes) => bytes,
        }
    }
}

impl fmt::Debug for SuppliedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppliedCredentials::Password(_) => f.write_str("Password(<redacted>)"),
            SuppliedCredentials::Secret(_) => f.write_str("Secret(<redacted>)"),
        }
    }
}

/// Login attempt handed to the authenticator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationToken {
    pub identifier: Identifier,
    pub credentials: SuppliedCredentials,
    pub host: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
}

impl AuthenticationToken {
    pub fn new(identifier: impl Into<Identifier>, credentials: SuppliedCredentials) -> Self {
        Self {
            identifier: identifier.into(),
            credentials,
            host: None,
            remember_me: false,
        }
    }

    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(
            Identifier::new(username),
            SuppliedCredentials::Password(password.into()),
        )
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let token = AuthenticationToken::username_password("thedude", "abides").with_host("10.0.0.7");
        let rendered = format!("{:?}", token);
        assert!(rendered.contains("thedude"));
        assert!(rendered.contains("10.0.0.7"));
        assert!(!rendered.contains("abides"));
    }
}
