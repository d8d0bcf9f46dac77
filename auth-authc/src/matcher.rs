use crate::error::{AuthcError, Result};
use crate::token::AuthenticationToken;
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use auth_identity::Credentials;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Decides whether a token's supplied credentials match what the store holds.
pub trait CredentialsMatcher: Send + Sync {
    fn matches(&self, token: &AuthenticationToken, stored: &Credentials) -> bool;
}

/// Byte equality against plain stored secrets, in constant time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleCredentialsMatcher;

impl CredentialsMatcher for SimpleCredentialsMatcher {
    fn matches(&self, token: &AuthenticationToken, stored: &Credentials) -> bool {
        match stored {
            Credentials::Secret(secret) => token
                .credentials
                .as_bytes()
                .ct_eq(secret.as_bytes())
                .into(),
            _ => false,
        }
    }
}

/// Verifies supplied passwords against argon2 PHC hashes.
#[derive(Clone, Default)]
pub struct PasswordMatcher {
    argon2: Argon2<'static>,
}

impl PasswordMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces a PHC string suitable for `Credentials::PasswordHash`.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthcError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
            .to_string();
        Ok(password_hash)
    }

    fn verify_password(&self, password: &[u8], hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash could not be parsed: {}", e);
                return false;
            }
        };
        self.argon2.verify_password(password, &parsed_hash).is_ok()
    }
}

impl CredentialsMatcher for PasswordMatcher {
    fn matches(&self, token: &AuthenticationToken, stored: &Credentials) -> bool {
        match stored {
            Credentials::PasswordHash(hash) => {
                self.verify_password(token.credentials.as_bytes(), hash)
            }
            _ => false,
        }
    }
}
