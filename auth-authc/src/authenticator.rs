use crate::config::AuthcConfig;
use crate::error::{AuthcError, Result};
use crate::realm::AuthenticatingRealm;
use crate::strategy::AuthenticationStrategy;
use crate::token::AuthenticationToken;
use auth_identity::Account;
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point for authenticating a token against the configured realms.
pub struct ModularRealmAuthenticator {
    realms: Vec<Arc<dyn AuthenticatingRealm>>,
    strategy: AuthenticationStrategy,
}

impl ModularRealmAuthenticator {
    pub fn new(
        realms: Vec<Arc<dyn AuthenticatingRealm>>,
        strategy: AuthenticationStrategy,
    ) -> Result<Self> {
        if realms.is_empty() {
            return Err(AuthcError::Realmless);
        }
        Ok(Self { realms, strategy })
    }

    pub fn from_config(
        realms: Vec<Arc<dyn AuthenticatingRealm>>,
        config: &AuthcConfig,
    ) -> Result<Self> {
        Self::new(realms, config.strategy)
    }

    pub fn realms(&self) -> &[Arc<dyn AuthenticatingRealm>] {
        &self.realms
    }

    pub fn strategy(&self) -> AuthenticationStrategy {
        self.strategy
    }

    /// Authenticates `token`, returning the merged account on success.
    ///
    /// Preconditions are checked before any realm is queried.
    pub async fn authenticate_account(&self, token: &AuthenticationToken) -> Result<Account> {
        if self.realms.is_empty() {
            return Err(AuthcError::Realmless);
        }
        if token.identifier.is_empty() {
            return Err(AuthcError::InvalidArgument(
                "authentication token has no identifier".to_string(),
            ));
        }

        match self.strategy.authenticate(&self.realms, token).await {
            Ok(account) => {
                info!(
                    identifier = %token.identifier,
                    strategy = %self.strategy,
                    sources = ?account.identifiers().source_names(),
                    "Authentication successful"
                );
                Ok(account)
            }
            Err(e) => {
                warn!(identifier = %token.identifier, strategy = %self.strategy, "Authentication failed: {}", e);
                Err(e)
            }
        }
    }
}
