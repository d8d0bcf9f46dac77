//! Realms: identity sources that resolve and verify accounts
//!
//! [`AccountStoreRealm`] reads credentials and authorization info through a
//! cache-aside layer in front of its [`AccountStore`]:
//! - a cache hit is returned without touching the store
//! - a miss queries the store and populates the cache with what it returns
//! - an identifier unknown to the store is reported as absent and never cached
//!
//! Backend failures from either the cache or the store surface as
//! `AuthcError::StoreUnavailable` and are not retried here.

use crate::account_store::AccountStore;
use crate::cache::{Cache, MokaCache};
use crate::config::AuthcConfig;
use crate::error::{AuthcError, RealmFailure, RealmFailureKind, Result};
use crate::matcher::CredentialsMatcher;
use crate::token::AuthenticationToken;
use async_trait::async_trait;
use auth_identity::{Account, AccountFragment, Identifier, IdentifierCollection};
use std::sync::Arc;
use tracing::{debug, warn};

/// An identity source the authenticator can consult.
#[async_trait]
pub trait AuthenticatingRealm: Send + Sync {
    /// Source name under which this realm contributes identifiers
    fn name(&self) -> &str;

    /// Whether this realm can attempt `token` at all
    fn supports(&self, _token: &AuthenticationToken) -> bool {
        true
    }

    /// Resolves and verifies the account behind `token`.
    async fn authenticate_account(
        &self,
        token: &AuthenticationToken,
    ) -> std::result::Result<Account, RealmFailure>;
}

pub struct AccountStoreRealm {
    name: String,
    account_store: Arc<dyn AccountStore>,
    cache: Option<Arc<dyn Cache>>,
    matcher: Arc<dyn CredentialsMatcher>,
}

impl AccountStoreRealm {
    pub fn new(
        name: impl Into<String>,
        account_store: Arc<dyn AccountStore>,
        matcher: Arc<dyn CredentialsMatcher>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuthcError::InvalidArgument(
                "realm name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            account_store,
            cache: None,
            matcher,
        })
    }

    /// Builds a realm whose cache follows `config.cache`: a moka cache when
    /// enabled, none otherwise.
    pub fn from_config(
        name: impl Into<String>,
        account_store: Arc<dyn AccountStore>,
        matcher: Arc<dyn CredentialsMatcher>,
        config: &AuthcConfig,
    ) -> Result<Self> {
        let realm = Self::new(name, account_store, matcher)?;
        if !config.cache.enabled {
            debug!(realm = %realm.name, "Realm cache disabled by configuration");
            return Ok(realm);
        }
        Ok(realm.with_cache(Arc::new(MokaCache::from_config(&config.cache))))
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn credentials_cache_key(&self, identifier: &Identifier) -> String {
        format!("{}:credentials:{}", self.name, identifier)
    }

    pub fn authz_cache_key(&self, identifier: &Identifier) -> String {
        format!("{}:authz_info:{}", self.name, identifier)
    }

    /// Resolves the stored credentials for `identifier`, cache first.
    pub async fn get_credentials(&self, identifier: &Identifier) -> Result<Option<Account>> {
        let key = self.credentials_cache_key(identifier);

        if let Some(cache) = &self.cache {
            if let Some(fragment) = cache.get(&key).await? {
                debug!(realm = %self.name, identifier = %identifier, "Credentials cache hit");
                return Ok(Some(Account::from_fragment(&self.name, identifier, fragment)?));
            }
            debug!(realm = %self.name, identifier = %identifier, "Credentials cache miss");
        }

        let fragment = match self.account_store.lookup_credentials(identifier).await? {
            Some(account) => pick_fragment(
                &self.name,
                &account,
                account.credential_sources(),
                Account::credentials_fragment,
            ),
            None => {
                debug!(realm = %self.name, identifier = %identifier, "No account found for credentials lookup");
                return Ok(None);
            }
        };
        let Some(fragment) = fragment else {
            warn!(realm = %self.name, identifier = %identifier, "Account store returned an account without credentials");
            return Ok(None);
        };

        if let Some(cache) = &self.cache {
            cache.set(&key, fragment.clone()).await?;
        }
        Ok(Some(Account::from_fragment(&self.name, identifier, fragment)?))
    }

    /// Resolves authorization info for a subject.
    ///
    /// The identifier this realm contributed is preferred; otherwise the
    /// collection's primary identifier is used. An empty collection yields
    /// `None` without consulting the cache or the store.
    pub async fn get_authorization_info(
        &self,
        identifiers: &IdentifierCollection,
    ) -> Result<Option<Account>> {
        let identifier = match identifiers
            .from_source(&self.name)
            .or_else(|| identifiers.primary_identifier())
        {
            Some(identifier) => identifier,
            None => {
                debug!(realm = %self.name, "No identifier available for authorization lookup");
                return Ok(None);
            }
        };
        let key = self.authz_cache_key(identifier);

        if let Some(cache) = &self.cache {
            if let Some(fragment) = cache.get(&key).await? {
                debug!(realm = %self.name, identifier = %identifier, "Authorization cache hit");
                return Ok(Some(Account::from_fragment(&self.name, identifier, fragment)?));
            }
            debug!(realm = %self.name, identifier = %identifier, "Authorization cache miss");
        }

        let fragment = match self.account_store.lookup_authorization(identifier).await? {
            Some(account) => pick_fragment(
                &self.name,
                &account,
                account.authz_sources(),
                Account::authz_fragment,
            ),
            None => {
                debug!(realm = %self.name, identifier = %identifier, "No account found for authorization lookup");
                return Ok(None);
            }
        };
        let Some(fragment) = fragment else {
            debug!(realm = %self.name, identifier = %identifier, "Account store returned no authorization info");
            return Ok(None);
        };

        if let Some(cache) = &self.cache {
            cache.set(&key, fragment.clone()).await?;
        }
        Ok(Some(Account::from_fragment(&self.name, identifier, fragment)?))
    }

    /// Drops both cached fragments for `identifier`. Missing entries are fine.
    pub async fn do_clear_cache(&self, identifier: &Identifier) -> Result<()> {
        self.clear_cached_credentials(identifier).await?;
        self.clear_cached_authorization_info(identifier).await
    }

    pub async fn clear_cached_credentials(&self, identifier: &Identifier) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.delete(&self.credentials_cache_key(identifier)).await?;
            debug!(realm = %self.name, identifier = %identifier, "Cleared cached credentials");
        }
        Ok(())
    }

    pub async fn clear_cached_authorization_info(&self, identifier: &Identifier) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.delete(&self.authz_cache_key(identifier)).await?;
            debug!(realm = %self.name, identifier = %identifier, "Cleared cached authorization info");
        }
        Ok(())
    }

    fn failure(&self, kind: RealmFailureKind) -> RealmFailure {
        RealmFailure::new(self.name.clone(), kind)
    }

    fn store_failure(&self, err: AuthcError) -> RealmFailure {
        warn!(realm = %self.name, "Realm backend failed: {}", err);
        self.failure(RealmFailureKind::StoreUnavailable(err.to_string()))
    }
}

/// Fragment a store returned for this realm. Stores may key their accounts
/// under their own source name, so the first source is used when the realm's
/// name is absent.
fn pick_fragment<'a>(
    realm: &str,
    account: &'a Account,
    mut sources: impl Iterator<Item = &'a str>,
    fragment: fn(&Account, &str) -> Option<AccountFragment>,
) -> Option<AccountFragment> {
    fragment(account, realm).or_else(|| sources.next().and_then(|source| fragment(account, source)))
}

#[async_trait]
impl AuthenticatingRealm for AccountStoreRealm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate_account(
        &self,
        token: &AuthenticationToken,
    ) -> std::result::Result<Account, RealmFailure> {
        let mut account = self
            .get_credentials(&token.identifier)
            .await
            .map_err(|e| self.store_failure(e))?
            .ok_or_else(|| self.failure(RealmFailureKind::AccountNotFound))?;

        let matched = account
            .credentials_from(&self.name)
            .map(|stored| self.matcher.matches(token, stored))
            .unwrap_or(false);
        if !matched {
            debug!(realm = %self.name, identifier = %token.identifier, "Submitted credentials did not match");
            return Err(self.failure(RealmFailureKind::CredentialsMismatch));
        }

        if let Some(authz) = self
            .get_authorization_info(account.identifiers())
            .await
            .map_err(|e| self.store_failure(e))?
        {
            account.merge(authz);
        }
        Ok(account)
    }
}
