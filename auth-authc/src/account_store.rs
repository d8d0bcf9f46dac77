use crate::error::StoreError;
use async_trait::async_trait;
use auth_identity::{Account, AuthorizationInfo, Credentials, Identifier};
use dashmap::DashMap;
use std::sync::Arc;

/// Backing store a realm resolves accounts from (SQL, LDAP, ...).
///
/// Returned accounts carry their fragments under the store's own source name;
/// the realm re-keys them under its name. `Ok(None)` means the identifier is
/// unknown.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Account holding the stored credentials for `identifier`
    async fn lookup_credentials(&self, identifier: &Identifier)
        -> Result<Option<Account>, StoreError>;

    /// Account holding the roles and permissions granted to `identifier`
    async fn lookup_authorization(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Account>, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredAccount {
    credentials: Credentials,
    authz_info: AuthorizationInfo,
}

/// In-memory account store implementation
#[derive(Clone)]
pub struct InMemoryAccountStore {
    source_name: String,
    accounts: Arc<DashMap<Identifier, StoredAccount>>,
}

impl InMemoryAccountStore {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            accounts: Arc::new(DashMap::new()),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn insert_account(
        &self,
        identifier: impl Into<Identifier>,
        credentials: Credentials,
        authz_info: AuthorizationInfo,
    ) {
        self.accounts.insert(
            identifier.into(),
            StoredAccount {
                credentials,
                authz_info,
            },
        );
    }

    pub fn remove_account(&self, identifier: &Identifier) -> bool {
        self.accounts.remove(identifier).is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn account_for(&self, identifier: &Identifier) -> Result<Account, StoreError> {
        Account::for_source(self.source_name.clone(), identifier.clone())
            .map_err(|e| StoreError::Internal(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn lookup_credentials(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Account>, StoreError> {
        let credentials = match self.accounts.get(identifier) {
            Some(stored) => stored.credentials.clone(),
            None => return Ok(None),
        };
        Ok(Some(
            self.account_for(identifier)?
                .with_credentials(self.source_name.clone(), credentials),
        ))
    }

    async fn lookup_authorization(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Account>, StoreError> {
        let authz_info = match self.accounts.get(identifier) {
            Some(stored) => stored.authz_info.clone(),
            None => return Ok(None),
        };
        Ok(Some(
            self.account_for(identifier)?
                .with_authz_info(self.source_name.clone(), authz_info),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_account_store() {
        let store = InMemoryAccountStore::new("sql");
        store.insert_account(
            "thedude",
            Credentials::Secret("abides".into()),
            AuthorizationInfo::new().with_role("bowler"),
        );

        let id = Identifier::from("thedude");
        let account = store.lookup_credentials(&id).await.unwrap().unwrap();
        assert_eq!(
            account.credentials_from("sql"),
            Some(&Credentials::Secret("abides".into()))
        );
        assert!(account.authz_info_from("sql").is_none());

        let account = store.lookup_authorization(&id).await.unwrap().unwrap();
        assert!(account.authz_info_from("sql").unwrap().has_role("bowler"));

        assert!(store.remove_account(&id));
        assert!(store.lookup_credentials(&id).await.unwrap().is_none());
    }
}
