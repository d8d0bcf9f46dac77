use crate::error::{AuthcError, RealmFailure, RealmFailureKind, Result};
use crate::realm::AuthenticatingRealm;
use crate::token::AuthenticationToken;
use auth_identity::Account;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Policy for folding per-realm outcomes into one authentication result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationStrategy {
    /// Stop at the first realm that succeeds and return its account as-is
    FirstSuccessful,
    /// Try every realm, succeed if any did, merge all successful accounts
    #[default]
    AtLeastOneSuccessful,
    /// Every realm must succeed; the first failure aborts the attempt
    AllSuccessful,
}

impl AuthenticationStrategy {
    pub async fn authenticate(
        &self,
        realms: &[Arc<dyn AuthenticatingRealm>],
        token: &AuthenticationToken,
    ) -> Result<Account> {
        if realms.is_empty() {
            return Err(AuthcError::Realmless);
        }

        let mut merged: Option<Account> = None;
        let mut failures = Vec::new();

        for realm in realms {
            let outcome = if realm.supports(token) {
                realm.authenticate_account(token).await
            } else {
                Err(RealmFailure::new(realm.name(), RealmFailureKind::UnsupportedToken))
            };

            match outcome {
                Ok(account) => {
                    debug!(realm = realm.name(), strategy = ?self, "Realm authenticated token");
                    if *self == AuthenticationStrategy::FirstSuccessful {
                        return Ok(account);
                    }
                    match merged.as_mut() {
                        Some(existing) => existing.merge(account),
                        None => merged = Some(account),
                    }
                }
                Err(failure) => {
                    debug!(realm = realm.name(), strategy = ?self, "Realm rejected token: {}", failure);
                    if *self == AuthenticationStrategy::AllSuccessful {
                        return Err(AuthcError::AuthenticationFailed {
                            failures: vec![failure],
                        });
                    }
                    failures.push(failure);
                }
            }
        }

        merged.ok_or(AuthcError::AuthenticationFailed { failures })
    }
}

impl std::fmt::Display for AuthenticationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthenticationStrategy::FirstSuccessful => "first_successful",
            AuthenticationStrategy::AtLeastOneSuccessful => "at_least_one_successful",
            AuthenticationStrategy::AllSuccessful => "all_successful",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedRealm {
        name: &'static str,
        succeed: bool,
    }

    #[async_trait]
    impl AuthenticatingRealm for FixedRealm {
        fn name(&self) -> &str {
            self.name
        }

        async fn authenticate_account(
            &self,
            token: &AuthenticationToken,
        ) -> std::result::Result<Account, RealmFailure> {
            if self.succeed {
                Ok(Account::for_source(self.name, token.identifier.clone()).unwrap())
            } else {
                Err(RealmFailure::new(self.name, RealmFailureKind::CredentialsMismatch))
            }
        }
    }

    fn realms(outcomes: &[(&'static str, bool)]) -> Vec<Arc<dyn AuthenticatingRealm>> {
        outcomes
            .iter()
            .map(|&(name, succeed)| Arc::new(FixedRealm { name, succeed }) as Arc<dyn AuthenticatingRealm>)
            .collect()
    }

    #[tokio::test]
    async fn test_empty_realms_is_realmless() {
        let token = AuthenticationToken::username_password("thedude", "abides");
        let err = AuthenticationStrategy::FirstSuccessful
            .authenticate(&[], &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthcError::Realmless));
    }

    #[tokio::test]
    async fn test_at_least_one_collects_failures() {
        let token = AuthenticationToken::username_password("thedude", "abides");
        let err = AuthenticationStrategy::AtLeastOneSuccessful
            .authenticate(&realms(&[("sql", false), ("ldap", false)]), &token)
            .await
            .unwrap_err();
        assert_eq!(err.failures().len(), 2);
    }

    #[tokio::test]
    async fn test_all_successful_aborts_on_first_failure() {
        let token = AuthenticationToken::username_password("thedude", "abides");
        let err = AuthenticationStrategy::AllSuccessful
            .authenticate(&realms(&[("sql", true), ("ldap", false), ("oauth", false)]), &token)
            .await
            .unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].realm, "ldap");
    }

    #[test]
    fn test_strategy_serde_names() {
        let parsed: AuthenticationStrategy = serde_json::from_str("\"all_successful\"").unwrap();
        assert_eq!(parsed, AuthenticationStrategy::AllSuccessful);
        assert_eq!(AuthenticationStrategy::default().to_string(), "at_least_one_successful");
    }
}
