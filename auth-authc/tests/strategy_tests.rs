//! Integration tests for multi-realm authentication
//!
//! Each realm is backed by its own in-memory store wrapped in a call counter:
//! 1. FirstSuccessful stops querying once a realm succeeds
//! 2. AtLeastOneSuccessful merges the accounts of every succeeding realm
//! 3. AllSuccessful fails as soon as one realm fails
//! 4. The authenticator validates its inputs before querying realms

use async_trait::async_trait;
use auth_authc::*;
use auth_identity::{Account, AuthorizationInfo, Credentials, Identifier};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingStore {
    inner: InMemoryAccountStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn with_account(source: &str, username: &str, secret: &str, role: &str) -> Arc<Self> {
        let inner = InMemoryAccountStore::new(source);
        inner.insert_account(
            username,
            Credentials::Secret(secret.to_string()),
            AuthorizationInfo::new().with_role(role),
        );
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for CountingStore {
    async fn lookup_credentials(&self, identifier: &Identifier) -> std::result::Result<Option<Account>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_credentials(identifier).await
    }

    async fn lookup_authorization(
        &self,
        identifier: &Identifier,
    ) -> std::result::Result<Option<Account>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_authorization(identifier).await
    }
}

fn realm(name: &str, store: Arc<CountingStore>) -> Arc<dyn AuthenticatingRealm> {
    Arc::new(
        AccountStoreRealm::new(name, store, Arc::new(SimpleCredentialsMatcher))
            .unwrap()
            .with_cache(Arc::new(InMemoryCache::new())),
    )
}

mock! {
    pub Matcher {}
    impl CredentialsMatcher for Matcher {
        fn matches(&self, token: &AuthenticationToken, stored: &Credentials) -> bool;
    }
}

#[tokio::test]
async fn test_first_successful_skips_remaining_realms() {
    let sql = CountingStore::with_account("sql", "thedude", "wrong-secret", "bowler");
    let ldap = CountingStore::with_account("ldap", "thedude", "abides", "achiever");
    let oauth = CountingStore::with_account("oauth", "thedude", "abides", "nihilist");

    let authenticator = ModularRealmAuthenticator::new(
        vec![
            realm("sql", sql.clone()),
            realm("ldap", ldap.clone()),
            realm("oauth", oauth.clone()),
        ],
        AuthenticationStrategy::FirstSuccessful,
    )
    .unwrap();

    let token = AuthenticationToken::username_password("thedude", "abides");
    let account = authenticator.authenticate_account(&token).await.unwrap();

    assert_eq!(account.identifiers().source_names(), vec!["ldap"]);
    assert!(account.authorization_info().has_role("achiever"));
    assert!(sql.calls() > 0, "failing realm before the winner is still queried");
    assert_eq!(oauth.calls(), 0, "realms after the first success must never be queried");
}

#[tokio::test]
async fn test_at_least_one_merges_succeeding_realms_only() {
    let sql = CountingStore::with_account("sql", "thedude", "abides", "bowler");
    let ldap = CountingStore::with_account("ldap", "thedude", "wrong-secret", "achiever");
    let oauth = CountingStore::with_account("oauth", "thedude", "abides", "nihilist");

    let authenticator = ModularRealmAuthenticator::new(
        vec![
            realm("sql", sql.clone()),
            realm("ldap", ldap.clone()),
            realm("oauth", oauth.clone()),
        ],
        AuthenticationStrategy::AtLeastOneSuccessful,
    )
    .unwrap();

    let token = AuthenticationToken::username_password("thedude", "abides");
    let account = authenticator.authenticate_account(&token).await.unwrap();

    let sources = account.identifiers().source_names();
    assert_eq!(sources, vec!["sql", "oauth"]);
    assert!(!account.identifiers().contains_source("ldap"));

    let authz = account.authorization_info();
    assert!(authz.has_role("bowler"));
    assert!(authz.has_role("nihilist"));
    assert!(!authz.has_role("achiever"));
    assert!(oauth.calls() > 0, "every realm is tried");
}

#[tokio::test]
async fn test_all_successful_requires_every_realm() {
    let sql = CountingStore::with_account("sql", "thedude", "abides", "bowler");
    let ldap = CountingStore::with_account("ldap", "thedude", "abides", "achiever");

    let authenticator = ModularRealmAuthenticator::new(
        vec![realm("sql", sql.clone()), realm("ldap", ldap.clone())],
        AuthenticationStrategy::AllSuccessful,
    )
    .unwrap();

    let good = AuthenticationToken::username_password("thedude", "abides");
    let account = authenticator.authenticate_account(&good).await.unwrap();
    assert_eq!(account.identifiers().len(), 2);
    assert_eq!(account.credential_sources().count(), 2);

    let missing = CountingStore::with_account("oauth", "walter", "shomer", "veteran");
    let authenticator = ModularRealmAuthenticator::new(
        vec![realm("sql", sql), realm("oauth", missing), realm("ldap", ldap)],
        AuthenticationStrategy::AllSuccessful,
    )
    .unwrap();

    let err = authenticator.authenticate_account(&good).await.unwrap_err();
    match err {
        AuthcError::AuthenticationFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].realm, "oauth");
            assert_eq!(failures[0].kind, RealmFailureKind::AccountNotFound);
        }
        other => panic!("expected AuthenticationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failure_carries_every_realm_failure() {
    let sql = CountingStore::with_account("sql", "thedude", "abides", "bowler");
    let ldap = CountingStore::with_account("ldap", "walter", "shomer", "veteran");

    let authenticator = ModularRealmAuthenticator::new(
        vec![realm("sql", sql), realm("ldap", ldap)],
        AuthenticationStrategy::AtLeastOneSuccessful,
    )
    .unwrap();

    let token = AuthenticationToken::username_password("thedude", "nihilist");
    let err = authenticator.authenticate_account(&token).await.unwrap_err();

    let kinds: Vec<_> = err.failures().iter().map(|f| f.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![RealmFailureKind::CredentialsMismatch, RealmFailureKind::AccountNotFound]
    );
    assert!(err.to_string().contains("sql: credentials mismatch"));
}

#[tokio::test]
async fn test_empty_identifier_rejected_before_realms_run() {
    let sql = CountingStore::with_account("sql", "thedude", "abides", "bowler");
    let authenticator =
        ModularRealmAuthenticator::new(vec![realm("sql", sql.clone())], AuthenticationStrategy::default())
            .unwrap();

    let token = AuthenticationToken::username_password("", "abides");
    let err = authenticator.authenticate_account(&token).await.unwrap_err();

    assert!(matches!(err, AuthcError::InvalidArgument(_)));
    assert_eq!(sql.calls(), 0);
}

#[tokio::test]
async fn test_realm_consults_matcher_once_per_attempt() {
    let store = CountingStore::with_account("sql", "thedude", "abides", "bowler");

    let mut matcher = MockMatcher::new();
    matcher
        .expect_matches()
        .times(1)
        .returning(|token, stored| {
            token.identifier.as_str() == "thedude" && *stored == Credentials::Secret("abides".into())
        });

    let realm = AccountStoreRealm::new("sql", store, Arc::new(matcher)).unwrap();
    let token = AuthenticationToken::username_password("thedude", "anything");
    let account = realm.authenticate_account(&token).await.unwrap();
    assert!(account.authorization_info().has_role("bowler"));
}

#[tokio::test]
async fn test_from_config_uses_configured_strategy() {
    let config: AuthcConfig = serde_json::from_str(r#"{"strategy":"all_successful"}"#).unwrap();
    let sql = CountingStore::with_account("sql", "thedude", "abides", "bowler");

    let authenticator = ModularRealmAuthenticator::from_config(vec![realm("sql", sql)], &config).unwrap();
    assert_eq!(authenticator.strategy(), AuthenticationStrategy::AllSuccessful);
    assert_eq!(authenticator.realms().len(), 1);
    assert_eq!(authenticator.realms()[0].name(), "sql");
}

#[tokio::test]
async fn test_password_realm_with_moka_cache() {
    let matcher = PasswordMatcher::new();
    let hash = matcher.hash_password("abides").unwrap();

    let store = InMemoryAccountStore::new("sql");
    store.insert_account(
        "thedude",
        Credentials::PasswordHash(hash),
        AuthorizationInfo::new().with_permission("lane:reserve"),
    );

    let realm: Arc<dyn AuthenticatingRealm> = Arc::new(
        AccountStoreRealm::from_config("sql", Arc::new(store), Arc::new(matcher), &AuthcConfig::default())
            .unwrap(),
    );
    let authenticator =
        ModularRealmAuthenticator::new(vec![realm], AuthenticationStrategy::FirstSuccessful).unwrap();

    let token = AuthenticationToken::username_password("thedude", "abides");
    let account = authenticator.authenticate_account(&token).await.unwrap();
    assert!(account.authorization_info().is_permitted("lane:reserve"));

    // served from cache on the second attempt
    let again = authenticator.authenticate_account(&token).await.unwrap();
    assert_eq!(account, again);

    let wrong = AuthenticationToken::username_password("thedude", "nihilist");
    assert!(authenticator.authenticate_account(&wrong).await.is_err());
}
