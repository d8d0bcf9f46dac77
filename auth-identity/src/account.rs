use crate::error::Result;
use crate::identifier::{Identifier, IdentifierCollection};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stored credentials as a realm's account store returns them.
///
/// The variant tells a credentials matcher how to compare a supplied secret;
/// the payload is never interpreted by the identity model itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Credentials {
    /// PHC-formatted password hash (argon2, ...)
    PasswordHash(String),
    /// Plain shared secret (API keys, test fixtures)
    Secret(String),
    /// Realm-defined payload
    Opaque(serde_json::Value),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::PasswordHash(_) => f.write_str("Credentials::PasswordHash(<redacted>)"),
            Credentials::Secret(_) => f.write_str("Credentials::Secret(<redacted>)"),
            Credentials::Opaque(_) => f.write_str("Credentials::Opaque(<redacted>)"),
        }
    }
}

/// Roles and permissions granted to a subject by one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationInfo {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl AuthorizationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_permitted(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn merge(&mut self, other: &AuthorizationInfo) {
        self.roles.extend(other.roles.iter().cloned());
        self.permissions.extend(other.permissions.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}

/// One half of an account as it is cached by a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountFragment {
    Credentials { credentials: Credentials },
    Authorization { authz_info: AuthorizationInfo },
}

/// Resolved identity of a subject from one or more sources.
///
/// Credentials and authorization info are kept per source so that merging the
/// accounts of several realms accumulates their fragments instead of letting
/// one realm overwrite another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    identifiers: IdentifierCollection,
    credentials: BTreeMap<String, Credentials>,
    authz_info: BTreeMap<String, AuthorizationInfo>,
}

impl Account {
    pub fn new(identifiers: IdentifierCollection) -> Self {
        Self {
            identifiers,
            ..Self::default()
        }
    }

    /// Single-source account seeded with one identifier.
    pub fn for_source(
        source_name: impl Into<String>,
        identifier: impl Into<Identifier>,
    ) -> Result<Self> {
        Ok(Self::new(IdentifierCollection::with_identifier(
            source_name,
            identifier,
        )?))
    }

    /// Rebuilds an account around a cached fragment.
    pub fn from_fragment(
        source_name: &str,
        identifier: &Identifier,
        fragment: AccountFragment,
    ) -> Result<Self> {
        let account = Self::for_source(source_name, identifier.clone())?;
        Ok(match fragment {
            AccountFragment::Credentials { credentials } => {
                account.with_credentials(source_name, credentials)
            }
            AccountFragment::Authorization { authz_info } => {
                account.with_authz_info(source_name, authz_info)
            }
        })
    }

    pub fn with_credentials(mut self, source_name: impl Into<String>, credentials: Credentials) -> Self {
        self.credentials.insert(source_name.into(), credentials);
        self
    }

    pub fn with_authz_info(
        mut self,
        source_name: impl Into<String>,
        authz_info: AuthorizationInfo,
    ) -> Self {
        self.authz_info.insert(source_name.into(), authz_info);
        self
    }

    pub fn identifiers(&self) -> &IdentifierCollection {
        &self.identifiers
    }

    pub fn credentials_from(&self, source_name: &str) -> Option<&Credentials> {
        self.credentials.get(source_name)
    }

    pub fn authz_info_from(&self, source_name: &str) -> Option<&AuthorizationInfo> {
        self.authz_info.get(source_name)
    }

    /// Extracts the fragment a realm caches for the credentials lookup.
    pub fn credentials_fragment(&self, source_name: &str) -> Option<AccountFragment> {
        self.credentials_from(source_name)
            .map(|credentials| AccountFragment::Credentials {
                credentials: credentials.clone(),
            })
    }

    /// Extracts the fragment a realm caches for the authorization lookup.
    pub fn authz_fragment(&self, source_name: &str) -> Option<AccountFragment> {
        self.authz_info_from(source_name)
            .map(|authz_info| AccountFragment::Authorization {
                authz_info: authz_info.clone(),
            })
    }

    /// Union of the authorization info of every contributing source.
    pub fn authorization_info(&self) -> AuthorizationInfo {
        let mut combined = AuthorizationInfo::new();
        for info in self.authz_info.values() {
            combined.merge(info);
        }
        combined
    }

    pub fn credential_sources(&self) -> impl Iterator<Item = &str> {
        self.credentials.keys().map(String::as_str)
    }

    pub fn authz_sources(&self) -> impl Iterator<Item = &str> {
        self.authz_info.keys().map(String::as_str)
    }

    /// Folds another account into this one.
    ///
    /// Identifiers are merged by source name. Fragments already present for a
    /// source are kept; authorization info for the same source is unioned.
    pub fn merge(&mut self, other: Account) {
        self.identifiers.add_collection(&other.identifiers);
        for (source, credentials) in other.credentials {
            self.credentials.entry(source).or_insert(credentials);
        }
        for (source, info) in other.authz_info {
            self.authz_info
                .entry(source)
                .and_modify(|existing| existing.merge(&info))
                .or_insert(info);
        }
    }
}
