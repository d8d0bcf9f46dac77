use crate::error::{IdentityError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Opaque value identifying a subject within one source (username, user id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifiers of one subject, keyed by the source (realm) that contributed them.
///
/// Each source holds exactly one identifier; adding under an existing source
/// replaces the previous value in place. Sources keep their insertion order.
///
/// The primary identifier is resolved lazily as the identifier of the first
/// inserted source and cached on first read. Once cached it does not move,
/// even if that source is later overwritten or new sources are added; only
/// [`IdentifierCollection::clear`] resets it. Callers that need a specific
/// source's identifier should use [`IdentifierCollection::from_source`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierCollection {
    source_identifiers: SmallVec<[(String, Identifier); 2]>,
    #[serde(skip)]
    primary: OnceLock<Identifier>,
}

impl IdentifierCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding a single source's identifier.
    pub fn with_identifier(
        source_name: impl Into<String>,
        identifier: impl Into<Identifier>,
    ) -> Result<Self> {
        let mut collection = Self::new();
        collection.add(source_name, identifier)?;
        Ok(collection)
    }

    pub fn add(
        &mut self,
        source_name: impl Into<String>,
        identifier: impl Into<Identifier>,
    ) -> Result<()> {
        let source_name = source_name.into();
        if source_name.trim().is_empty() {
            return Err(IdentityError::InvalidArgument(
                "source name must not be empty".to_string(),
            ));
        }
        self.insert(source_name, identifier.into());
        Ok(())
    }

    /// Merges `other` into this collection; `other` wins on source collisions.
    pub fn add_collection(&mut self, other: &IdentifierCollection) {
        for (source, identifier) in &other.source_identifiers {
            self.insert(source.clone(), identifier.clone());
        }
    }

    pub fn from_source(&self, source_name: &str) -> Option<&Identifier> {
        self.source_identifiers
            .iter()
            .find(|(source, _)| source == source_name)
            .map(|(_, identifier)| identifier)
    }

    pub fn primary_identifier(&self) -> Option<&Identifier> {
        if let Some(primary) = self.primary.get() {
            return Some(primary);
        }
        match self.source_identifiers.first() {
            Some((_, first)) => Some(self.primary.get_or_init(|| first.clone())),
            None => {
                warn!("Could not resolve a primary identifier from an empty collection");
                None
            }
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.source_identifiers
            .iter()
            .map(|(source, _)| source.as_str())
            .collect()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.source_identifiers.iter().map(|(_, identifier)| identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Identifier)> {
        self.source_identifiers
            .iter()
            .map(|(source, identifier)| (source.as_str(), identifier))
    }

    pub fn contains_source(&self, source_name: &str) -> bool {
        self.from_source(source_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.source_identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_identifiers.is_empty()
    }

    pub fn clear(&mut self) {
        self.source_identifiers.clear();
        self.primary = OnceLock::new();
    }

    fn insert(&mut self, source_name: String, identifier: Identifier) {
        match self
            .source_identifiers
            .iter_mut()
            .find(|(source, _)| *source == source_name)
        {
            Some(entry) => entry.1 = identifier,
            None => self.source_identifiers.push((source_name, identifier)),
        }
    }
}

impl PartialEq for IdentifierCollection {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(source, identifier)| other.from_source(source) == Some(identifier))
    }
}

impl Eq for IdentifierCollection {}

impl fmt::Display for IdentifierCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .iter()
            .map(|(source, identifier)| format!("{}={}", source, identifier))
            .collect();
        write!(f, "IdentifierCollection({})", pairs.join(","))
    }
}
