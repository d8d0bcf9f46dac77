//! Cache ports used by realms for credentials and authorization fragments

use crate::config::RealmCacheConfig;
use crate::error::StoreError;
use async_trait::async_trait;
use auth_identity::AccountFragment;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Key/value cache a realm reads through.
///
/// Deleting a key that is not present succeeds.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<AccountFragment>, StoreError>;

    async fn set(&self, key: &str, value: AccountFragment) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Unbounded cache backed by a concurrent map; entries live until deleted.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<DashMap<String, AccountFragment>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<AccountFragment>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: AccountFragment) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Bounded cache with per-entry time-to-live.
#[derive(Clone)]
pub struct MokaCache {
    cache: moka::future::Cache<String, AccountFragment>,
    ttl: Duration,
}

impl MokaCache {
    pub fn new(ttl_seconds: u64, max_entries: u64) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();

        Self {
            cache,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub fn from_config(config: &RealmCacheConfig) -> Self {
        Self::new(config.ttl_seconds, config.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl Cache for MokaCache {
    async fn get(&self, key: &str) -> Result<Option<AccountFragment>, StoreError> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &str, value: AccountFragment) -> Result<(), StoreError> {
        self.cache.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}
