use crate::error::Result;
use crate::strategy::AuthenticationStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthcConfig {
    /// Aggregation policy applied across realms (default: at_least_one_successful)
    #[serde(default)]
    pub strategy: AuthenticationStrategy,

    /// Realm cache settings
    #[serde(default)]
    pub cache: RealmCacheConfig,
}

/// Realm-level credentials/authorization cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealmCacheConfig {
    /// Whether realms should be given a cache at all
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entry time-to-live in seconds (default: 300 = 5 minutes)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Maximum number of cached fragments
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_max_entries() -> u64 {
    10_000
}

impl Default for RealmCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

impl RealmCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl AuthcConfig {
    /// Loads an optional config file layered under `AUTHC__*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("AUTHC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthcConfig::default();
        assert_eq!(config.strategy, AuthenticationStrategy::AtLeastOneSuccessful);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.max_entries, 10_000);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AuthcConfig =
            serde_json::from_str(r#"{"strategy":"first_successful","cache":{"ttl_seconds":60}}"#)
                .unwrap();
        assert_eq!(config.strategy, AuthenticationStrategy::FirstSuccessful);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert!(config.cache.enabled);
    }
}
