use crate::error::{Result, SessionError};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Upper bound for every configured duration (100 years).
pub const MAX_DURATION_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Session management configuration
///
/// Timeouts are in seconds; a negative value disables that expiry axis.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Idle timeout in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: i64,

    /// Absolute timeout in seconds (default: 1800 = 30 minutes)
    #[serde(default = "default_absolute_timeout")]
    pub absolute_timeout_secs: i64,

    /// Run the background validation sweep
    #[serde(default = "default_scheduler_enabled")]
    pub validation_scheduler_enabled: bool,

    /// Seconds between validation sweeps (default: 3600 = 1 hour)
    #[serde(default = "default_validation_interval")]
    pub validation_interval_secs: u64,

    /// How long stopped/expired sessions are kept before the sweep purges them
    #[serde(default = "default_tombstone_retention")]
    pub tombstone_retention_secs: u64,
}

fn default_idle_timeout() -> i64 {
    900
}

fn default_absolute_timeout() -> i64 {
    1800
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_validation_interval() -> u64 {
    3600
}

fn default_tombstone_retention() -> u64 {
    3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            absolute_timeout_secs: default_absolute_timeout(),
            validation_scheduler_enabled: default_scheduler_enabled(),
            validation_interval_secs: default_validation_interval(),
            tombstone_retention_secs: default_tombstone_retention(),
        }
    }
}

impl SessionConfig {
    /// Loads an optional config file layered under `SESSION__*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("SESSION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.validation_interval_secs == 0 {
            return Err(SessionError::Configuration(
                "validation_interval_secs must be greater than zero".to_string(),
            ));
        }
        check_timeout("idle_timeout_secs", self.idle_timeout_secs)?;
        check_timeout("absolute_timeout_secs", self.absolute_timeout_secs)?;
        check_bound(
            "validation_interval_secs",
            i64::try_from(self.validation_interval_secs).ok(),
        )?;
        check_bound(
            "tombstone_retention_secs",
            i64::try_from(self.tombstone_retention_secs).ok(),
        )?;
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        bounded_seconds(self.idle_timeout_secs)
    }

    pub fn absolute_timeout(&self) -> Duration {
        bounded_seconds(self.absolute_timeout_secs)
    }

    pub fn validation_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.validation_interval_secs)
    }

    pub fn tombstone_retention(&self) -> Duration {
        bounded_seconds(i64::try_from(self.tombstone_retention_secs).unwrap_or(MAX_DURATION_SECS))
    }
}

// Negative timeouts mean "never" and are accepted at any magnitude.
fn check_timeout(field: &str, secs: i64) -> Result<()> {
    if secs < 0 {
        return Ok(());
    }
    check_bound(field, Some(secs))
}

fn check_bound(field: &str, secs: Option<i64>) -> Result<()> {
    match secs {
        Some(secs) if secs <= MAX_DURATION_SECS => Ok(()),
        _ => Err(SessionError::Configuration(format!(
            "{} must not exceed {} seconds",
            field, MAX_DURATION_SECS
        ))),
    }
}

fn bounded_seconds(secs: i64) -> Duration {
    let secs = secs.clamp(-MAX_DURATION_SECS, MAX_DURATION_SECS);
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_timeout(), Duration::minutes(15));
        assert_eq!(config.absolute_timeout(), Duration::minutes(30));
        assert!(config.validation_scheduler_enabled);
        assert_eq!(config.validation_interval(), std::time::Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"validation_interval_secs":0,"idle_timeout_secs":-1}"#).unwrap();
        assert_eq!(config.idle_timeout_secs, -1);
        assert_eq!(config.absolute_timeout_secs, 1800);
        assert!(matches!(config.validate(), Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let idle = SessionConfig {
            idle_timeout_secs: i64::MAX,
            ..SessionConfig::default()
        };
        assert!(matches!(idle.validate(), Err(SessionError::Configuration(_))));
        assert_eq!(idle.idle_timeout(), Duration::seconds(MAX_DURATION_SECS));

        let absolute = SessionConfig {
            absolute_timeout_secs: MAX_DURATION_SECS + 1,
            ..SessionConfig::default()
        };
        assert!(matches!(absolute.validate(), Err(SessionError::Configuration(_))));

        let retention = SessionConfig {
            tombstone_retention_secs: u64::MAX,
            ..SessionConfig::default()
        };
        assert!(matches!(retention.validate(), Err(SessionError::Configuration(_))));
        assert!(retention.tombstone_retention() > Duration::zero());

        let far = SessionConfig {
            tombstone_retention_secs: 1_000_000_000_000_000,
            ..SessionConfig::default()
        };
        assert!(matches!(far.validate(), Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_negative_timeouts_mean_never() {
        let config = SessionConfig {
            idle_timeout_secs: i64::MIN,
            absolute_timeout_secs: -1,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.idle_timeout() < Duration::zero());
        assert!(config.absolute_timeout() < Duration::zero());
    }
}
