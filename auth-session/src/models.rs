use crate::error::{Result, SessionError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque session identifier, generated once at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Handle through which callers address a session held by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    session_id: SessionId,
}

impl SessionKey {
    pub fn new(session_id: SessionId) -> Self {
        Self { session_id }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

impl From<SessionId> for SessionKey {
    fn from(session_id: SessionId) -> Self {
        Self::new(session_id)
    }
}

impl From<&SessionId> for SessionKey {
    fn from(session_id: &SessionId) -> Self {
        Self::new(session_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Stopped,
    Expired,
}

/// Server-side record of a subject's ongoing interaction.
///
/// `Active` is the only state that accepts mutation; `Stopped` and `Expired`
/// are terminal. Expiry is computed on demand by [`Session::is_expired_at`]
/// and only recorded once someone calls [`Session::expire`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    start_timestamp: DateTime<Utc>,
    last_access_time: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    idle_timeout: Duration,
    #[serde(with = "duration_millis")]
    absolute_timeout: Duration,
    host: Option<String>,
    attributes: BTreeMap<String, Value>,
    state: SessionState,
    terminated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        id: SessionId,
        host: Option<String>,
        idle_timeout: Duration,
        absolute_timeout: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            start_timestamp: now,
            last_access_time: now,
            idle_timeout,
            absolute_timeout,
            host,
            attributes: BTreeMap::new(),
            state: SessionState::Active,
            terminated_at: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.start_timestamp
    }

    pub fn last_access_time(&self) -> DateTime<Utc> {
        self.last_access_time
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn absolute_timeout(&self) -> Duration {
        self.absolute_timeout
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// When the session was stopped or recorded as expired.
    pub fn terminated_at(&self) -> Option<DateTime<Utc>> {
        self.terminated_at
    }

    /// Whether either timeout has elapsed at `now`. Negative timeouts never elapse.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let idle_elapsed = self.idle_timeout >= Duration::zero()
            && now - self.last_access_time > self.idle_timeout;
        let absolute_elapsed = self.absolute_timeout >= Duration::zero()
            && now - self.start_timestamp > self.absolute_timeout;
        idle_elapsed || absolute_elapsed
    }

    /// Error describing why this session can no longer be used, if any.
    pub fn ensure_active(&self) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Stopped => Err(SessionError::Stopped(self.id.clone())),
            SessionState::Expired => Err(SessionError::Expired(self.id.clone())),
        }
    }

    /// Records an access. `last_access_time` strictly increases even if the
    /// clock has not moved since the previous access.
    pub fn touch(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active()?;
        let floor = self.last_access_time + Duration::nanoseconds(1);
        self.last_access_time = if now > floor { now } else { floor };
        Ok(())
    }

    /// Moves an active session to `Stopped`. Returns false if it was already terminal.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        self.terminate(SessionState::Stopped, now)
    }

    /// Moves an active session to `Expired`. Returns false if it was already terminal.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        self.terminate(SessionState::Expired, now)
    }

    fn terminate(&mut self, state: SessionState, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = state;
        self.terminated_at = Some(now);
        true
    }

    pub fn set_idle_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_active()?;
        self.idle_timeout = timeout;
        Ok(())
    }

    pub fn set_absolute_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_active()?;
        self.absolute_timeout = timeout;
        Ok(())
    }

    pub fn get_attribute(&self, key: &str) -> Result<Option<&Value>> {
        self.ensure_active()?;
        Ok(self.attributes.get(key))
    }

    /// Stores an attribute; `None` or JSON `null` removes it instead.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Option<Value>) -> Result<()> {
        self.ensure_active()?;
        let key = key.into();
        match value {
            Some(value) if !value.is_null() => {
                self.attributes.insert(key, value);
            }
            _ => {
                self.attributes.remove(&key);
            }
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str) -> Result<Option<Value>> {
        self.ensure_active()?;
        Ok(self.attributes.remove(key))
    }

    pub fn attribute_keys(&self) -> Result<Vec<String>> {
        self.ensure_active()?;
        Ok(self.attributes.keys().cloned().collect())
    }
}

mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        i64::deserialize(deserializer).map(Duration::milliseconds)
    }
}
