use crate::error::Result;
use auth_identity::MapContext;
use serde_json::Value;

/// Initialization data handed to [`crate::NativeSessionManager::start`].
///
/// The `host` entry seeds the session's host; every other entry becomes an
/// initial session attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    values: MapContext,
}

impl SessionContext {
    pub const HOST_KEY: &'static str = "host";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.values.none_safe_put(Self::HOST_KEY, Some(Value::String(host.into())));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        self.put(key, value)?;
        Ok(self)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        Ok(self.values.put(key, value)?)
    }

    pub fn host(&self) -> Option<String> {
        self.values.get_as(Self::HOST_KEY)
    }

    /// Entries that become session attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values
            .iter()
            .filter(|(key, _)| key.as_str() != Self::HOST_KEY)
    }

    pub fn as_map(&self) -> &MapContext {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.size()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<MapContext> for SessionContext {
    fn from(values: MapContext) -> Self {
        Self { values }
    }
}
