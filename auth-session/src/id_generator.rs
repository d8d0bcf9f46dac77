use crate::models::SessionId;
use uuid::Uuid;

/// Source of fresh session ids.
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self) -> SessionId;
}

/// Random (v4) UUIDs; 122 bits of entropy per id.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSessionIdGenerator;

impl SessionIdGenerator for UuidSessionIdGenerator {
    fn generate(&self) -> SessionId {
        SessionId::new(Uuid::new_v4().to_string())
    }
}
