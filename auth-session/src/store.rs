use crate::error::{Result, SessionError};
use crate::models::{Session, SessionId};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Authoritative storage for sessions, keyed by id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session; fails with `IdCollision` if the id is taken.
    async fn create(&self, session: &Session) -> Result<()>;

    async fn read(&self, session_id: &SessionId) -> Result<Option<Session>>;

    /// Replaces a stored session; fails with `Unknown` if it is not stored.
    async fn update(&self, session: &Session) -> Result<()>;

    /// Removes a session. Removing an unknown id succeeds.
    async fn delete(&self, session_id: &SessionId) -> Result<()>;

    /// Every stored session, terminal ones included
    async fn sessions(&self) -> Result<Vec<Session>>;

    async fn active_sessions(&self) -> Result<Vec<Session>> {
        Ok(self
            .sessions()
            .await?
            .into_iter()
            .filter(Session::is_active)
            .collect())
    }
}

/// In-memory session store implementation
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> Result<()> {
        match self.sessions.entry(session.id().clone()) {
            Entry::Occupied(_) => Err(SessionError::IdCollision(1)),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn read(&self, session_id: &SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.get(session_id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, session: &Session) -> Result<()> {
        match self.sessions.get_mut(session.id()) {
            Some(mut entry) => {
                *entry = session.clone();
                Ok(())
            }
            None => Err(SessionError::Unknown(session.id().clone())),
        }
    }

    async fn delete(&self, session_id: &SessionId) -> Result<()> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}
