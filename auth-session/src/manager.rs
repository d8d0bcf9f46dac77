//! Native session manager
//!
//! Owns the authoritative [`SessionStore`] and mediates every access to a
//! session by id. Operations on one id are serialized through a per-id async
//! lock; different ids never contend. Each operation first validates the
//! session, so expiry is detected lazily on access and proactively by the
//! validation sweep. Both paths share the same transition, which persists
//! the `Expired` state and notifies listeners exactly once.
//!
//! Stopped and expired sessions stay in the store as tombstones so repeated
//! access keeps failing with the same error. The sweep purges tombstones
//! older than the configured retention.

use crate::config::SessionConfig;
use crate::context::SessionContext;
use crate::error::{Result, SessionError};
use crate::id_generator::{SessionIdGenerator, UuidSessionIdGenerator};
use crate::listener::SessionListener;
use crate::models::{Session, SessionId, SessionKey};
use crate::scheduler::{SessionValidationScheduler, ValidatingSessionManager};
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

const MAX_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Start,
    Stop,
    Expiration,
}

pub struct NativeSessionManager {
    store: Arc<dyn SessionStore>,
    id_generator: Arc<dyn SessionIdGenerator>,
    listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
    locks: DashMap<SessionId, Arc<tokio::sync::Mutex<()>>>,
    config: SessionConfig,
    validation_enabled: AtomicBool,
    scheduler: Mutex<Option<SessionValidationScheduler>>,
    self_ref: Weak<NativeSessionManager>,
}

impl NativeSessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Result<Arc<Self>> {
        Self::with_id_generator(store, Arc::new(UuidSessionIdGenerator), config)
    }

    pub fn with_id_generator(
        store: Arc<dyn SessionStore>,
        id_generator: Arc<dyn SessionIdGenerator>,
        config: SessionConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let validation_enabled = AtomicBool::new(config.validation_scheduler_enabled);
        Ok(Arc::new_cyclic(|self_ref| Self {
            store,
            id_generator,
            listeners: RwLock::new(Vec::new()),
            locks: DashMap::new(),
            config,
            validation_enabled,
            scheduler: Mutex::new(None),
            self_ref: self_ref.clone(),
        }))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.listeners.write().push(listener);
    }

    /// Creates and stores a new session seeded from `context`.
    pub async fn start(&self, context: SessionContext) -> Result<SessionId> {
        self.enable_session_validation_if_necessary();

        let mut created = None;
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let session = self.build_session(&context)?;
            match self.store.create(&session).await {
                Ok(()) => {
                    created = Some(session);
                    break;
                }
                Err(SessionError::IdCollision(_)) => {
                    warn!(attempt, session_id = %session.id(), "Generated session id is already in use");
                }
                Err(e) => return Err(e),
            }
        }
        let session = created.ok_or(SessionError::IdCollision(MAX_ID_ATTEMPTS))?;

        info!(session_id = %session.id(), host = ?session.host(), "Session started");
        self.notify(&session, Lifecycle::Start);
        Ok(session.id().clone())
    }

    /// Returns a snapshot of a live session. Does not touch it.
    pub async fn get_session(&self, key: &SessionKey) -> Result<Session> {
        self.read_session(key, |session| Ok(session.clone())).await
    }

    pub async fn check_valid(&self, key: &SessionKey) -> Result<()> {
        self.read_session(key, |_| Ok(())).await
    }

    pub async fn is_valid(&self, key: &SessionKey) -> bool {
        self.check_valid(key).await.is_ok()
    }

    pub async fn touch(&self, key: &SessionKey) -> Result<()> {
        self.mutate_session(key, |session, now| session.touch(now))
            .await
    }

    pub async fn get_start_timestamp(&self, key: &SessionKey) -> Result<DateTime<Utc>> {
        self.read_session(key, |session| Ok(session.start_timestamp()))
            .await
    }

    pub async fn get_last_access_time(&self, key: &SessionKey) -> Result<DateTime<Utc>> {
        self.read_session(key, |session| Ok(session.last_access_time()))
            .await
    }

    pub async fn get_idle_timeout(&self, key: &SessionKey) -> Result<Duration> {
        self.read_session(key, |session| Ok(session.idle_timeout()))
            .await
    }

    pub async fn set_idle_timeout(&self, key: &SessionKey, timeout: Duration) -> Result<()> {
        self.mutate_session(key, |session, _| session.set_idle_timeout(timeout))
            .await
    }

    pub async fn get_absolute_timeout(&self, key: &SessionKey) -> Result<Duration> {
        self.read_session(key, |session| Ok(session.absolute_timeout()))
            .await
    }

    pub async fn set_absolute_timeout(&self, key: &SessionKey, timeout: Duration) -> Result<()> {
        self.mutate_session(key, |session, _| session.set_absolute_timeout(timeout))
            .await
    }

    pub async fn get_host(&self, key: &SessionKey) -> Result<Option<String>> {
        self.read_session(key, |session| Ok(session.host().map(str::to_string)))
            .await
    }

    // Attribute access counts as session activity and touches the session.

    pub async fn get_attribute_keys(&self, key: &SessionKey) -> Result<Vec<String>> {
        self.mutate_session(key, |session, now| {
            session.touch(now)?;
            session.attribute_keys()
        })
        .await
    }

    pub async fn get_attribute(&self, key: &SessionKey, attribute: &str) -> Result<Option<Value>> {
        self.mutate_session(key, |session, now| {
            session.touch(now)?;
            Ok(session.get_attribute(attribute)?.cloned())
        })
        .await
    }

    /// Stores an attribute; `None` removes it.
    pub async fn set_attribute(
        &self,
        key: &SessionKey,
        attribute: &str,
        value: Option<Value>,
    ) -> Result<()> {
        self.mutate_session(key, |session, now| {
            session.touch(now)?;
            session.set_attribute(attribute, value)
        })
        .await
    }

    pub async fn remove_attribute(&self, key: &SessionKey, attribute: &str) -> Result<Option<Value>> {
        self.mutate_session(key, |session, now| {
            session.touch(now)?;
            session.remove_attribute(attribute)
        })
        .await
    }

    /// Stops a live session and notifies listeners.
    pub async fn stop(&self, key: &SessionKey) -> Result<()> {
        let id = key.session_id();
        let guard = self.lock_session(id).await;
        let result: Result<()> = async {
            let mut session = self.load_valid(id).await?;
            if session.stop(Utc::now()) {
                self.store.update(&session).await?;
                info!(session_id = %id, "Session stopped");
                self.notify(&session, Lifecycle::Stop);
            }
            Ok(())
        }
        .await;
        drop(guard);
        self.release_if_unknown(id, &result);
        result
    }

    /// One validation sweep: expires every active session whose timeouts
    /// elapsed, then purges old tombstones. Returns the number expired.
    pub async fn validate_sessions(&self) -> Result<usize> {
        let started = Utc::now();
        let mut expired = 0;

        for candidate in self.store.active_sessions().await? {
            if !candidate.is_expired_at(started) {
                continue;
            }
            let id = candidate.id();
            let _guard = self.lock_session(id).await;
            // re-read under the lock; a concurrent touch may have won
            let mut session = match self.store.read(id).await {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "Could not reload session during validation");
                    continue;
                }
            };
            let now = Utc::now();
            if !session.is_active() || !session.is_expired_at(now) {
                continue;
            }
            match self.expire(&mut session, now).await {
                Ok(()) => expired += 1,
                Err(e) => warn!(session_id = %id, error = %e, "Could not expire session"),
            }
        }

        let purged = self.purge_tombstones(started).await?;
        if expired > 0 || purged > 0 {
            info!(expired, purged, "Session validation sweep finished");
        } else {
            debug!("Session validation sweep found nothing to do");
        }
        Ok(expired)
    }

    /// Starts the background sweep if it is not already running.
    pub fn enable_session_validation(&self) -> Result<()> {
        self.validation_enabled.store(true, Ordering::SeqCst);
        let mut scheduler = self.scheduler.lock();
        if scheduler.as_ref().is_some_and(SessionValidationScheduler::is_enabled) {
            return Ok(());
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(SessionError::Configuration(
                "session validation requires a running tokio runtime".to_string(),
            ));
        }
        let target: Weak<dyn ValidatingSessionManager> = self.self_ref.clone();
        *scheduler = Some(SessionValidationScheduler::start(
            target,
            self.config.validation_interval(),
        ));
        Ok(())
    }

    pub fn disable_session_validation(&self) {
        self.validation_enabled.store(false, Ordering::SeqCst);
        if let Some(scheduler) = self.scheduler.lock().take() {
            scheduler.disable();
        }
    }

    pub fn is_session_validation_enabled(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_some_and(SessionValidationScheduler::is_enabled)
    }

    fn enable_session_validation_if_necessary(&self) {
        if !self.validation_enabled.load(Ordering::SeqCst) || self.is_session_validation_enabled() {
            return;
        }
        if let Err(e) = self.enable_session_validation() {
            warn!(error = %e, "Session validation scheduler could not be started");
        }
    }

    fn build_session(&self, context: &SessionContext) -> Result<Session> {
        let mut session = Session::new(
            self.id_generator.generate(),
            context.host(),
            self.config.idle_timeout(),
            self.config.absolute_timeout(),
            Utc::now(),
        );
        for (key, value) in context.attributes() {
            session.set_attribute(key.clone(), Some(value.clone()))?;
        }
        Ok(session)
    }

    async fn lock_session(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(id.clone()).or_default().clone();
        lock.lock_owned().await
    }

    /// Drops the lock entry for `id` once nobody else holds or awaits it.
    fn release_lock(&self, id: &SessionId) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn release_if_unknown<T>(&self, id: &SessionId, result: &Result<T>) {
        if matches!(result, Err(SessionError::Unknown(_))) {
            self.release_lock(id);
        }
    }

    /// Loads a session that is still usable, expiring it on the way if its
    /// timeouts elapsed. Callers hold the session's lock.
    async fn load_valid(&self, id: &SessionId) -> Result<Session> {
        let mut session = self
            .store
            .read(id)
            .await?
            .ok_or_else(|| SessionError::Unknown(id.clone()))?;
        session.ensure_active()?;

        let now = Utc::now();
        if session.is_expired_at(now) {
            self.expire(&mut session, now).await?;
            return Err(SessionError::Expired(id.clone()));
        }
        Ok(session)
    }

    async fn expire(&self, session: &mut Session, now: DateTime<Utc>) -> Result<()> {
        if session.expire(now) {
            self.store.update(session).await?;
            info!(session_id = %session.id(), "Session expired");
            self.notify(session, Lifecycle::Expiration);
        }
        Ok(())
    }

    async fn read_session<T, F>(&self, key: &SessionKey, op: F) -> Result<T>
    where
        F: FnOnce(&Session) -> Result<T> + Send,
        T: Send,
    {
        let id = key.session_id();
        let guard = self.lock_session(id).await;
        let result = match self.load_valid(id).await {
            Ok(session) => op(&session),
            Err(e) => Err(e),
        };
        drop(guard);
        self.release_if_unknown(id, &result);
        result
    }

    async fn mutate_session<T, F>(&self, key: &SessionKey, op: F) -> Result<T>
    where
        F: FnOnce(&mut Session, DateTime<Utc>) -> Result<T> + Send,
        T: Send,
    {
        let id = key.session_id();
        let guard = self.lock_session(id).await;
        let result: Result<T> = async {
            let mut session = self.load_valid(id).await?;
            let value = op(&mut session, Utc::now())?;
            self.store.update(&session).await?;
            Ok(value)
        }
        .await;
        drop(guard);
        self.release_if_unknown(id, &result);
        result
    }

    async fn purge_tombstones(&self, now: DateTime<Utc>) -> Result<usize> {
        let Some(cutoff) = now.checked_sub_signed(self.config.tombstone_retention()) else {
            debug!("Tombstone retention reaches past the representable range; nothing to purge");
            return Ok(0);
        };
        let mut purged = 0;

        for session in self.store.sessions().await? {
            if !matches!(session.terminated_at(), Some(at) if at <= cutoff) {
                continue;
            }
            let id = session.id();
            {
                let _guard = self.lock_session(id).await;
                self.store.delete(id).await?;
            }
            self.release_lock(id);
            debug!(session_id = %id, state = ?session.state(), "Purged terminated session");
            purged += 1;
        }
        Ok(purged)
    }

    fn notify(&self, session: &Session, event: Lifecycle) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            let outcome = match event {
                Lifecycle::Start => listener.on_start(session),
                Lifecycle::Stop => listener.on_stop(session),
                Lifecycle::Expiration => listener.on_expiration(session),
            };
            if let Err(e) = outcome {
                warn!(session_id = %session.id(), event = ?event, error = %e, "Session listener failed");
            }
        }
    }
}

#[async_trait]
impl ValidatingSessionManager for NativeSessionManager {
    async fn validate_sessions(&self) -> Result<usize> {
        NativeSessionManager::validate_sessions(self).await
    }
}
