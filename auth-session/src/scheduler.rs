use crate::error::Result;
use async_trait::async_trait;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A manager whose sessions can be swept for expiry in one pass.
#[async_trait]
pub trait ValidatingSessionManager: Send + Sync {
    /// Expires every session whose timeouts elapsed; returns how many were expired.
    async fn validate_sessions(&self) -> Result<usize>;
}

/// Periodic background sweep over a [`ValidatingSessionManager`].
///
/// The task holds only a weak reference to its manager and exits once the
/// manager is dropped. Cancellation is observed between sweeps; a sweep
/// that has started always runs to completion. Dropping the scheduler
/// cancels it.
pub struct SessionValidationScheduler {
    interval: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionValidationScheduler {
    /// Spawns the sweep task on the current tokio runtime.
    pub fn start(manager: Weak<dyn ValidatingSessionManager>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Session validation scheduler cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(target) = manager.upgrade() else {
                            debug!("Session manager dropped; stopping validation scheduler");
                            break;
                        };
                        match target.validate_sessions().await {
                            Ok(expired) => debug!(expired, "Session validation sweep complete"),
                            Err(e) => warn!(error = %e, "Session validation sweep failed"),
                        }
                    }
                }
            }
        });

        info!(interval_secs = interval.as_secs_f64(), "Session validation scheduler started");
        Self {
            interval,
            cancel,
            handle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }

    /// Requests cancellation; takes effect before the next sweep begins.
    pub fn disable(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            info!("Session validation scheduler disabled");
        }
    }
}

impl Drop for SessionValidationScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingManager {
        sweeps: AtomicUsize,
    }

    #[async_trait]
    impl ValidatingSessionManager for CountingManager {
        async fn validate_sessions(&self) -> Result<usize> {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_sweeps_until_disabled() {
        let manager = Arc::new(CountingManager::default());
        let weak = Arc::downgrade(&manager) as Weak<dyn ValidatingSessionManager>;
        let scheduler = SessionValidationScheduler::start(weak, Duration::from_millis(20));
        assert!(scheduler.is_enabled());

        tokio::time::sleep(Duration::from_millis(110)).await;
        scheduler.disable();
        assert!(!scheduler.is_enabled());

        let after_disable = manager.sweeps.load(Ordering::SeqCst);
        assert!(after_disable >= 2, "expected several sweeps, got {}", after_disable);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(manager.sweeps.load(Ordering::SeqCst), after_disable);
    }

    #[tokio::test]
    async fn test_exits_when_manager_dropped() {
        let manager = Arc::new(CountingManager::default());
        let weak = Arc::downgrade(&manager) as Weak<dyn ValidatingSessionManager>;
        let scheduler = SessionValidationScheduler::start(weak, Duration::from_millis(10));

        drop(manager);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!scheduler.is_enabled());
    }
}
