use crate::models::Session;

/// Receives session lifecycle notifications.
///
/// Errors are logged by the manager and never abort the operation that
/// triggered the notification.
pub trait SessionListener: Send + Sync {
    fn on_start(&self, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_stop(&self, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_expiration(&self, _session: &Session) -> anyhow::Result<()> {
        Ok(())
    }
}
