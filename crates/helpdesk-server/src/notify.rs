//! Outbound customer notifications.
//!
//! Mail delivery lives outside this service. The desk only needs a sink it
//! can hand a recipient, subject and body to after a state change commits.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("Notification transport failed: {0}")]
    Transport(String),
}

/// Best-effort notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if to.is_empty() {
            return Err(NotifyError::Rejected("empty recipient".into()));
        }
        info!(to, subject, body_len = body.len(), "Notification queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_rejects_empty_recipient() {
        let notifier = LogNotifier;
        assert!(notifier.notify("c@example.com", "hi", "body").is_ok());
        assert!(notifier.notify("", "hi", "body").is_err());
    }
}
