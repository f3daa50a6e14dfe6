use async_trait::async_trait;

use crate::error::Error;

/// Opaque handle to a message previously sent through a [`Notifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

/// Channel used to show progress and errors to the user. Implementations must
/// tolerate concurrent calls, every call stands on its own.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<MessageHandle, Error>;
    async fn edit_message(&self, handle: &MessageHandle, text: &str) -> Result<(), Error>;
    async fn send_error(&self, error: &Error, context: &str) -> Result<(), Error>;
}

// Notification failures never abort a save, they are logged and dropped.

pub async fn send_best_effort(notifier: &dyn Notifier, text: &str) -> Option<MessageHandle> {
    match notifier.send(text).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to send notification");
            None
        }
    }
}

pub async fn edit_best_effort(notifier: &dyn Notifier, handle: Option<&MessageHandle>, text: &str) {
    let Some(handle) = handle else {
        return;
    };
    if let Err(e) = notifier.edit_message(handle, text).await {
        tracing::warn!(error = %e, ?handle, "Failed to edit notification");
    }
}

pub async fn report_error_best_effort(notifier: &dyn Notifier, error: &Error, context: &str) {
    if let Err(e) = notifier.send_error(error, context).await {
        tracing::warn!(error = %e, original = %error, context, "Failed to report error");
    }
}
