//! Notification outbox.
//!
//! Transitions hand notifications to a bounded channel and return
//! immediately. A background worker drains the channel into the
//! [`Notifier`]. A full or closed channel drops the notification with a
//! warning; delivery failures are logged and discarded. Nothing here can
//! fail or roll back a transition.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::ports::{Notification, Notifier};

/// Sending half of the notification pipeline.
#[derive(Debug, Clone, Default)]
pub struct NotificationOutbox {
    sender: Option<mpsc::Sender<Notification>>,
}

impl NotificationOutbox {
    /// Starts the delivery worker on the current tokio runtime.
    ///
    /// The worker exits once every clone of the returned outbox is dropped
    /// and the queue is drained.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, notifier));
        (
            Self {
                sender: Some(sender),
            },
            worker,
        )
    }

    /// An outbox that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// True when notifications are actually delivered.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues a notification without waiting.
    pub fn emit(&self, notification: Notification) {
        let Some(sender) = &self.sender else {
            debug!(
                application_id = %notification.application.id,
                "Notifications disabled, dropping"
            );
            return;
        };
        match sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                warn!(
                    application_id = %n.application.id,
                    kind = ?n.kind,
                    "Notification outbox full, dropping notification"
                );
            }
            Err(TrySendError::Closed(n)) => {
                warn!(
                    application_id = %n.application.id,
                    kind = ?n.kind,
                    "Notification worker stopped, dropping notification"
                );
            }
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Notification>, notifier: Arc<dyn Notifier>) {
    while let Some(notification) = receiver.recv().await {
        if let Err(e) = notifier.notify(&notification).await {
            warn!(
                application_id = %notification.application.id,
                recipient_id = %notification.recipient_id,
                error = %e,
                "Failed to deliver leave notification"
            );
        }
    }
    debug!("Notification outbox drained");
}
