//! Email delivery of leave status notifications.

use async_trait::async_trait;
use leavemark_core::engine::{Notification, Notifier, NotifyError};
use leavemark_core::workflow::NotificationKind;
use leavemark_shared::{EmailError, EmailService, LeaveStatusEmail};
use std::sync::Arc;

/// Sends each notification as an email to the applicant.
#[derive(Clone)]
pub struct EmailNotifier {
    email: Arc<EmailService>,
}

impl EmailNotifier {
    /// Creates a notifier over an email service.
    #[must_use]
    pub const fn new(email: Arc<EmailService>) -> Self {
        Self { email }
    }
}

/// Builds the email content for a notification.
#[must_use]
pub fn email_content(notification: &Notification) -> LeaveStatusEmail {
    let application = &notification.application;
    let note = match notification.kind {
        NotificationKind::Rejected => application
            .rejection
            .as_ref()
            .and_then(|r| r.reason.as_ref())
            .map(|reason| format!("Reason: {reason}")),
        NotificationKind::ManagerApproved => {
            Some("It is now waiting for the HR decision.".to_string())
        }
        NotificationKind::Approved => None,
    };
    LeaveStatusEmail {
        leave_type: application.leave_type.label().to_string(),
        start_date: application.start_date,
        end_date: application.end_date,
        status: notification.kind.status_word().to_string(),
        note,
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let content = email_content(notification);
        self.email
            .send_leave_status_email(
                &notification.recipient_email,
                &notification.recipient_name,
                &content,
            )
            .await
            .map_err(|e| match e {
                EmailError::SendError(msg) => NotifyError::Delivery(msg),
                other => NotifyError::Build(other.to_string()),
            })
    }
}
