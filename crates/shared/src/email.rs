//! Email service for leave status notifications.
//!
//! Uses `lettre` for SMTP transport.

use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::debug;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Content of a leave status email.
#[derive(Debug, Clone)]
pub struct LeaveStatusEmail {
    /// Leave type label, e.g. `SICK_LEAVE`.
    pub leave_type: String,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Outcome wording, e.g. `approved`.
    pub status: String,
    /// Optional extra line, such as a rejection reason.
    pub note: Option<String>,
}

impl LeaveStatusEmail {
    /// Renders the subject and plain-text body for a recipient.
    #[must_use]
    pub fn render(&self, to_name: &str, frontend_url: &str) -> (String, String) {
        let subject = format!("Your leave request has been {} - Leavemark", self.status);
        let note = self
            .note
            .as_deref()
            .map(|n| format!("\n{n}\n"))
            .unwrap_or_default();
        let body = format!(
            r"Hi {to_name},

Your {leave_type} request from {start} to {end} has been {status}.
{note}
You can review your leave applications at {frontend_url}/dashboard/leave-applications

Best regards,
The Leavemark Team",
            leave_type = self.leave_type,
            start = self.start_date.format("%Y-%m-%d"),
            end = self.end_date.format("%Y-%m-%d"),
            status = self.status,
        );
        (subject, body)
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration this service sends with.
    #[must_use]
    pub const fn config(&self) -> &EmailConfig {
        &self.config
    }

    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();
        Ok(transport)
    }

    /// Sends a leave status email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be built or sent.
    pub async fn send_leave_status_email(
        &self,
        to_email: &str,
        to_name: &str,
        content: &LeaveStatusEmail,
    ) -> Result<(), EmailError> {
        let (subject, body) = content.render(to_name, &self.config.frontend_url);
        self.send_email(to_email, &subject, &body).await
    }

    /// Sends a generic email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let email = self.build_message(to_email, subject, body)?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        debug!(to = %to_email, subject = %subject, "Email sent");
        Ok(())
    }

    fn build_message(&self, to_email: &str, subject: &str, body: &str) -> Result<Message, EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}
