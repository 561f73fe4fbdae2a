//! Ports to the engine's external collaborators.
//!
//! - [`EntitlementGate`] answers "does the company's plan allow this?"
//! - [`Notifier`] delivers best-effort status notifications

use async_trait::async_trait;
use leavemark_shared::types::{CompanyId, EmployeeId};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::workflow::{EmployeeProfile, LeaveApplication, LeaveError, NotificationKind};

/// Plan-gated capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Submitting a leave application.
    CreateLeaveApplication,
    /// Defining more than the default leave policies.
    MultipleLeavePolicies,
    /// Attendance tracking.
    AttendanceManagement,
    /// Report exports.
    ReportsDownload,
    /// Attendance analytics.
    AttendanceRateAnalytics,
}

impl Capability {
    /// Returns the wire representation of the capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateLeaveApplication => "create-leave-application",
            Self::MultipleLeavePolicies => "multiple-leave-policies",
            Self::AttendanceManagement => "attendance-management",
            Self::ReportsDownload => "reports-download",
            Self::AttendanceRateAnalytics => "attendance-rate-analytics",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer of the entitlement gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    /// The plan permits the action.
    Allowed,
    /// The plan refuses the action, with a reason for the caller.
    Denied(String),
}

/// Yes/no check of a company's plan.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntitlementGate: Send + Sync {
    /// Checks whether `company_id` may use `capability`.
    async fn check_allowed(
        &self,
        company_id: CompanyId,
        capability: Capability,
    ) -> Result<Entitlement, LeaveError>;
}

/// Gate that allows everything. Used when no billing backend is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllGate;

#[async_trait]
impl EntitlementGate for AllowAllGate {
    async fn check_allowed(
        &self,
        _company_id: CompanyId,
        _capability: Capability,
    ) -> Result<Entitlement, LeaveError> {
        Ok(Entitlement::Allowed)
    }
}

/// A status notification for the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The applicant.
    pub recipient_id: EmployeeId,
    /// Applicant's email address.
    pub recipient_email: String,
    /// Applicant's display name.
    pub recipient_name: String,
    /// What happened.
    pub kind: NotificationKind,
    /// Application state after the transition.
    pub application: LeaveApplication,
}

impl Notification {
    /// Builds a notification addressed to `applicant`.
    #[must_use]
    pub fn for_applicant(
        applicant: &EmployeeProfile,
        kind: NotificationKind,
        application: LeaveApplication,
    ) -> Self {
        Self {
            recipient_id: applicant.id,
            recipient_email: applicant.email.clone(),
            recipient_name: applicant.full_name.clone(),
            kind,
            application,
        }
    }
}

/// Errors a notifier may report. They are logged and discarded.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message could not be built.
    #[error("Failed to build notification: {0}")]
    Build(String),

    /// The transport refused or failed.
    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

/// Best-effort delivery of status notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used when email is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            application_id = %notification.application.id,
            recipient_id = %notification.recipient_id,
            kind = ?notification.kind,
            "Leave status notification"
        );
        Ok(())
    }
}
