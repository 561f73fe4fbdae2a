//! Leave error taxonomy.
//!
//! Every engine operation fails with one of these. The HTTP layer maps them
//! through [`LeaveError::status_code`] and [`LeaveError::error_code`], or
//! converts them into the shared [`AppError`].

use chrono::NaiveDate;
use leavemark_shared::AppError;
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::workflow::types::LeaveStatus;

/// Errors that can occur during leave lifecycle operations.
#[derive(Debug, Error)]
pub enum LeaveError {
    // ========== Not found ==========
    /// Application not found (or not visible to the caller's company).
    #[error("Leave application {0} not found")]
    ApplicationNotFound(LeaveApplicationId),

    /// Employee not found.
    #[error("Employee {0} not found")]
    EmployeeNotFound(EmployeeId),

    // ========== Authority ==========
    /// Caller is not the manager this application waits on.
    #[error("Employee {actor} is not the reviewing manager of this application")]
    NotReviewingManager {
        /// The caller.
        actor: EmployeeId,
    },

    /// Caller may not record the HR decision for this application.
    #[error("Employee {actor} is not an HR reviewer for company {company}")]
    NotHrReviewer {
        /// The caller.
        actor: EmployeeId,
        /// The application's company.
        company: CompanyId,
    },

    /// Caller does not own the application.
    #[error("Employee {actor} does not own this application")]
    NotApplicationOwner {
        /// The caller.
        actor: EmployeeId,
    },

    // ========== State ==========
    /// The application's status does not allow the action.
    #[error("Cannot {action} a {status} leave application")]
    InvalidStatus {
        /// Current status.
        status: LeaveStatus,
        /// Attempted action.
        action: &'static str,
    },

    /// The manager already recorded a decision.
    #[error("Manager decision already recorded")]
    ManagerDecisionRecorded,

    /// HR is not part of this application's approval chain.
    #[error("HR approval is not required for this application")]
    HrNotRequired,

    /// HR decided before the manager stage completed.
    #[error("Manager approval is required before the HR decision")]
    ManagerApprovalMissing,

    // ========== Submission ==========
    /// The requested range collides with live applications.
    #[error("Leave dates overlap with {} existing application(s)", .conflicting.len())]
    Overlap {
        /// The colliding applications.
        conflicting: Vec<LeaveApplicationId>,
    },

    /// The company's plan does not allow the action.
    #[error("Not entitled: {0}")]
    EntitlementDenied(String),

    /// End date before start date.
    #[error("End date {end} is before start date {start}")]
    InvalidDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Day count must be positive.
    #[error("Number of days must be positive, got {0}")]
    InvalidDayCount(Decimal),

    /// Any other malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== Concurrency & infrastructure ==========
    /// Another transition won the race for this application.
    #[error("Leave application {0} was modified concurrently")]
    ConcurrentModification(LeaveApplicationId),

    /// A balance invariant would be broken.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl LeaveError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. }
            | Self::InvalidDayCount(_)
            | Self::Validation(_) => 400,

            Self::NotReviewingManager { .. }
            | Self::NotHrReviewer { .. }
            | Self::NotApplicationOwner { .. }
            | Self::EntitlementDenied(_) => 403,

            Self::ApplicationNotFound(_) | Self::EmployeeNotFound(_) => 404,

            Self::Overlap { .. } | Self::ConcurrentModification(_) => 409,

            Self::InvalidStatus { .. }
            | Self::ManagerDecisionRecorded
            | Self::HrNotRequired
            | Self::ManagerApprovalMissing => 422,

            Self::Ledger(_) | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ApplicationNotFound(_) | Self::EmployeeNotFound(_) => "NOT_FOUND",
            Self::NotReviewingManager { .. }
            | Self::NotHrReviewer { .. }
            | Self::NotApplicationOwner { .. } => "FORBIDDEN",
            Self::InvalidStatus { .. }
            | Self::ManagerDecisionRecorded
            | Self::HrNotRequired
            | Self::ManagerApprovalMissing => "INVALID_STATE",
            Self::Overlap { .. } => "OVERLAP",
            Self::EntitlementDenied(_) => "ENTITLEMENT_DENIED",
            Self::InvalidDateRange { .. }
            | Self::InvalidDayCount(_)
            | Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConcurrentModification(_) => "CONFLICT",
            Self::Ledger(_) => "INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// True for authority failures.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.error_code() == "FORBIDDEN"
    }

    /// True for status-precondition failures.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        self.error_code() == "INVALID_STATE"
    }
}

impl From<LeaveError> for AppError {
    fn from(err: LeaveError) -> Self {
        let message = err.to_string();
        match err {
            LeaveError::ApplicationNotFound(_) | LeaveError::EmployeeNotFound(_) => {
                Self::NotFound(message)
            }
            LeaveError::NotReviewingManager { .. }
            | LeaveError::NotHrReviewer { .. }
            | LeaveError::NotApplicationOwner { .. } => Self::Forbidden(message),
            LeaveError::InvalidStatus { .. }
            | LeaveError::ManagerDecisionRecorded
            | LeaveError::HrNotRequired
            | LeaveError::ManagerApprovalMissing => Self::InvalidState(message),
            LeaveError::Overlap { .. } | LeaveError::ConcurrentModification(_) => {
                Self::Conflict(message)
            }
            LeaveError::EntitlementDenied(reason) => Self::EntitlementDenied(reason),
            LeaveError::InvalidDateRange { .. }
            | LeaveError::InvalidDayCount(_)
            | LeaveError::Validation(_) => Self::Validation(message),
            LeaveError::Ledger(_) => Self::Internal(message),
            LeaveError::Database(_) => Self::Database(message),
        }
    }
}
