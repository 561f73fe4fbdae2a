//! Workflow domain types for the leave application lifecycle.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::{BalanceKey, LedgerOp, LeaveType};
use crate::workflow::overlap::DateRange;

/// Leave application status.
///
/// The valid transitions are:
/// - Pending → Approved (final approval)
/// - Pending → Rejected (manager or HR rejection)
/// - Pending → Cancelled (owner cancellation)
///
/// A manager approval on a two-stage application keeps it Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    /// Awaiting one or more decisions.
    Pending,
    /// Finally approved; days are used.
    Approved,
    /// Rejected; days were released.
    Rejected,
    /// Withdrawn by the owner; days were released.
    Cancelled,
}

impl LeaveStatus {
    /// Returns the wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses never change again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Statuses that occupy the employee's calendar for overlap purposes.
    #[must_use]
    pub fn blocks_calendar(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of an employee inside their company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeRole {
    /// Platform-level administrator.
    SuperAdmin,
    /// Company HR administrator.
    HrAdmin,
    /// People manager.
    Manager,
    /// Regular employee.
    Employee,
}

impl EmployeeRole {
    /// Returns the wire representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::HrAdmin => "HR_ADMIN",
            Self::Manager => "MANAGER",
            Self::Employee => "EMPLOYEE",
        }
    }

    /// Parses a role, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            "HR_ADMIN" => Some(Self::HrAdmin),
            "MANAGER" => Some(Self::Manager),
            "EMPLOYEE" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Roles allowed to record the HR decision and run ledger maintenance.
    #[must_use]
    pub fn is_hr(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::HrAdmin)
    }
}

impl fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An employee as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// Employee identifier.
    pub id: EmployeeId,
    /// Employing company.
    pub company_id: CompanyId,
    /// Direct manager, if any.
    pub manager_id: Option<EmployeeId>,
    /// Role inside the company.
    pub role: EmployeeRole,
    /// Address for status notifications.
    pub email: String,
    /// Display name for status notifications.
    pub full_name: String,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The acting employee.
    pub employee_id: EmployeeId,
    /// The acting employee's company.
    pub company_id: CompanyId,
    /// The acting employee's role.
    pub role: EmployeeRole,
}

impl Actor {
    /// Creates a new actor.
    #[must_use]
    pub const fn new(employee_id: EmployeeId, company_id: CompanyId, role: EmployeeRole) -> Self {
        Self {
            employee_id,
            company_id,
            role,
        }
    }
}

impl From<&EmployeeProfile> for Actor {
    fn from(profile: &EmployeeProfile) -> Self {
        Self::new(profile.id, profile.company_id, profile.role)
    }
}

/// Who approved a stage and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStamp {
    /// The approving employee.
    pub approver_id: EmployeeId,
    /// Approval time.
    pub approved_at: DateTime<Utc>,
}

/// Who rejected an application, why and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// The rejecting employee.
    pub rejected_by: EmployeeId,
    /// Optional free-text reason.
    pub reason: Option<String>,
    /// Rejection time.
    pub rejected_at: DateTime<Utc>,
}

/// A leave application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveApplication {
    /// Application identifier.
    pub id: LeaveApplicationId,
    /// Applicant.
    pub employee_id: EmployeeId,
    /// Applicant's company.
    pub company_id: CompanyId,
    /// Requested leave category.
    pub leave_type: LeaveType,
    /// First day of leave (inclusive).
    pub start_date: NaiveDate,
    /// Last day of leave (inclusive).
    pub end_date: NaiveDate,
    /// Days charged against the balance.
    pub number_of_days: Decimal,
    /// Half-day request.
    pub is_half_day: bool,
    /// Applicant's reason.
    pub reason: String,
    /// Opaque reference to a supporting document.
    pub attachment_ref: Option<String>,
    /// Current status.
    pub status: LeaveStatus,
    /// Whether HR must sign off in addition to (or instead of) the manager.
    pub requires_hr_approval: bool,
    /// Manager whose decision is expected, captured at submission.
    pub reviewing_manager_id: Option<EmployeeId>,
    /// Manager stage approval.
    pub manager_approval: Option<ApprovalStamp>,
    /// HR stage approval.
    pub hr_approval: Option<ApprovalStamp>,
    /// Rejection details, set only when rejected.
    pub rejection: Option<Rejection>,
    /// Optimistic concurrency counter, bumped by every transition.
    pub version: i32,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}

impl LeaveApplication {
    /// Year of the balance bucket this application draws from.
    #[must_use]
    pub fn balance_year(&self) -> i32 {
        self.start_date.year()
    }

    /// The balance bucket this application draws from.
    #[must_use]
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey::new(self.employee_id, self.leave_type, self.balance_year())
    }

    /// The inclusive date range covered by this application.
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        DateRange::from_ordered(self.start_date, self.end_date)
    }

    /// True when the manager stage is done and only HR remains.
    #[must_use]
    pub fn awaiting_hr(&self) -> bool {
        self.status == LeaveStatus::Pending
            && self.requires_hr_approval
            && (self.reviewing_manager_id.is_none() || self.manager_approval.is_some())
    }

    /// True when a manager decision is still outstanding.
    #[must_use]
    pub fn awaiting_manager(&self) -> bool {
        self.status == LeaveStatus::Pending
            && self.reviewing_manager_id.is_some()
            && self.manager_approval.is_none()
    }
}

/// Input for submitting a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitLeave {
    /// Leave category.
    pub leave_type: LeaveType,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Days to charge.
    pub number_of_days: Decimal,
    /// Half-day request.
    pub is_half_day: bool,
    /// Applicant's reason.
    pub reason: String,
    /// Optional supporting document reference.
    pub attachment_ref: Option<String>,
}

/// A reviewer's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Approve the stage.
    Approve,
    /// Reject the application with an optional reason.
    Reject {
        /// Free-text reason.
        reason: Option<String>,
    },
}

impl Decision {
    /// Builds a decision from an approve flag and an optional reason.
    /// A blank reason is dropped.
    #[must_use]
    pub fn from_flag(approved: bool, reason: Option<String>) -> Self {
        if approved {
            Self::Approve
        } else {
            Self::Reject {
                reason: reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty()),
            }
        }
    }
}

/// What a notification tells the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Manager approved, HR decision still pending.
    ManagerApproved,
    /// Finally approved.
    Approved,
    /// Rejected.
    Rejected,
}

impl NotificationKind {
    /// Status word shown to the applicant.
    #[must_use]
    pub fn status_word(&self) -> &'static str {
        match self {
            Self::ManagerApproved => "approved by your manager",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// The outcome of a valid transition: the new application state, the
/// balance move to apply with it and the notification to emit after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveTransition {
    /// Version the stored application must still have.
    pub expected_version: i32,
    /// Application after the transition, version already bumped.
    pub application: LeaveApplication,
    /// Balance move to apply atomically with the status change.
    pub ledger: Option<LedgerOp>,
    /// Notification to emit once the transition is durable.
    pub notification: Option<NotificationKind>,
}
