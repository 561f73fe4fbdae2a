//! Ledger domain types: leave categories, bucket keys, balances and policies.

use chrono::{DateTime, Utc};
use leavemark_shared::types::{CompanyId, EmployeeId, LeavePolicyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of leave. Every category has its own balance bucket per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    /// Casual leave.
    CasualLeave,
    /// Sick leave.
    SickLeave,
    /// Earned (privilege) leave.
    EarnedLeave,
    /// Unpaid leave.
    LossOfPay,
    /// Compensatory off for extra days worked.
    CompOff,
    /// Optional holiday chosen from the company list.
    OptionalHoliday,
}

impl LeaveType {
    /// All leave categories in display order.
    pub const ALL: [Self; 6] = [
        Self::CasualLeave,
        Self::SickLeave,
        Self::EarnedLeave,
        Self::LossOfPay,
        Self::CompOff,
        Self::OptionalHoliday,
    ];

    /// Returns the wire representation of the leave type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CasualLeave => "CASUAL_LEAVE",
            Self::SickLeave => "SICK_LEAVE",
            Self::EarnedLeave => "EARNED_LEAVE",
            Self::LossOfPay => "LOSS_OF_PAY",
            Self::CompOff => "COMP_OFF",
            Self::OptionalHoliday => "OPTIONAL_HOLIDAY",
        }
    }

    /// Human readable label used in notification emails.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CasualLeave => "Casual Leave",
            Self::SickLeave => "Sick Leave",
            Self::EarnedLeave => "Earned Leave",
            Self::LossOfPay => "Loss of Pay",
            Self::CompOff => "Comp Off",
            Self::OptionalHoliday => "Optional Holiday",
        }
    }

    /// Parses a leave type, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CASUAL_LEAVE" => Some(Self::CasualLeave),
            "SICK_LEAVE" => Some(Self::SickLeave),
            "EARNED_LEAVE" => Some(Self::EarnedLeave),
            "LOSS_OF_PAY" => Some(Self::LossOfPay),
            "COMP_OFF" => Some(Self::CompOff),
            "OPTIONAL_HOLIDAY" => Some(Self::OptionalHoliday),
            _ => None,
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one balance bucket: an employee's allowance of one leave type
/// in one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    /// Owner of the bucket.
    pub employee_id: EmployeeId,
    /// Leave category.
    pub leave_type: LeaveType,
    /// Calendar year.
    pub year: i32,
}

impl BalanceKey {
    /// Creates a new bucket key.
    #[must_use]
    pub const fn new(employee_id: EmployeeId, leave_type: LeaveType, year: i32) -> Self {
        Self {
            employee_id,
            leave_type,
            year,
        }
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.employee_id, self.leave_type, self.year)
    }
}

/// Per-(employee, leave type, year) day counters.
///
/// `available` is always `total_quota + carried_forward - used - pending`.
/// It may go negative when an employee overdraws. The four stored counters
/// must stay non-negative. Mutate through the methods in [`super::balance`] so both rules
/// are re-checked after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    /// Owner of the bucket.
    pub employee_id: EmployeeId,
    /// Leave category.
    pub leave_type: LeaveType,
    /// Calendar year.
    pub year: i32,
    /// Days granted for the year.
    pub total_quota: Decimal,
    /// Days consumed by approved applications.
    pub used: Decimal,
    /// Days reserved by pending applications.
    pub pending: Decimal,
    /// Days brought over from the previous year.
    pub carried_forward: Decimal,
    /// Derived: quota plus carry-over minus used and pending.
    pub available: Decimal,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A company's rules for one leave type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePolicy {
    /// Policy identifier.
    pub id: LeavePolicyId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Leave category governed by this policy.
    pub leave_type: LeaveType,
    /// Days granted per year.
    pub annual_quota: Decimal,
    /// Whether unused days roll into the next year.
    pub carry_forward: bool,
    /// Cap on rolled-over days.
    pub max_carry_forward: Decimal,
    /// Whether half-day applications are accepted.
    pub half_day_allowed: bool,
    /// Whether every application of this type also needs HR sign-off.
    pub requires_hr_approval: bool,
    /// Inactive policies are ignored by balance initialization.
    pub active: bool,
}
