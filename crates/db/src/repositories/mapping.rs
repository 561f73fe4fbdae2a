//! Conversions between database rows and core domain types.

use chrono::{DateTime, FixedOffset, Utc};
use leavemark_core::ledger::{LeaveBalance, LeavePolicy, LeaveType};
use leavemark_core::workflow::{
    ApprovalStamp, EmployeeProfile, EmployeeRole, LeaveApplication, LeaveError, LeaveStatus,
    Rejection,
};
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId, LeavePolicyId};
use uuid::Uuid;

use crate::entities::{
    employees, leave_applications, leave_balances, leave_policies,
    sea_orm_active_enums::{
        EmployeeRole as DbEmployeeRole, LeaveStatus as DbLeaveStatus, LeaveType as DbLeaveType,
    },
};

/// Wraps any database error into the engine's error type.
pub(crate) fn db_err(e: impl std::fmt::Display) -> LeaveError {
    LeaveError::Database(e.to_string())
}

pub(crate) fn to_utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

pub(crate) fn to_db_time(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.fixed_offset()
}

impl From<DbLeaveType> for LeaveType {
    fn from(value: DbLeaveType) -> Self {
        match value {
            DbLeaveType::CasualLeave => Self::CasualLeave,
            DbLeaveType::SickLeave => Self::SickLeave,
            DbLeaveType::EarnedLeave => Self::EarnedLeave,
            DbLeaveType::LossOfPay => Self::LossOfPay,
            DbLeaveType::CompOff => Self::CompOff,
            DbLeaveType::OptionalHoliday => Self::OptionalHoliday,
        }
    }
}

impl From<LeaveType> for DbLeaveType {
    fn from(value: LeaveType) -> Self {
        match value {
            LeaveType::CasualLeave => Self::CasualLeave,
            LeaveType::SickLeave => Self::SickLeave,
            LeaveType::EarnedLeave => Self::EarnedLeave,
            LeaveType::LossOfPay => Self::LossOfPay,
            LeaveType::CompOff => Self::CompOff,
            LeaveType::OptionalHoliday => Self::OptionalHoliday,
        }
    }
}

impl From<DbLeaveStatus> for LeaveStatus {
    fn from(value: DbLeaveStatus) -> Self {
        match value {
            DbLeaveStatus::Pending => Self::Pending,
            DbLeaveStatus::Approved => Self::Approved,
            DbLeaveStatus::Rejected => Self::Rejected,
            DbLeaveStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<LeaveStatus> for DbLeaveStatus {
    fn from(value: LeaveStatus) -> Self {
        match value {
            LeaveStatus::Pending => Self::Pending,
            LeaveStatus::Approved => Self::Approved,
            LeaveStatus::Rejected => Self::Rejected,
            LeaveStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<DbEmployeeRole> for EmployeeRole {
    fn from(value: DbEmployeeRole) -> Self {
        match value {
            DbEmployeeRole::SuperAdmin => Self::SuperAdmin,
            DbEmployeeRole::HrAdmin => Self::HrAdmin,
            DbEmployeeRole::Manager => Self::Manager,
            DbEmployeeRole::Employee => Self::Employee,
        }
    }
}

impl From<EmployeeRole> for DbEmployeeRole {
    fn from(value: EmployeeRole) -> Self {
        match value {
            EmployeeRole::SuperAdmin => Self::SuperAdmin,
            EmployeeRole::HrAdmin => Self::HrAdmin,
            EmployeeRole::Manager => Self::Manager,
            EmployeeRole::Employee => Self::Employee,
        }
    }
}

pub(crate) fn employee_to_core(model: employees::Model) -> EmployeeProfile {
    EmployeeProfile {
        id: EmployeeId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        manager_id: model.manager_id.map(EmployeeId::from_uuid),
        role: model.role.into(),
        email: model.email,
        full_name: model.full_name,
    }
}

pub(crate) fn policy_to_core(model: leave_policies::Model) -> LeavePolicy {
    LeavePolicy {
        id: LeavePolicyId::from_uuid(model.id),
        company_id: CompanyId::from_uuid(model.company_id),
        leave_type: model.leave_type.into(),
        annual_quota: model.annual_quota,
        carry_forward: model.carry_forward,
        max_carry_forward: model.max_carry_forward,
        half_day_allowed: model.half_day_allowed,
        requires_hr_approval: model.requires_hr_approval,
        active: model.active,
    }
}

pub(crate) fn balance_to_core(model: leave_balances::Model) -> LeaveBalance {
    LeaveBalance {
        employee_id: EmployeeId::from_uuid(model.employee_id),
        leave_type: model.leave_type.into(),
        year: model.year,
        total_quota: model.total_quota,
        used: model.used,
        pending: model.pending,
        carried_forward: model.carried_forward,
        available: model.available,
        updated_at: to_utc(model.updated_at),
    }
}

fn stamp(by: Option<Uuid>, at: Option<DateTime<FixedOffset>>) -> Option<ApprovalStamp> {
    match (by, at) {
        (Some(by), Some(at)) => Some(ApprovalStamp {
            approver_id: EmployeeId::from_uuid(by),
            approved_at: to_utc(at),
        }),
        _ => None,
    }
}

pub(crate) fn application_to_core(model: leave_applications::Model) -> LeaveApplication {
    let rejection = match (model.rejected_by, model.rejected_at) {
        (Some(by), Some(at)) => Some(Rejection {
            rejected_by: EmployeeId::from_uuid(by),
            reason: model.rejection_reason,
            rejected_at: to_utc(at),
        }),
        _ => None,
    };
    LeaveApplication {
        id: LeaveApplicationId::from_uuid(model.id),
        employee_id: EmployeeId::from_uuid(model.employee_id),
        company_id: CompanyId::from_uuid(model.company_id),
        leave_type: model.leave_type.into(),
        start_date: model.start_date,
        end_date: model.end_date,
        number_of_days: model.number_of_days,
        is_half_day: model.is_half_day,
        reason: model.reason,
        attachment_ref: model.attachment_ref,
        status: model.status.into(),
        requires_hr_approval: model.requires_hr_approval,
        reviewing_manager_id: model.reviewing_manager_id.map(EmployeeId::from_uuid),
        manager_approval: stamp(model.manager_approved_by, model.manager_approved_at),
        hr_approval: stamp(model.hr_approved_by, model.hr_approved_at),
        rejection,
        version: model.version,
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
    }
}
