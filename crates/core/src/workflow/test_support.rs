//! Fixtures shared by the workflow and engine unit tests.

use chrono::{NaiveDate, Utc};
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId, LeavePolicyId};
use rust_decimal_macros::dec;

use crate::ledger::{LeavePolicy, LeaveType};
use crate::workflow::types::{Actor, EmployeeProfile, EmployeeRole, LeaveApplication, LeaveStatus};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn profile(manager_id: Option<EmployeeId>) -> EmployeeProfile {
    EmployeeProfile {
        id: EmployeeId::new(),
        company_id: CompanyId::new(),
        manager_id,
        role: EmployeeRole::Employee,
        email: "asha@example.com".to_string(),
        full_name: "Asha Rao".to_string(),
    }
}

pub(crate) fn actor(company_id: CompanyId, role: EmployeeRole) -> Actor {
    Actor::new(EmployeeId::new(), company_id, role)
}

pub(crate) fn hr_actor(company_id: CompanyId) -> Actor {
    actor(company_id, EmployeeRole::HrAdmin)
}

/// The reviewing manager of `app`.
pub(crate) fn manager_actor(app: &LeaveApplication) -> Actor {
    Actor::new(
        app.reviewing_manager_id.unwrap(),
        app.company_id,
        EmployeeRole::Manager,
    )
}

pub(crate) fn policy(company_id: CompanyId, requires_hr_approval: bool) -> LeavePolicy {
    LeavePolicy {
        id: LeavePolicyId::new(),
        company_id,
        leave_type: LeaveType::CasualLeave,
        annual_quota: dec!(12),
        carry_forward: true,
        max_carry_forward: dec!(5),
        half_day_allowed: true,
        requires_hr_approval,
        active: true,
    }
}

/// A pending single-stage casual leave with a reviewing manager.
pub(crate) fn application(start: NaiveDate, end: NaiveDate) -> LeaveApplication {
    let now = Utc::now();
    LeaveApplication {
        id: LeaveApplicationId::new(),
        employee_id: EmployeeId::new(),
        company_id: CompanyId::new(),
        leave_type: LeaveType::CasualLeave,
        start_date: start,
        end_date: end,
        number_of_days: dec!(3),
        is_half_day: false,
        reason: "family trip".to_string(),
        attachment_ref: None,
        status: LeaveStatus::Pending,
        requires_hr_approval: false,
        reviewing_manager_id: Some(EmployeeId::new()),
        manager_approval: None,
        hr_approval: None,
        rejection: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}
