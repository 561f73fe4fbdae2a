//! `SeaORM` active enums mirroring the Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `leave_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "leave_type")]
pub enum LeaveType {
    /// Casual leave.
    #[sea_orm(string_value = "CASUAL_LEAVE")]
    CasualLeave,
    /// Sick leave.
    #[sea_orm(string_value = "SICK_LEAVE")]
    SickLeave,
    /// Earned leave.
    #[sea_orm(string_value = "EARNED_LEAVE")]
    EarnedLeave,
    /// Unpaid leave.
    #[sea_orm(string_value = "LOSS_OF_PAY")]
    LossOfPay,
    /// Compensatory off.
    #[sea_orm(string_value = "COMP_OFF")]
    CompOff,
    /// Optional holiday.
    #[sea_orm(string_value = "OPTIONAL_HOLIDAY")]
    OptionalHoliday,
}

/// `leave_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "leave_status")]
pub enum LeaveStatus {
    /// Awaiting decisions.
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Finally approved.
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Rejected.
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    /// Cancelled by the owner.
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// `employee_role` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "employee_role")]
pub enum EmployeeRole {
    /// Platform administrator.
    #[sea_orm(string_value = "SUPER_ADMIN")]
    SuperAdmin,
    /// Company HR administrator.
    #[sea_orm(string_value = "HR_ADMIN")]
    HrAdmin,
    /// People manager.
    #[sea_orm(string_value = "MANAGER")]
    Manager,
    /// Regular employee.
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
}

/// `subscription_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "subscription_status")]
pub enum SubscriptionStatus {
    /// Paid and current.
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Trial period.
    #[sea_orm(string_value = "TRIAL")]
    Trial,
    /// Past its end date.
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    /// Cancelled by the company.
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}
