//! Storage port.
//!
//! A [`LeaveStore`] persists applications, balances and the read-only
//! employee and policy data. The two write paths carry the engine's
//! atomicity guarantees:
//!
//! - [`LeaveStore::insert_application`] runs the overlap check, the insert
//!   and the reservation as one unit, serialized per employee.
//! - [`LeaveStore::apply_transition`] compares the stored version, writes
//!   the new application state and applies the ledger move as one unit.

use async_trait::async_trait;
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};
use rust_decimal::Decimal;

use crate::ledger::{BalanceKey, LeaveBalance, LeavePolicy, LeaveType, LedgerOp};
use crate::workflow::{DateRange, EmployeeProfile, LeaveApplication, LeaveError, LeaveTransition};

/// Persistence for the leave engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaveStore: Send + Sync {
    // ========== Read-only reference data ==========

    /// Loads an employee.
    async fn find_employee(&self, id: EmployeeId) -> Result<Option<EmployeeProfile>, LeaveError>;

    /// Loads the company's policy for a leave type, active or not.
    async fn find_policy(
        &self,
        company_id: CompanyId,
        leave_type: LeaveType,
    ) -> Result<Option<LeavePolicy>, LeaveError>;

    /// Lists the company's active policies.
    async fn list_active_policies(&self, company_id: CompanyId)
    -> Result<Vec<LeavePolicy>, LeaveError>;

    // ========== Applications ==========

    /// Loads an application.
    async fn find_application(
        &self,
        id: LeaveApplicationId,
    ) -> Result<Option<LeaveApplication>, LeaveError>;

    /// Atomically re-checks overlaps, inserts `application` and applies
    /// `reserve` to its bucket (creating the bucket if needed).
    ///
    /// Fails with [`LeaveError::Overlap`] when a live application of the same
    /// employee intersects the requested range.
    async fn insert_application(
        &self,
        application: &LeaveApplication,
        reserve: LedgerOp,
    ) -> Result<LeaveBalance, LeaveError>;

    /// Atomically applies a transition.
    ///
    /// Fails with [`LeaveError::ConcurrentModification`] when the stored
    /// version differs from `transition.expected_version`. Returns the
    /// updated bucket when the transition moved days.
    async fn apply_transition(
        &self,
        transition: &LeaveTransition,
    ) -> Result<Option<LeaveBalance>, LeaveError>;

    /// Lists an employee's applications, newest first.
    async fn list_applications_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError>;

    /// Pending applications waiting on `manager_id`'s decision, oldest first.
    async fn list_pending_for_manager(
        &self,
        manager_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError>;

    /// Pending applications of the company ready for HR, oldest first.
    async fn list_pending_for_hr(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<LeaveApplication>, LeaveError>;

    /// Applications of the company whose inclusive date range intersects
    /// `range`, any status, ordered by start date.
    async fn list_applications_in_range(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LeaveApplication>, LeaveError>;

    // ========== Balances ==========

    /// Loads one bucket.
    async fn find_balance(&self, key: &BalanceKey) -> Result<Option<LeaveBalance>, LeaveError>;

    /// Lists an employee's buckets for a year.
    async fn list_balances(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError>;

    /// Lists the buckets of one leave type and year across a company.
    async fn list_company_balances(
        &self,
        company_id: CompanyId,
        leave_type: LeaveType,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError>;

    /// Creates the bucket with `quota`, or sets `quota` on an existing bucket
    /// whose quota is still zero. Non-zero quotas are left alone.
    async fn ensure_quota(&self, key: &BalanceKey, quota: Decimal)
    -> Result<LeaveBalance, LeaveError>;

    /// Sets `carried_forward` on the bucket, creating it with
    /// `quota_if_missing` first when absent.
    async fn set_carried_forward(
        &self,
        key: &BalanceKey,
        quota_if_missing: Decimal,
        carried_forward: Decimal,
    ) -> Result<LeaveBalance, LeaveError>;
}
