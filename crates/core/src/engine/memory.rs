//! In-memory [`LeaveStore`] backed by `DashMap`.
//!
//! Lock order for transitions is application entry first, then the balance
//! entry. Submissions take a per-employee async mutex so that the overlap
//! check, the insert and the reservation cannot interleave with another
//! submission of the same employee.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::engine::store::LeaveStore;
use crate::ledger::{BalanceKey, LedgerError, LeaveBalance, LeavePolicy, LeaveType, LedgerOp};
use crate::workflow::{
    DateRange, EmployeeProfile, LeaveApplication, LeaveError, LeaveTransition, OverlapChecker,
};

/// Process-local store for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryLeaveStore {
    employees: DashMap<EmployeeId, EmployeeProfile>,
    policies: DashMap<(CompanyId, LeaveType), LeavePolicy>,
    applications: DashMap<LeaveApplicationId, LeaveApplication>,
    balances: DashMap<BalanceKey, LeaveBalance>,
    submission_locks: DashMap<EmployeeId, Arc<Mutex<()>>>,
}

impl InMemoryLeaveStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an employee.
    pub fn upsert_employee(&self, employee: EmployeeProfile) {
        self.employees.insert(employee.id, employee);
    }

    /// Adds or replaces a company policy.
    pub fn upsert_policy(&self, policy: LeavePolicy) {
        self.policies
            .insert((policy.company_id, policy.leave_type), policy);
    }

    /// Adds or replaces a balance bucket.
    pub fn upsert_balance(&self, balance: LeaveBalance) {
        self.balances.insert(balance.key(), balance);
    }

    fn insert_locked(
        &self,
        application: &LeaveApplication,
        reserve: LedgerOp,
    ) -> Result<LeaveBalance, LeaveError> {
        {
            let existing: Vec<LeaveApplication> = self
                .applications
                .iter()
                .filter(|e| e.value().employee_id == application.employee_id)
                .map(|e| e.value().clone())
                .collect();
            let conflicts = OverlapChecker::find_conflicts(
                &existing,
                application.employee_id,
                application.date_range(),
                None,
            );
            OverlapChecker::ensure_free(&conflicts)?;
        }

        let key = application.balance_key();
        let balance = {
            let mut bucket = self
                .balances
                .entry(key)
                .or_insert_with(|| LeaveBalance::empty(key));
            let mut next = bucket.clone();
            reserve.apply(&mut next)?;
            *bucket = next.clone();
            next
        };
        self.applications.insert(application.id, application.clone());
        Ok(balance)
    }

    fn apply_locked(&self, transition: &LeaveTransition) -> Result<Option<LeaveBalance>, LeaveError> {
        let updated = &transition.application;
        let mut stored = self
            .applications
            .get_mut(&updated.id)
            .ok_or(LeaveError::ApplicationNotFound(updated.id))?;
        if stored.version != transition.expected_version {
            return Err(LeaveError::ConcurrentModification(updated.id));
        }

        let balance = match transition.ledger {
            Some(op) => {
                let key = updated.balance_key();
                let mut bucket = if op.creates_bucket() {
                    self.balances
                        .entry(key)
                        .or_insert_with(|| LeaveBalance::empty(key))
                } else {
                    self.balances
                        .get_mut(&key)
                        .ok_or(LedgerError::BucketMissing(key))?
                };
                let mut next = bucket.clone();
                op.apply(&mut next)?;
                *bucket = next.clone();
                Some(next)
            }
            None => None,
        };

        *stored = updated.clone();
        Ok(balance)
    }

    fn collect_applications<F>(&self, filter: F, newest_first: bool) -> Vec<LeaveApplication>
    where
        F: Fn(&LeaveApplication) -> bool,
    {
        let mut apps: Vec<LeaveApplication> = self
            .applications
            .iter()
            .filter(|e| filter(e.value()))
            .map(|e| e.value().clone())
            .collect();
        apps.sort_by_key(|a| (a.created_at, a.id.into_inner()));
        if newest_first {
            apps.reverse();
        }
        apps
    }
}

#[async_trait]
impl LeaveStore for InMemoryLeaveStore {
    async fn find_employee(&self, id: EmployeeId) -> Result<Option<EmployeeProfile>, LeaveError> {
        Ok(self.employees.get(&id).map(|e| e.value().clone()))
    }

    async fn find_policy(
        &self,
        company_id: CompanyId,
        leave_type: LeaveType,
    ) -> Result<Option<LeavePolicy>, LeaveError> {
        Ok(self
            .policies
            .get(&(company_id, leave_type))
            .map(|p| p.value().clone()))
    }

    async fn list_active_policies(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<LeavePolicy>, LeaveError> {
        let mut policies: Vec<LeavePolicy> = self
            .policies
            .iter()
            .filter(|p| p.company_id == company_id && p.active)
            .map(|p| p.value().clone())
            .collect();
        policies.sort_by_key(|p| p.leave_type.as_str());
        Ok(policies)
    }

    async fn find_application(
        &self,
        id: LeaveApplicationId,
    ) -> Result<Option<LeaveApplication>, LeaveError> {
        Ok(self.applications.get(&id).map(|a| a.value().clone()))
    }

    async fn insert_application(
        &self,
        application: &LeaveApplication,
        reserve: LedgerOp,
    ) -> Result<LeaveBalance, LeaveError> {
        let lock = self
            .submission_locks
            .entry(application.employee_id)
            .or_default()
            .clone();
        let _guard = lock.lock().await;
        self.insert_locked(application, reserve)
    }

    async fn apply_transition(
        &self,
        transition: &LeaveTransition,
    ) -> Result<Option<LeaveBalance>, LeaveError> {
        self.apply_locked(transition)
    }

    async fn list_applications_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        Ok(self.collect_applications(|a| a.employee_id == employee_id, true))
    }

    async fn list_pending_for_manager(
        &self,
        manager_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        Ok(self.collect_applications(
            |a| a.awaiting_manager() && a.reviewing_manager_id == Some(manager_id),
            false,
        ))
    }

    async fn list_pending_for_hr(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        Ok(self.collect_applications(|a| a.company_id == company_id && a.awaiting_hr(), false))
    }

    async fn list_applications_in_range(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        let mut apps = self.collect_applications(
            |a| a.company_id == company_id && a.date_range().overlaps(&range),
            false,
        );
        apps.sort_by_key(|a| a.start_date);
        Ok(apps)
    }

    async fn find_balance(&self, key: &BalanceKey) -> Result<Option<LeaveBalance>, LeaveError> {
        Ok(self.balances.get(key).map(|b| b.value().clone()))
    }

    async fn list_balances(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let mut balances: Vec<LeaveBalance> = self
            .balances
            .iter()
            .filter(|b| b.employee_id == employee_id && b.year == year)
            .map(|b| b.value().clone())
            .collect();
        balances.sort_by_key(|b| b.leave_type.as_str());
        Ok(balances)
    }

    async fn list_company_balances(
        &self,
        company_id: CompanyId,
        leave_type: LeaveType,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let mut balances: Vec<LeaveBalance> = self
            .balances
            .iter()
            .filter(|b| b.leave_type == leave_type && b.year == year)
            .filter(|b| {
                self.employees
                    .get(&b.employee_id)
                    .is_some_and(|e| e.company_id == company_id)
            })
            .map(|b| b.value().clone())
            .collect();
        balances.sort_by_key(|b| b.employee_id.into_inner());
        Ok(balances)
    }

    async fn ensure_quota(
        &self,
        key: &BalanceKey,
        quota: Decimal,
    ) -> Result<LeaveBalance, LeaveError> {
        let mut bucket = self
            .balances
            .entry(*key)
            .or_insert_with(|| LeaveBalance::empty(*key));
        if bucket.total_quota == Decimal::ZERO && quota != Decimal::ZERO {
            let mut next = bucket.clone();
            next.set_total_quota(quota)?;
            *bucket = next;
        }
        Ok(bucket.clone())
    }

    async fn set_carried_forward(
        &self,
        key: &BalanceKey,
        quota_if_missing: Decimal,
        carried_forward: Decimal,
    ) -> Result<LeaveBalance, LeaveError> {
        let mut bucket = match self.balances.entry(*key) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                entry.insert(LeaveBalance::with_quota(*key, quota_if_missing)?)
            }
        };
        let mut next = bucket.clone();
        next.set_carried_forward(carried_forward)?;
        *bucket = next.clone();
        Ok(next)
    }
}
