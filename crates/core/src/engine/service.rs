//! The leave lifecycle engine.
//!
//! [`LeaveEngine`] orchestrates every operation: it loads what the pure
//! rules in [`LeaveWorkflowService`] need, consults the entitlement gate,
//! hands the resulting transition to the store to apply atomically and
//! finally queues the notification.

use chrono::Utc;
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::outbox::NotificationOutbox;
use crate::engine::ports::{Capability, Entitlement, EntitlementGate, Notification};
use crate::engine::store::LeaveStore;
use crate::ledger::{BalanceKey, LeaveBalance, LeaveType};
use crate::workflow::{
    Actor, DateRange, Decision, EmployeeProfile, LeaveApplication, LeaveError, LeaveTransition,
    LeaveWorkflowService, SubmitLeave,
};

/// Result of a year-end carry-forward run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarryForwardSummary {
    /// Year the days were carried from.
    pub from_year: i32,
    /// Year the days were carried into.
    pub to_year: i32,
    /// Next-year buckets written.
    pub buckets_updated: usize,
}

/// Entry point for all leave lifecycle operations.
#[derive(Clone)]
pub struct LeaveEngine {
    store: Arc<dyn LeaveStore>,
    gate: Arc<dyn EntitlementGate>,
    outbox: NotificationOutbox,
}

impl LeaveEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        store: Arc<dyn LeaveStore>,
        gate: Arc<dyn EntitlementGate>,
        outbox: NotificationOutbox,
    ) -> Self {
        Self {
            store,
            gate,
            outbox,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn LeaveStore> {
        &self.store
    }

    // ========== Commands ==========

    /// Submits a new leave application for `employee_id`.
    ///
    /// Days are reserved in the bucket for the start date's year. No
    /// notification is sent.
    pub async fn submit_leave(
        &self,
        employee_id: EmployeeId,
        request: SubmitLeave,
    ) -> Result<LeaveApplication, LeaveError> {
        LeaveWorkflowService::validate_submission(&request)?;
        let applicant = self.load_employee(employee_id).await?;

        match self
            .gate
            .check_allowed(applicant.company_id, Capability::CreateLeaveApplication)
            .await?
        {
            Entitlement::Allowed => {}
            Entitlement::Denied(reason) => {
                info!(
                    company_id = %applicant.company_id,
                    employee_id = %employee_id,
                    reason = %reason,
                    "Leave submission refused by plan"
                );
                return Err(LeaveError::EntitlementDenied(reason));
            }
        }

        let policy = self
            .store
            .find_policy(applicant.company_id, request.leave_type)
            .await?;
        let (application, reserve) =
            LeaveWorkflowService::submit(&applicant, request, policy.as_ref(), Utc::now())?;

        let balance = self.store.insert_application(&application, reserve).await?;

        info!(
            application_id = %application.id,
            employee_id = %employee_id,
            leave_type = %application.leave_type,
            days = %application.number_of_days,
            requires_hr_approval = application.requires_hr_approval,
            pending = %balance.pending,
            available = %balance.available,
            "Leave application submitted"
        );
        Ok(application)
    }

    /// Records the reviewing manager's decision.
    pub async fn decide_as_manager(
        &self,
        application_id: LeaveApplicationId,
        actor: &Actor,
        decision: Decision,
    ) -> Result<LeaveApplication, LeaveError> {
        let current = self.load_application(application_id).await?;
        let transition =
            LeaveWorkflowService::decide_as_manager(&current, actor, decision, Utc::now())?;
        self.commit_transition(transition, actor, "manager decision", "decide on")
            .await
    }

    /// Records the HR decision.
    pub async fn decide_as_hr(
        &self,
        application_id: LeaveApplicationId,
        actor: &Actor,
        decision: Decision,
    ) -> Result<LeaveApplication, LeaveError> {
        let current = self.load_application(application_id).await?;
        let transition = LeaveWorkflowService::decide_as_hr(&current, actor, decision, Utc::now())?;
        self.commit_transition(transition, actor, "hr decision", "decide on")
            .await
    }

    /// Cancels a pending application on behalf of its owner.
    pub async fn cancel_leave(
        &self,
        application_id: LeaveApplicationId,
        actor: &Actor,
    ) -> Result<LeaveApplication, LeaveError> {
        let current = self.load_application(application_id).await?;
        let transition = LeaveWorkflowService::cancel(&current, actor, Utc::now())?;
        self.commit_transition(transition, actor, "cancellation", "cancel")
            .await
    }

    // ========== Queries ==========

    /// Returns one bucket, or an all-zero view when it does not exist yet.
    pub async fn get_balance(
        &self,
        employee_id: EmployeeId,
        leave_type: LeaveType,
        year: i32,
    ) -> Result<LeaveBalance, LeaveError> {
        let key = BalanceKey::new(employee_id, leave_type, year);
        Ok(self
            .store
            .find_balance(&key)
            .await?
            .unwrap_or_else(|| LeaveBalance::empty(key)))
    }

    /// Lists an employee's buckets for a year.
    pub async fn list_balances(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        self.store.list_balances(employee_id, year).await
    }

    /// Loads an application visible to `company_id`.
    pub async fn get_application(
        &self,
        application_id: LeaveApplicationId,
        company_id: CompanyId,
    ) -> Result<LeaveApplication, LeaveError> {
        let application = self.load_application(application_id).await?;
        if application.company_id != company_id {
            return Err(LeaveError::ApplicationNotFound(application_id));
        }
        Ok(application)
    }

    /// Lists an employee's applications, newest first.
    pub async fn list_my_applications(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        self.store.list_applications_for_employee(employee_id).await
    }

    /// Counts an employee's pending applications.
    pub async fn count_pending_applications(
        &self,
        employee_id: EmployeeId,
    ) -> Result<usize, LeaveError> {
        let applications = self.store.list_applications_for_employee(employee_id).await?;
        Ok(applications
            .iter()
            .filter(|a| !a.status.is_terminal())
            .count())
    }

    /// Applications waiting on the manager's decision.
    pub async fn pending_for_manager(
        &self,
        manager_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        self.store.list_pending_for_manager(manager_id).await
    }

    /// Applications of the actor's company ready for the HR decision.
    pub async fn pending_for_hr(&self, actor: &Actor) -> Result<Vec<LeaveApplication>, LeaveError> {
        ensure_hr(actor)?;
        self.store.list_pending_for_hr(actor.company_id).await
    }

    /// Company leave calendar: every application of the actor's company
    /// whose dates intersect `range`, ordered by start date.
    pub async fn list_company_applications_in_range(
        &self,
        actor: &Actor,
        range: DateRange,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        ensure_hr(actor)?;
        self.store
            .list_applications_in_range(actor.company_id, range)
            .await
    }

    // ========== Ledger maintenance ==========

    /// Grants every active policy's annual quota to the employee for `year`.
    ///
    /// Missing buckets are created; buckets created lazily by a reservation
    /// (quota still zero) get the quota; other quotas are left alone.
    pub async fn initialize_balances(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let employee = self.load_employee(employee_id).await?;
        let policies = self.store.list_active_policies(employee.company_id).await?;

        for policy in &policies {
            let key = BalanceKey::new(employee_id, policy.leave_type, year);
            self.store.ensure_quota(&key, policy.annual_quota).await?;
        }

        info!(
            employee_id = %employee_id,
            year,
            policies = policies.len(),
            "Leave balances initialized"
        );
        self.store.list_balances(employee_id, year).await
    }

    /// Carries unused days from `year` into `year + 1` for every
    /// carry-forward policy of the company.
    ///
    /// Re-running sets the same values again.
    pub async fn carry_forward(
        &self,
        company_id: CompanyId,
        year: i32,
    ) -> Result<CarryForwardSummary, LeaveError> {
        let next_year = year + 1;
        let mut summary = CarryForwardSummary {
            from_year: year,
            to_year: next_year,
            buckets_updated: 0,
        };

        let policies = self.store.list_active_policies(company_id).await?;
        for policy in policies.iter().filter(|p| p.carry_forward) {
            let buckets = self
                .store
                .list_company_balances(company_id, policy.leave_type, year)
                .await?;
            for bucket in buckets {
                let carried = bucket.carry_over_amount(policy.max_carry_forward);
                let key = BalanceKey::new(bucket.employee_id, policy.leave_type, next_year);
                self.store
                    .set_carried_forward(&key, policy.annual_quota, carried)
                    .await?;
                debug!(balance = %key, carried = %carried, "Carried forward");
                summary.buckets_updated += 1;
            }
        }

        info!(
            company_id = %company_id,
            from_year = year,
            buckets = summary.buckets_updated,
            "Year-end carry-forward complete"
        );
        Ok(summary)
    }

    // ========== Internals ==========

    async fn load_employee(&self, employee_id: EmployeeId) -> Result<EmployeeProfile, LeaveError> {
        self.store
            .find_employee(employee_id)
            .await?
            .ok_or(LeaveError::EmployeeNotFound(employee_id))
    }

    async fn load_application(
        &self,
        application_id: LeaveApplicationId,
    ) -> Result<LeaveApplication, LeaveError> {
        self.store
            .find_application(application_id)
            .await?
            .ok_or(LeaveError::ApplicationNotFound(application_id))
    }

    async fn commit_transition(
        &self,
        transition: LeaveTransition,
        actor: &Actor,
        action: &'static str,
        verb: &'static str,
    ) -> Result<LeaveApplication, LeaveError> {
        let application_id = transition.application.id;
        match self.store.apply_transition(&transition).await {
            Ok(balance) => {
                info!(
                    application_id = %application_id,
                    actor_id = %actor.employee_id,
                    action,
                    status = %transition.application.status,
                    ledger = ?transition.ledger.map(|op| op.name()),
                    pending = ?balance.as_ref().map(|b| b.pending),
                    used = ?balance.as_ref().map(|b| b.used),
                    "Leave application transitioned"
                );
            }
            Err(LeaveError::ConcurrentModification(id)) => {
                warn!(application_id = %id, action, "Lost transition race");
                // Report the terminal state when the winner already closed it.
                let current = self.load_application(id).await?;
                if current.status.is_terminal() {
                    return Err(LeaveError::InvalidStatus {
                        status: current.status,
                        action: verb,
                    });
                }
                return Err(LeaveError::ConcurrentModification(id));
            }
            Err(e) => return Err(e),
        }

        let LeaveTransition {
            application,
            notification,
            ..
        } = transition;
        if let Some(kind) = notification {
            match self.store.find_employee(application.employee_id).await {
                Ok(Some(applicant)) => {
                    self.outbox
                        .emit(Notification::for_applicant(&applicant, kind, application.clone()));
                }
                Ok(None) => warn!(
                    application_id = %application.id,
                    "Applicant vanished, skipping notification"
                ),
                Err(e) => warn!(
                    application_id = %application.id,
                    error = %e,
                    "Could not load applicant, skipping notification"
                ),
            }
        }
        Ok(application)
    }
}

fn ensure_hr(actor: &Actor) -> Result<(), LeaveError> {
    if actor.role.is_hr() {
        return Ok(());
    }
    Err(LeaveError::NotHrReviewer {
        actor: actor.employee_id,
        company: actor.company_id,
    })
}
