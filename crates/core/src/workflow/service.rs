//! Transition rules for leave applications.
//!
//! All functions here are pure: they take the current application, the
//! actor and the decision, and either refuse or return a [`LeaveTransition`]
//! describing the new state, the balance move and the notification. The
//! engine applies the transition atomically through the store.

use chrono::{DateTime, Utc};
use leavemark_shared::types::LeaveApplicationId;
use rust_decimal::Decimal;

use crate::ledger::{LedgerOp, LeavePolicy};
use crate::workflow::error::LeaveError;
use crate::workflow::overlap::DateRange;
use crate::workflow::types::{
    Actor, ApprovalStamp, Decision, EmployeeProfile, LeaveApplication, LeaveStatus,
    LeaveTransition, NotificationKind, Rejection, SubmitLeave,
};

/// Decimal places kept for day counts.
const DAY_COUNT_SCALE: u32 = 2;

/// Largest day count in hundredths (9999.99).
const MAX_DAY_COUNT_CENTS: i64 = 999_999;

/// Stateless service holding the leave application state machine.
pub struct LeaveWorkflowService;

impl LeaveWorkflowService {
    /// Validates the shape of a submission.
    ///
    /// # Returns
    /// * `Ok(DateRange)` covering the requested days
    /// * `Err(LeaveError::InvalidDateRange)` if `end_date < start_date`
    /// * `Err(LeaveError::InvalidDayCount)` if `number_of_days <= 0`
    /// * `Err(LeaveError::Validation)` if `number_of_days` has more than two
    ///   decimal places or exceeds 9999.99, the limits of the stored column
    pub fn validate_submission(request: &SubmitLeave) -> Result<DateRange, LeaveError> {
        let range = DateRange::new(request.start_date, request.end_date)?;
        let days = request.number_of_days;
        if days <= Decimal::ZERO {
            return Err(LeaveError::InvalidDayCount(days));
        }
        if days.normalize().scale() > DAY_COUNT_SCALE {
            return Err(LeaveError::Validation(format!(
                "Number of days allows at most {DAY_COUNT_SCALE} decimal places, got {days}"
            )));
        }
        let max = Decimal::new(MAX_DAY_COUNT_CENTS, DAY_COUNT_SCALE);
        if days > max {
            return Err(LeaveError::Validation(format!(
                "Number of days must not exceed {max}, got {days}"
            )));
        }
        Ok(range)
    }

    /// Applies the leave type's half-day rule.
    ///
    /// A half-day request must be allowed by the policy and must start and
    /// end on the same day. Without a policy the request is accepted.
    pub fn check_half_day(
        request: &SubmitLeave,
        range: DateRange,
        policy: Option<&LeavePolicy>,
    ) -> Result<(), LeaveError> {
        if !request.is_half_day {
            return Ok(());
        }
        if policy.is_some_and(|p| !p.half_day_allowed) {
            return Err(LeaveError::Validation(format!(
                "Half-day leave is not allowed for {}",
                request.leave_type
            )));
        }
        if range.calendar_days() > 1 {
            return Err(LeaveError::Validation(
                "Half-day leave must start and end on the same day".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds a new pending application and the reservation that goes with it.
    ///
    /// HR sign-off is required when the applicant has no manager or when the
    /// leave type's policy asks for it. The applicant's manager at this
    /// moment becomes the reviewing manager for the application's lifetime.
    pub fn submit(
        applicant: &EmployeeProfile,
        request: SubmitLeave,
        policy: Option<&LeavePolicy>,
        now: DateTime<Utc>,
    ) -> Result<(LeaveApplication, LedgerOp), LeaveError> {
        let range = Self::validate_submission(&request)?;
        Self::check_half_day(&request, range, policy)?;

        let requires_hr_approval =
            applicant.manager_id.is_none() || policy.is_some_and(|p| p.requires_hr_approval);

        let application = LeaveApplication {
            id: LeaveApplicationId::new(),
            employee_id: applicant.id,
            company_id: applicant.company_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            number_of_days: request.number_of_days,
            is_half_day: request.is_half_day,
            reason: request.reason,
            attachment_ref: request.attachment_ref,
            status: LeaveStatus::Pending,
            requires_hr_approval,
            reviewing_manager_id: applicant.manager_id,
            manager_approval: None,
            hr_approval: None,
            rejection: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let reserve = LedgerOp::Reserve(application.number_of_days);
        Ok((application, reserve))
    }

    /// Records the reviewing manager's decision.
    ///
    /// # Returns
    /// * approve without HR: status → Approved, commit, "approved" notice
    /// * approve with HR: manager stamp only, no ledger move, "manager approved" notice
    /// * reject: status → Rejected, release, "rejected" notice
    /// * `Err(LeaveError::NotReviewingManager)` if the actor is not the reviewing manager
    /// * `Err(LeaveError::InvalidStatus)` if the application is not pending
    /// * `Err(LeaveError::ManagerDecisionRecorded)` if the manager already approved
    pub fn decide_as_manager(
        application: &LeaveApplication,
        actor: &Actor,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<LeaveTransition, LeaveError> {
        if application.reviewing_manager_id != Some(actor.employee_id)
            || application.company_id != actor.company_id
        {
            return Err(LeaveError::NotReviewingManager {
                actor: actor.employee_id,
            });
        }
        Self::ensure_pending(application, "decide on")?;
        if application.manager_approval.is_some() {
            return Err(LeaveError::ManagerDecisionRecorded);
        }

        let mut next = Self::next_version(application, now);
        match decision {
            Decision::Approve => {
                next.manager_approval = Some(ApprovalStamp {
                    approver_id: actor.employee_id,
                    approved_at: now,
                });
                if application.requires_hr_approval {
                    Ok(Self::transition(
                        application,
                        next,
                        None,
                        Some(NotificationKind::ManagerApproved),
                    ))
                } else {
                    next.status = LeaveStatus::Approved;
                    let commit = LedgerOp::Commit(application.number_of_days);
                    Ok(Self::transition(
                        application,
                        next,
                        Some(commit),
                        Some(NotificationKind::Approved),
                    ))
                }
            }
            Decision::Reject { reason } => Ok(Self::reject(application, next, actor, reason, now)),
        }
    }

    /// Records the HR decision.
    ///
    /// HR may decide only on applications that require it, and only after
    /// the reviewing manager (if any) has approved.
    pub fn decide_as_hr(
        application: &LeaveApplication,
        actor: &Actor,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<LeaveTransition, LeaveError> {
        if !actor.role.is_hr() || actor.company_id != application.company_id {
            return Err(LeaveError::NotHrReviewer {
                actor: actor.employee_id,
                company: application.company_id,
            });
        }
        Self::ensure_pending(application, "decide on")?;
        if !application.requires_hr_approval {
            return Err(LeaveError::HrNotRequired);
        }
        if application.reviewing_manager_id.is_some() && application.manager_approval.is_none() {
            return Err(LeaveError::ManagerApprovalMissing);
        }

        let mut next = Self::next_version(application, now);
        match decision {
            Decision::Approve => {
                next.hr_approval = Some(ApprovalStamp {
                    approver_id: actor.employee_id,
                    approved_at: now,
                });
                next.status = LeaveStatus::Approved;
                let commit = LedgerOp::Commit(application.number_of_days);
                Ok(Self::transition(
                    application,
                    next,
                    Some(commit),
                    Some(NotificationKind::Approved),
                ))
            }
            Decision::Reject { reason } => Ok(Self::reject(application, next, actor, reason, now)),
        }
    }

    /// Withdraws a pending application on behalf of its owner.
    pub fn cancel(
        application: &LeaveApplication,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LeaveTransition, LeaveError> {
        if application.employee_id != actor.employee_id {
            return Err(LeaveError::NotApplicationOwner {
                actor: actor.employee_id,
            });
        }
        Self::ensure_pending(application, "cancel")?;

        let mut next = Self::next_version(application, now);
        next.status = LeaveStatus::Cancelled;
        let release = LedgerOp::Release(application.number_of_days);
        Ok(Self::transition(application, next, Some(release), None))
    }

    fn ensure_pending(application: &LeaveApplication, action: &'static str) -> Result<(), LeaveError> {
        if application.status.is_terminal() {
            return Err(LeaveError::InvalidStatus {
                status: application.status,
                action,
            });
        }
        Ok(())
    }

    fn next_version(application: &LeaveApplication, now: DateTime<Utc>) -> LeaveApplication {
        let mut next = application.clone();
        next.version = application.version + 1;
        next.updated_at = now;
        next
    }

    fn reject(
        current: &LeaveApplication,
        mut next: LeaveApplication,
        actor: &Actor,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> LeaveTransition {
        next.status = LeaveStatus::Rejected;
        next.rejection = Some(Rejection {
            rejected_by: actor.employee_id,
            reason: reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            rejected_at: now,
        });
        let release = LedgerOp::Release(current.number_of_days);
        Self::transition(current, next, Some(release), Some(NotificationKind::Rejected))
    }

    fn transition(
        current: &LeaveApplication,
        next: LeaveApplication,
        ledger: Option<LedgerOp>,
        notification: Option<NotificationKind>,
    ) -> LeaveTransition {
        LeaveTransition {
            expected_version: current.version,
            application: next,
            ledger,
            notification,
        }
    }
}
