//! Engine scenarios over the in-memory store.

use async_trait::async_trait;
use chrono::NaiveDate;
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use crate::engine::memory::InMemoryLeaveStore;
use crate::engine::outbox::NotificationOutbox;
use crate::engine::ports::{
    AllowAllGate, Entitlement, EntitlementGate, MockEntitlementGate, MockNotifier, Notification,
    Notifier, NotifyError,
};
use crate::engine::service::LeaveEngine;
use crate::engine::store::{LeaveStore, MockLeaveStore};
use crate::ledger::{BalanceKey, LeaveBalance, LeaveType};
use crate::workflow::test_support::{application, date, policy};
use crate::workflow::{
    Actor, DateRange, Decision, EmployeeProfile, EmployeeRole, LeaveError, LeaveStatus,
    NotificationKind, SubmitLeave,
};

struct Harness {
    engine: LeaveEngine,
    store: Arc<InMemoryLeaveStore>,
    company: CompanyId,
    manager: EmployeeProfile,
    hr: EmployeeProfile,
    /// Reports to `manager`.
    employee: EmployeeProfile,
    /// Has no manager.
    orphan: EmployeeProfile,
}

fn person(
    company_id: CompanyId,
    manager_id: Option<EmployeeId>,
    role: EmployeeRole,
    name: &str,
) -> EmployeeProfile {
    EmployeeProfile {
        id: EmployeeId::new(),
        company_id,
        manager_id,
        role,
        email: format!("{}@example.com", name.to_lowercase()),
        full_name: name.to_string(),
    }
}

fn harness_with(gate: Arc<dyn EntitlementGate>, outbox: NotificationOutbox) -> Harness {
    let store = Arc::new(InMemoryLeaveStore::new());
    let company = CompanyId::new();
    let manager = person(company, None, EmployeeRole::Manager, "Meera");
    let hr = person(company, None, EmployeeRole::HrAdmin, "Hari");
    let employee = person(company, Some(manager.id), EmployeeRole::Employee, "Esha");
    let orphan = person(company, None, EmployeeRole::Employee, "Omar");

    for p in [&manager, &hr, &employee, &orphan] {
        store.upsert_employee(p.clone());
    }
    for p in [&employee, &orphan] {
        store.upsert_balance(
            LeaveBalance::with_quota(BalanceKey::new(p.id, LeaveType::CasualLeave, 2025), dec!(12))
                .unwrap(),
        );
    }

    let engine = LeaveEngine::new(store.clone(), gate, outbox);
    Harness {
        engine,
        store,
        company,
        manager,
        hr,
        employee,
        orphan,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(AllowAllGate), NotificationOutbox::disabled())
}

fn request(start: NaiveDate, end: NaiveDate, days: Decimal) -> SubmitLeave {
    SubmitLeave {
        leave_type: LeaveType::CasualLeave,
        start_date: start,
        end_date: end,
        number_of_days: days,
        is_half_day: false,
        reason: "personal".to_string(),
        attachment_ref: None,
    }
}

fn jan(day: u32) -> NaiveDate {
    date(2025, 1, day)
}

impl Harness {
    fn actor(p: &EmployeeProfile) -> Actor {
        Actor::from(p)
    }

    async fn casual_balance(&self, employee_id: EmployeeId) -> LeaveBalance {
        self.engine
            .get_balance(employee_id, LeaveType::CasualLeave, 2025)
            .await
            .unwrap()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<(EmployeeId, NotificationKind)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.seen
            .lock()
            .unwrap()
            .push((notification.recipient_id, notification.kind));
        Ok(())
    }
}

// ========== Scenarios ==========

#[tokio::test]
async fn test_single_stage_submit_then_manager_approval() {
    let h = harness();

    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    let b = h.casual_balance(h.employee.id).await;
    assert_eq!(app.status, LeaveStatus::Pending);
    assert_eq!(b.pending, dec!(3));
    assert_eq!(b.available, dec!(9));

    let approved = h
        .engine
        .decide_as_manager(app.id, &Harness::actor(&h.manager), Decision::Approve)
        .await
        .unwrap();
    let b = h.casual_balance(h.employee.id).await;
    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(b.used, dec!(3));
    assert_eq!(b.pending, dec!(0));
    assert_eq!(b.available, dec!(9));
    assert!(b.is_consistent());
}

#[tokio::test]
async fn test_no_manager_goes_straight_to_hr() {
    let h = harness();
    let app = h
        .engine
        .submit_leave(h.orphan.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    assert!(app.requires_hr_approval);
    assert_eq!(app.reviewing_manager_id, None);

    let approved = h
        .engine
        .decide_as_hr(app.id, &Harness::actor(&h.hr), Decision::Approve)
        .await
        .unwrap();

    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(h.casual_balance(h.orphan.id).await.used, dec!(3));
}

#[tokio::test]
async fn test_cancel_restores_balance() {
    let h = harness();
    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(20), jan(21), dec!(2)))
        .await
        .unwrap();

    let cancelled = h
        .engine
        .cancel_leave(app.id, &Harness::actor(&h.employee))
        .await
        .unwrap();

    let b = h.casual_balance(h.employee.id).await;
    assert_eq!(cancelled.status, LeaveStatus::Cancelled);
    assert_eq!(b.pending, dec!(0));
    assert_eq!(b.available, dec!(12));
}

#[tokio::test]
async fn test_overlap_exclusivity() {
    let h = harness();
    let first = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    h.engine
        .decide_as_manager(first.id, &Harness::actor(&h.manager), Decision::Approve)
        .await
        .unwrap();

    let err = h
        .engine
        .submit_leave(h.employee.id, request(jan(11), jan(15), dec!(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Overlap { ref conflicting } if conflicting == &vec![first.id]));

    h.engine
        .submit_leave(h.employee.id, request(jan(13), jan(15), dec!(3)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_dates_can_be_requested_again() {
    let h = harness();
    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(10), dec!(1)))
        .await
        .unwrap();
    h.engine
        .cancel_leave(app.id, &Harness::actor(&h.employee))
        .await
        .unwrap();

    h.engine
        .submit_leave(h.employee.id, request(jan(10), jan(10), dec!(1)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_two_stage_gating_keeps_days_pending() {
    let h = harness();
    h.store.upsert_policy(policy(h.company, true));
    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    assert!(app.requires_hr_approval);

    // HR cannot jump the queue.
    let err = h
        .engine
        .decide_as_hr(app.id, &Harness::actor(&h.hr), Decision::Approve)
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());

    let after_manager = h
        .engine
        .decide_as_manager(app.id, &Harness::actor(&h.manager), Decision::Approve)
        .await
        .unwrap();
    let b = h.casual_balance(h.employee.id).await;
    assert_eq!(after_manager.status, LeaveStatus::Pending);
    assert_eq!(b.pending, dec!(3));
    assert_eq!(b.used, dec!(0));

    let pending_hr = h
        .engine
        .pending_for_hr(&Harness::actor(&h.hr))
        .await
        .unwrap();
    assert_eq!(pending_hr.len(), 1);

    let final_state = h
        .engine
        .decide_as_hr(app.id, &Harness::actor(&h.hr), Decision::Approve)
        .await
        .unwrap();
    let b = h.casual_balance(h.employee.id).await;
    assert_eq!(final_state.status, LeaveStatus::Approved);
    assert_eq!(b.used, dec!(3));
    assert_eq!(b.pending, dec!(0));
}

#[tokio::test]
async fn test_non_manager_decision_is_forbidden_and_changes_nothing() {
    let h = harness();
    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    let before = h.casual_balance(h.employee.id).await;

    let err = h
        .engine
        .decide_as_manager(app.id, &Harness::actor(&h.hr), Decision::Approve)
        .await
        .unwrap_err();

    assert!(err.is_forbidden());
    let stored = h.store.find_application(app.id).await.unwrap().unwrap();
    assert_eq!(stored, app);
    let after = h.casual_balance(h.employee.id).await;
    assert_eq!(after.pending, before.pending);
    assert_eq!(after.used, before.used);
}

#[tokio::test]
async fn test_hr_replay_does_not_double_commit() {
    let h = harness();
    let app = h
        .engine
        .submit_leave(h.orphan.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    h.engine
        .decide_as_hr(app.id, &Harness::actor(&h.hr), Decision::Approve)
        .await
        .unwrap();

    let err = h
        .engine
        .decide_as_hr(app.id, &Harness::actor(&h.hr), Decision::Approve)
        .await
        .unwrap_err();

    assert!(err.is_invalid_state());
    let b = h.casual_balance(h.orphan.id).await;
    assert_eq!(b.used, dec!(3));
    assert_eq!(b.pending, dec!(0));
}

#[tokio::test]
async fn test_rejection_releases_and_records_reason() {
    let h = harness();
    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();

    let rejected = h
        .engine
        .decide_as_manager(
            app.id,
            &Harness::actor(&h.manager),
            Decision::from_flag(false, Some("Release week".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(rejected.status, LeaveStatus::Rejected);
    let rejection = rejected.rejection.unwrap();
    assert_eq!(rejection.reason.as_deref(), Some("Release week"));
    assert_eq!(rejection.rejected_by, h.manager.id);
    assert_eq!(h.casual_balance(h.employee.id).await.available, dec!(12));
}

#[tokio::test]
async fn test_submission_errors() {
    let h = harness();

    let err = h
        .engine
        .submit_leave(EmployeeId::new(), request(jan(1), jan(2), dec!(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::EmployeeNotFound(_)));

    let err = h
        .engine
        .submit_leave(h.employee.id, request(jan(5), jan(2), dec!(2)))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_half_day_rules_refuse_without_reserving() {
    let h = harness();
    let mut no_half_days = policy(h.company, false);
    no_half_days.half_day_allowed = false;
    h.store.upsert_policy(no_half_days);

    let half_day = SubmitLeave {
        is_half_day: true,
        ..request(jan(10), jan(10), dec!(0.5))
    };
    let err = h
        .engine
        .submit_leave(h.employee.id, half_day.clone())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    h.store.upsert_policy(policy(h.company, false));
    let spanning = SubmitLeave {
        is_half_day: true,
        ..request(jan(10), jan(14), dec!(0.5))
    };
    let err = h
        .engine
        .submit_leave(h.employee.id, spanning)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(h.casual_balance(h.employee.id).await.pending, dec!(0));

    let app = h.engine.submit_leave(h.employee.id, half_day).await.unwrap();
    assert!(app.is_half_day);
    assert_eq!(h.casual_balance(h.employee.id).await.pending, dec!(0.5));
}

#[tokio::test]
async fn test_entitlement_denial_aborts_submission() {
    let mut gate = MockEntitlementGate::new();
    gate.expect_check_allowed()
        .times(1)
        .returning(|_, _| Ok(Entitlement::Denied("Subscription expired".to_string())));
    let h = harness_with(Arc::new(gate), NotificationOutbox::disabled());

    let err = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap_err();

    assert!(matches!(err, LeaveError::EntitlementDenied(ref r) if r == "Subscription expired"));
    assert!(
        h.engine
            .list_my_applications(h.employee.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(h.casual_balance(h.employee.id).await.pending, dec!(0));
}

#[tokio::test]
async fn test_year_boundary_books_against_start_year() {
    let h = harness();
    h.engine
        .submit_leave(
            h.employee.id,
            request(date(2025, 12, 30), date(2026, 1, 2), dec!(4)),
        )
        .await
        .unwrap();

    assert_eq!(h.casual_balance(h.employee.id).await.pending, dec!(4));
    let next = h
        .engine
        .get_balance(h.employee.id, LeaveType::CasualLeave, 2026)
        .await
        .unwrap();
    assert_eq!(next.pending, dec!(0));
}

// ========== Queries ==========

#[tokio::test]
async fn test_get_balance_returns_zero_view_when_missing() {
    let h = harness();
    let b = h
        .engine
        .get_balance(h.employee.id, LeaveType::SickLeave, 2030)
        .await
        .unwrap();

    assert_eq!(b.total_quota, dec!(0));
    assert_eq!(b.available, dec!(0));
    assert!(h.store.find_balance(&b.key()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reservation_creates_missing_bucket() {
    let h = harness();
    h.engine
        .submit_leave(
            h.employee.id,
            SubmitLeave {
                leave_type: LeaveType::CompOff,
                ..request(jan(6), jan(6), dec!(1))
            },
        )
        .await
        .unwrap();

    let b = h
        .engine
        .get_balance(h.employee.id, LeaveType::CompOff, 2025)
        .await
        .unwrap();
    assert_eq!(b.pending, dec!(1));
    assert_eq!(b.available, dec!(-1));
}

#[tokio::test]
async fn test_application_queries() {
    let h = harness();
    let first = h
        .engine
        .submit_leave(h.employee.id, request(jan(3), jan(3), dec!(1)))
        .await
        .unwrap();
    let second = h
        .engine
        .submit_leave(h.employee.id, request(jan(6), jan(7), dec!(2)))
        .await
        .unwrap();
    h.engine
        .cancel_leave(first.id, &Harness::actor(&h.employee))
        .await
        .unwrap();

    let mine = h.engine.list_my_applications(h.employee.id).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, second.id);
    assert_eq!(
        h.engine
            .count_pending_applications(h.employee.id)
            .await
            .unwrap(),
        1
    );

    let for_manager = h.engine.pending_for_manager(h.manager.id).await.unwrap();
    assert_eq!(for_manager.len(), 1);
    assert_eq!(for_manager[0].id, second.id);

    assert_eq!(
        h.engine.get_application(second.id, h.company).await.unwrap().id,
        second.id
    );
    let err = h
        .engine
        .get_application(second.id, CompanyId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::ApplicationNotFound(_)));
    let err = h
        .engine
        .get_application(LeaveApplicationId::new(), h.company)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::ApplicationNotFound(_)));

    let err = h
        .engine
        .pending_for_hr(&Harness::actor(&h.employee))
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_company_calendar_lists_intersecting_applications() {
    let h = harness();
    let early = h
        .engine
        .submit_leave(h.employee.id, request(jan(3), jan(6), dec!(4)))
        .await
        .unwrap();
    let inside = h
        .engine
        .submit_leave(h.orphan.id, request(jan(8), jan(9), dec!(2)))
        .await
        .unwrap();
    let cancelled = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(10), dec!(1)))
        .await
        .unwrap();
    h.engine
        .cancel_leave(cancelled.id, &Harness::actor(&h.employee))
        .await
        .unwrap();
    h.engine
        .submit_leave(h.employee.id, request(jan(20), jan(22), dec!(3)))
        .await
        .unwrap();

    let range = DateRange::new(jan(6), jan(10)).unwrap();
    let calendar = h
        .engine
        .list_company_applications_in_range(&Harness::actor(&h.hr), range)
        .await
        .unwrap();

    let ids: Vec<_> = calendar.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![early.id, inside.id, cancelled.id]);

    let err = h
        .engine
        .list_company_applications_in_range(&Harness::actor(&h.employee), range)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

// ========== Lost races ==========

#[tokio::test]
async fn test_lost_cancel_reports_the_cancel_action() {
    let pending = application(jan(10), jan(12));
    let mut approved = pending.clone();
    approved.status = LeaveStatus::Approved;
    approved.version = pending.version + 1;
    let owner = Actor::new(pending.employee_id, pending.company_id, EmployeeRole::Employee);

    let mut store = MockLeaveStore::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_find_application()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| Ok(Some(pending)));
    store
        .expect_apply_transition()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|t| Err(LeaveError::ConcurrentModification(t.application.id)));
    store
        .expect_find_application()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| Ok(Some(approved)));
    let engine = LeaveEngine::new(
        Arc::new(store),
        Arc::new(AllowAllGate),
        NotificationOutbox::disabled(),
    );

    let err = engine
        .cancel_leave(LeaveApplicationId::new(), &owner)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LeaveError::InvalidStatus {
            status: LeaveStatus::Approved,
            action: "cancel"
        }
    ));
    assert_eq!(err.to_string(), "Cannot cancel a APPROVED leave application");
}

#[tokio::test]
async fn test_lost_race_on_pending_application_is_a_conflict() {
    let pending = application(jan(10), jan(12));
    let mut manager_approved = pending.clone();
    manager_approved.version = pending.version + 1;
    let owner = Actor::new(pending.employee_id, pending.company_id, EmployeeRole::Employee);

    let mut store = MockLeaveStore::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_find_application()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| Ok(Some(pending)));
    store
        .expect_apply_transition()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|t| Err(LeaveError::ConcurrentModification(t.application.id)));
    store
        .expect_find_application()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| Ok(Some(manager_approved)));
    let engine = LeaveEngine::new(
        Arc::new(store),
        Arc::new(AllowAllGate),
        NotificationOutbox::disabled(),
    );

    let err = engine
        .cancel_leave(LeaveApplicationId::new(), &owner)
        .await
        .unwrap_err();

    assert!(matches!(err, LeaveError::ConcurrentModification(_)));
}

// ========== Ledger maintenance ==========

#[tokio::test]
async fn test_initialize_balances_fills_missing_and_lazy_buckets() {
    let h = harness();
    let casual = policy(h.company, false);
    let mut sick = policy(h.company, false);
    sick.leave_type = LeaveType::SickLeave;
    sick.annual_quota = dec!(8);
    let mut comp_off = policy(h.company, false);
    comp_off.leave_type = LeaveType::CompOff;
    comp_off.annual_quota = dec!(2);
    let mut inactive = policy(h.company, false);
    inactive.leave_type = LeaveType::EarnedLeave;
    inactive.active = false;
    for p in [casual, sick, comp_off, inactive] {
        h.store.upsert_policy(p);
    }

    // Lazily created by a reservation, quota still zero.
    h.engine
        .submit_leave(
            h.employee.id,
            SubmitLeave {
                leave_type: LeaveType::CompOff,
                ..request(jan(6), jan(6), dec!(1))
            },
        )
        .await
        .unwrap();

    let balances = h.engine.initialize_balances(h.employee.id, 2025).await.unwrap();

    let by_type = |t: LeaveType| balances.iter().find(|b| b.leave_type == t).cloned();
    assert_eq!(by_type(LeaveType::CasualLeave).unwrap().total_quota, dec!(12));
    assert_eq!(by_type(LeaveType::SickLeave).unwrap().total_quota, dec!(8));
    let comp = by_type(LeaveType::CompOff).unwrap();
    assert_eq!(comp.total_quota, dec!(2));
    assert_eq!(comp.pending, dec!(1));
    assert_eq!(comp.available, dec!(1));
    assert!(by_type(LeaveType::EarnedLeave).is_none());

    // Running again changes nothing.
    let again = h.engine.initialize_balances(h.employee.id, 2025).await.unwrap();
    assert_eq!(again.len(), balances.len());
}

#[tokio::test]
async fn test_carry_forward_caps_and_is_idempotent() {
    let h = harness();
    h.store.upsert_policy(policy(h.company, false)); // quota 12, cap 5
    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    h.engine
        .decide_as_manager(app.id, &Harness::actor(&h.manager), Decision::Approve)
        .await
        .unwrap();
    // orphan: 12 available, employee: 9 available, both capped at 5.

    let summary = h.engine.carry_forward(h.company, 2025).await.unwrap();
    assert_eq!(summary.buckets_updated, 2);
    assert_eq!(summary.to_year, 2026);

    let again = h.engine.carry_forward(h.company, 2025).await.unwrap();
    assert_eq!(again.buckets_updated, 2);

    let next = h
        .engine
        .get_balance(h.employee.id, LeaveType::CasualLeave, 2026)
        .await
        .unwrap();
    assert_eq!(next.carried_forward, dec!(5));
    assert_eq!(next.total_quota, dec!(12));
    assert_eq!(next.available, dec!(17));
}

#[tokio::test]
async fn test_carry_forward_skips_other_companies_and_disabled_policies() {
    let h = harness();
    let mut no_carry = policy(h.company, false);
    no_carry.carry_forward = false;
    h.store.upsert_policy(no_carry);

    let summary = h.engine.carry_forward(h.company, 2025).await.unwrap();
    assert_eq!(summary.buckets_updated, 0);

    let summary = h.engine.carry_forward(CompanyId::new(), 2025).await.unwrap();
    assert_eq!(summary.buckets_updated, 0);
}

// ========== Notifications ==========

#[tokio::test]
async fn test_notifications_follow_transitions() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (outbox, worker) = NotificationOutbox::spawn(notifier.clone(), 16);
    let h = harness_with(Arc::new(AllowAllGate), outbox);
    h.store.upsert_policy(policy(h.company, true));

    let two_stage = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    h.engine
        .decide_as_manager(two_stage.id, &Harness::actor(&h.manager), Decision::Approve)
        .await
        .unwrap();
    h.engine
        .decide_as_hr(
            two_stage.id,
            &Harness::actor(&h.hr),
            Decision::Reject { reason: None },
        )
        .await
        .unwrap();
    let cancelled = h
        .engine
        .submit_leave(h.employee.id, request(jan(20), jan(20), dec!(1)))
        .await
        .unwrap();
    h.engine
        .cancel_leave(cancelled.id, &Harness::actor(&h.employee))
        .await
        .unwrap();

    let employee_id = h.employee.id;
    drop(h);
    worker.await.unwrap();

    let seen = notifier.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (employee_id, NotificationKind::ManagerApproved),
            (employee_id, NotificationKind::Rejected),
        ]
    );
}

#[tokio::test]
async fn test_notifier_failure_does_not_undo_transition() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .times(1)
        .returning(|_| Err(NotifyError::Delivery("connection refused".to_string())));
    let (outbox, worker) = NotificationOutbox::spawn(Arc::new(notifier), 4);
    let h = harness_with(Arc::new(AllowAllGate), outbox);

    let app = h
        .engine
        .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
        .await
        .unwrap();
    let approved = h
        .engine
        .decide_as_manager(app.id, &Harness::actor(&h.manager), Decision::Approve)
        .await
        .unwrap();

    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(h.casual_balance(h.employee.id).await.used, dec!(3));
    drop(h);
    worker.await.unwrap();
}

// ========== Concurrency ==========

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_approve_and_cancel_has_one_winner() {
    for _ in 0..25 {
        let h = harness();
        let app = h
            .engine
            .submit_leave(h.employee.id, request(jan(10), jan(12), dec!(3)))
            .await
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let approve = {
            let engine = h.engine.clone();
            let barrier = barrier.clone();
            let manager = Harness::actor(&h.manager);
            tokio::spawn(async move {
                barrier.wait().await;
                engine.decide_as_manager(app.id, &manager, Decision::Approve).await
            })
        };
        let cancel = {
            let engine = h.engine.clone();
            let barrier = barrier.clone();
            let owner = Harness::actor(&h.employee);
            tokio::spawn(async move {
                barrier.wait().await;
                engine.cancel_leave(app.id, &owner).await
            })
        };
        let approve = approve.await.unwrap();
        let cancel = cancel.await.unwrap();

        assert!(approve.is_ok() ^ cancel.is_ok(), "exactly one transition must win");
        for loser in [&approve, &cancel].into_iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                loser,
                LeaveError::ConcurrentModification(_) | LeaveError::InvalidStatus { .. }
            ));
        }

        let b = h.casual_balance(h.employee.id).await;
        assert_eq!(b.pending, dec!(0));
        if approve.is_ok() {
            assert_eq!(b.used, dec!(3));
            assert_eq!(b.available, dec!(9));
        } else {
            assert_eq!(b.used, dec!(0));
            assert_eq!(b.available, dec!(12));
        }
        assert!(b.is_consistent());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_submissions_admit_one() {
    let h = harness();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = h.engine.clone();
            let barrier = barrier.clone();
            let employee_id = h.employee.id;
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .submit_leave(employee_id, request(jan(10), jan(12), dec!(3)))
                    .await
            })
        })
        .collect();
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LeaveError::Overlap { .. }))
    );
    assert_eq!(h.casual_balance(h.employee.id).await.pending, dec!(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disjoint_submissions_all_reserve() {
    let h = harness();
    let handles: Vec<_> = (1..=10u32)
        .map(|day| {
            let engine = h.engine.clone();
            let employee_id = h.employee.id;
            tokio::spawn(async move {
                engine
                    .submit_leave(employee_id, request(jan(day), jan(day), dec!(0.5)))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let b = h.casual_balance(h.employee.id).await;
    assert_eq!(b.pending, dec!(5));
    assert_eq!(b.available, dec!(7));
}
