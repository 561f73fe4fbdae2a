//! Property-based tests for the leave state machine.

use chrono::Utc;
use proptest::prelude::*;

use crate::workflow::service::LeaveWorkflowService;
use crate::workflow::test_support::{application, date, hr_actor, manager_actor};
use crate::workflow::types::{Actor, Decision, EmployeeRole, LeaveApplication, LeaveStatus};
use crate::ledger::LedgerOp;

fn arb_status() -> impl Strategy<Value = LeaveStatus> {
    prop_oneof![
        Just(LeaveStatus::Pending),
        Just(LeaveStatus::Approved),
        Just(LeaveStatus::Rejected),
        Just(LeaveStatus::Cancelled),
    ]
}

fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![
        Just(Decision::Approve),
        proptest::option::of("[a-z ]{0,20}").prop_map(|reason| Decision::Reject { reason }),
    ]
}

/// An application in an arbitrary point of its lifecycle.
fn arb_application() -> impl Strategy<Value = LeaveApplication> {
    (arb_status(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(status, requires_hr, has_manager, manager_approved)| {
            let mut app = application(date(2025, 6, 2), date(2025, 6, 4));
            app.status = status;
            app.requires_hr_approval = requires_hr || !has_manager;
            if !has_manager {
                app.reviewing_manager_id = None;
            } else if manager_approved {
                app.manager_approval = Some(crate::workflow::types::ApprovalStamp {
                    approver_id: app.reviewing_manager_id.unwrap_or_default(),
                    approved_at: Utc::now(),
                });
            }
            app
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Terminal applications refuse every transition.
    #[test]
    fn prop_terminal_applications_are_immutable(app in arb_application(), decision in arb_decision()) {
        prop_assume!(app.status.is_terminal());
        let owner = Actor::new(app.employee_id, app.company_id, EmployeeRole::Employee);
        let hr = hr_actor(app.company_id);

        prop_assert!(LeaveWorkflowService::cancel(&app, &owner, Utc::now()).is_err());
        prop_assert!(LeaveWorkflowService::decide_as_hr(&app, &hr, decision.clone(), Utc::now()).is_err());
        if app.reviewing_manager_id.is_some() {
            let manager = manager_actor(&app);
            prop_assert!(LeaveWorkflowService::decide_as_manager(&app, &manager, decision, Utc::now()).is_err());
        }
    }

    /// Every successful transition starts from Pending, bumps the version by
    /// one and commits only on approval.
    #[test]
    fn prop_successful_transitions_are_well_formed(app in arb_application(), decision in arb_decision()) {
        let hr = hr_actor(app.company_id);
        let mut results = vec![LeaveWorkflowService::decide_as_hr(&app, &hr, decision.clone(), Utc::now())];
        if app.reviewing_manager_id.is_some() {
            let manager = manager_actor(&app);
            results.push(LeaveWorkflowService::decide_as_manager(&app, &manager, decision, Utc::now()));
        }

        for t in results.into_iter().flatten() {
            let to = t.application.status;
            prop_assert_eq!(app.status, LeaveStatus::Pending);
            prop_assert_eq!(t.expected_version, app.version);
            prop_assert_eq!(t.application.version, app.version + 1);
            match t.ledger {
                Some(LedgerOp::Commit(d)) => {
                    prop_assert_eq!(to, LeaveStatus::Approved);
                    prop_assert_eq!(d, app.number_of_days);
                }
                Some(LedgerOp::Release(_)) => prop_assert_eq!(to, LeaveStatus::Rejected),
                Some(LedgerOp::Reserve(_)) => prop_assert!(false, "decisions never reserve"),
                None => prop_assert_eq!(to, LeaveStatus::Pending),
            }
        }
    }

    /// HR never decides before a reviewing manager has approved.
    #[test]
    fn prop_hr_waits_for_manager(app in arb_application(), decision in arb_decision()) {
        let hr = hr_actor(app.company_id);
        let waiting_on_manager = app.reviewing_manager_id.is_some() && app.manager_approval.is_none();
        if waiting_on_manager {
            prop_assert!(LeaveWorkflowService::decide_as_hr(&app, &hr, decision, Utc::now()).is_err());
        }
    }
}
