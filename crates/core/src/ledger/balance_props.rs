//! Property-based tests for balance arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;

use leavemark_shared::types::EmployeeId;

use crate::ledger::balance::LedgerOp;
use crate::ledger::types::{BalanceKey, LeaveBalance, LeaveType};

/// Half-day granular day counts between 0.5 and 30.
fn arb_days() -> impl Strategy<Value = Decimal> {
    (1i64..=60).prop_map(|halves| Decimal::new(halves * 5, 1))
}

fn arb_quota() -> impl Strategy<Value = Decimal> {
    (0i64..=40).prop_map(Decimal::from)
}

fn arb_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        arb_days().prop_map(LedgerOp::Reserve),
        arb_days().prop_map(LedgerOp::Commit),
        arb_days().prop_map(LedgerOp::Release),
    ]
}

fn bucket(quota: Decimal) -> LeaveBalance {
    LeaveBalance::with_quota(
        BalanceKey::new(EmployeeId::new(), LeaveType::EarnedLeave, 2025),
        quota,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of moves, successful or not, leaves the bucket consistent.
    #[test]
    fn prop_any_op_sequence_keeps_bucket_consistent(
        quota in arb_quota(),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let mut b = bucket(quota);
        for op in ops {
            let before = b.clone();
            if op.apply(&mut b).is_err() {
                prop_assert_eq!(b.used, before.used);
                prop_assert_eq!(b.pending, before.pending);
                prop_assert_eq!(b.available, before.available);
            }
            prop_assert!(b.is_consistent());
        }
    }

    /// reserve then release is a no-op on every counter.
    #[test]
    fn prop_reserve_release_restores(quota in arb_quota(), days in arb_days()) {
        let mut b = bucket(quota);
        let before = b.clone();
        b.reserve(days).unwrap();
        b.release(days).unwrap();

        prop_assert_eq!(b.pending, before.pending);
        prop_assert_eq!(b.used, before.used);
        prop_assert_eq!(b.available, before.available);
    }

    /// reserve then commit moves exactly `days` into used and keeps
    /// available at quota minus days.
    #[test]
    fn prop_reserve_commit_consumes(quota in arb_quota(), days in arb_days()) {
        let mut b = bucket(quota);
        b.reserve(days).unwrap();
        b.commit(days).unwrap();

        prop_assert_eq!(b.used, days);
        prop_assert_eq!(b.pending, Decimal::ZERO);
        prop_assert_eq!(b.available, quota - days);
    }

    /// pending always equals reserved minus committed minus released.
    #[test]
    fn prop_pending_tracks_open_reservations(
        reservations in prop::collection::vec(arb_days(), 1..10),
        settle_mask in prop::collection::vec(0u8..3, 10),
    ) {
        let mut b = bucket(Decimal::from(20));
        let mut open = Decimal::ZERO;
        for (days, settle) in reservations.iter().zip(settle_mask) {
            b.reserve(*days).unwrap();
            match settle {
                0 => open += *days,
                1 => b.commit(*days).unwrap(),
                _ => b.release(*days).unwrap(),
            }
        }
        prop_assert_eq!(b.pending, open);
    }

    /// Carry-over never exceeds the cap nor the available days, and is never negative.
    #[test]
    fn prop_carry_over_bounded(quota in arb_quota(), used in arb_days(), cap in arb_quota()) {
        let mut b = bucket(quota);
        b.reserve(used).unwrap();
        b.commit(used).unwrap();

        let carried = b.carry_over_amount(cap);
        prop_assert!(carried >= Decimal::ZERO);
        prop_assert!(carried <= cap);
        prop_assert!(carried <= b.available.max(Decimal::ZERO));
    }
}
