//! Ledger error types.
//!
//! Every variant here signals a broken accounting invariant rather than a
//! user mistake: the workflow only asks the ledger for moves that are valid
//! for the application being transitioned.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::types::BalanceKey;

/// Errors that can occur while moving days between balance counters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A counter would drop below zero.
    #[error("Balance {key}: {field} would underflow ({current} - {requested})")]
    Underflow {
        /// The bucket being modified.
        key: BalanceKey,
        /// Name of the counter.
        field: &'static str,
        /// Counter value before the move.
        current: Decimal,
        /// Days the move tried to take away.
        requested: Decimal,
    },

    /// Commit or release against a bucket that was never reserved into.
    #[error("Balance {0} does not exist")]
    BucketMissing(BalanceKey),

    /// Day counts moved through the ledger must be strictly positive.
    #[error("Day count must be positive, got {0}")]
    NonPositiveDays(Decimal),

    /// A stored counter may never be set to a negative value.
    #[error("Balance {key}: {field} cannot be negative ({value})")]
    NegativeCounter {
        /// The bucket being modified.
        key: BalanceKey,
        /// Name of the counter.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },
}
