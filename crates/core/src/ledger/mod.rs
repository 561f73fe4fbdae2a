//! Leave balance ledger.
//!
//! This module owns the per-(employee, leave type, year) buckets and the
//! arithmetic that moves days between their counters:
//! - Domain types (leave types, bucket keys, balances, policies)
//! - Reserve, commit and release moves
//! - Error types for broken accounting invariants

pub mod balance;
pub mod error;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::LedgerOp;
pub use error::LedgerError;
pub use types::{BalanceKey, LeaveBalance, LeavePolicy, LeaveType};
