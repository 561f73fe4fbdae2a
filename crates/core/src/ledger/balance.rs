//! Balance arithmetic.
//!
//! Days move between counters in three ways:
//! - reserve: a new application takes days into `pending`
//! - commit: final approval moves days from `pending` to `used`
//! - release: rejection or cancellation returns days from `pending`
//!
//! Each move computes every new counter first and writes only when all of
//! them are valid, so a failed move leaves the bucket untouched.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{BalanceKey, LeaveBalance};

/// A single move of days applied to one balance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "days", rename_all = "lowercase")]
pub enum LedgerOp {
    /// `pending += days`
    Reserve(Decimal),
    /// `pending -= days; used += days`
    Commit(Decimal),
    /// `pending -= days`
    Release(Decimal),
}

impl LedgerOp {
    /// Days moved by this operation.
    #[must_use]
    pub fn days(&self) -> Decimal {
        match self {
            Self::Reserve(d) | Self::Commit(d) | Self::Release(d) => *d,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reserve(_) => "reserve",
            Self::Commit(_) => "commit",
            Self::Release(_) => "release",
        }
    }

    /// Only a reservation may create its bucket. Commit and release always
    /// follow a reservation, so a missing bucket there is a broken ledger.
    #[must_use]
    pub fn creates_bucket(&self) -> bool {
        matches!(self, Self::Reserve(_))
    }

    /// Applies the move to `balance`.
    pub fn apply(&self, balance: &mut LeaveBalance) -> Result<(), LedgerError> {
        match *self {
            Self::Reserve(days) => balance.reserve(days),
            Self::Commit(days) => balance.commit(days),
            Self::Release(days) => balance.release(days),
        }
    }
}

impl LeaveBalance {
    /// Creates a zeroed bucket.
    #[must_use]
    pub fn empty(key: BalanceKey) -> Self {
        Self {
            employee_id: key.employee_id,
            leave_type: key.leave_type,
            year: key.year,
            total_quota: Decimal::ZERO,
            used: Decimal::ZERO,
            pending: Decimal::ZERO,
            carried_forward: Decimal::ZERO,
            available: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// Creates a bucket granted `quota` days.
    pub fn with_quota(key: BalanceKey, quota: Decimal) -> Result<Self, LedgerError> {
        let mut balance = Self::empty(key);
        balance.set_total_quota(quota)?;
        Ok(balance)
    }

    /// The key identifying this bucket.
    #[must_use]
    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.employee_id, self.leave_type, self.year)
    }

    /// What `available` must equal for the current counters.
    #[must_use]
    pub fn expected_available(&self) -> Decimal {
        self.total_quota + self.carried_forward - self.used - self.pending
    }

    /// True when no stored counter is negative and `available` matches the
    /// other four.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total_quota >= Decimal::ZERO
            && self.used >= Decimal::ZERO
            && self.pending >= Decimal::ZERO
            && self.carried_forward >= Decimal::ZERO
            && self.available == self.expected_available()
    }

    /// Moves `days` into `pending`.
    pub fn reserve(&mut self, days: Decimal) -> Result<(), LedgerError> {
        ensure_positive(days)?;
        let pending = self.pending + days;
        self.write(self.used, pending);
        Ok(())
    }

    /// Moves `days` from `pending` to `used`.
    pub fn commit(&mut self, days: Decimal) -> Result<(), LedgerError> {
        ensure_positive(days)?;
        let pending = self.checked_sub("pending", self.pending, days)?;
        self.write(self.used + days, pending);
        Ok(())
    }

    /// Returns `days` from `pending`.
    pub fn release(&mut self, days: Decimal) -> Result<(), LedgerError> {
        ensure_positive(days)?;
        let pending = self.checked_sub("pending", self.pending, days)?;
        self.write(self.used, pending);
        Ok(())
    }

    /// Replaces the yearly grant.
    pub fn set_total_quota(&mut self, quota: Decimal) -> Result<(), LedgerError> {
        self.ensure_non_negative("total_quota", quota)?;
        self.total_quota = quota;
        self.write(self.used, self.pending);
        Ok(())
    }

    /// Replaces the carried-over days.
    pub fn set_carried_forward(&mut self, days: Decimal) -> Result<(), LedgerError> {
        self.ensure_non_negative("carried_forward", days)?;
        self.carried_forward = days;
        self.write(self.used, self.pending);
        Ok(())
    }

    /// Days this bucket can hand to the next year under a `cap`.
    /// An overdrawn bucket carries nothing.
    #[must_use]
    pub fn carry_over_amount(&self, cap: Decimal) -> Decimal {
        self.available.max(Decimal::ZERO).min(cap.max(Decimal::ZERO))
    }

    fn checked_sub(
        &self,
        field: &'static str,
        current: Decimal,
        requested: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let next = current - requested;
        if next < Decimal::ZERO {
            return Err(LedgerError::Underflow {
                key: self.key(),
                field,
                current,
                requested,
            });
        }
        Ok(next)
    }

    fn ensure_non_negative(&self, field: &'static str, value: Decimal) -> Result<(), LedgerError> {
        if value < Decimal::ZERO {
            return Err(LedgerError::NegativeCounter {
                key: self.key(),
                field,
                value,
            });
        }
        Ok(())
    }

    fn write(&mut self, used: Decimal, pending: Decimal) {
        self.used = used;
        self.pending = pending;
        self.available = self.expected_available();
        self.updated_at = Utc::now();
        debug_assert!(self.is_consistent(), "balance {} inconsistent", self.key());
    }
}

fn ensure_positive(days: Decimal) -> Result<(), LedgerError> {
    if days <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveDays(days));
    }
    Ok(())
}
