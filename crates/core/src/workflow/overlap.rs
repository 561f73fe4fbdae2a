//! Date range overlap detection.
//!
//! Two inclusive ranges `[a1, a2]` and `[b1, b2]` overlap iff
//! `a1 <= b2 && b1 <= a2`. Only pending and approved applications occupy
//! the calendar; rejected and cancelled ones never conflict.

use chrono::NaiveDate;
use leavemark_shared::types::{EmployeeId, LeaveApplicationId};
use serde::{Deserialize, Serialize};

use crate::workflow::error::LeaveError;
use crate::workflow::types::LeaveApplication;

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LeaveError> {
        if end < start {
            return Err(LeaveError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range from two dates in either order.
    #[must_use]
    pub fn from_ordered(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// First day.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Calendar days covered, both ends included.
    #[must_use]
    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// True when both ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Stateless conflict finder.
pub struct OverlapChecker;

impl OverlapChecker {
    /// Returns the applications of `employee_id` that block `range`.
    ///
    /// `exclude` skips one application, used when re-checking an
    /// application against the others.
    pub fn find_conflicts<'a, I>(
        applications: I,
        employee_id: EmployeeId,
        range: DateRange,
        exclude: Option<LeaveApplicationId>,
    ) -> Vec<&'a LeaveApplication>
    where
        I: IntoIterator<Item = &'a LeaveApplication>,
    {
        applications
            .into_iter()
            .filter(|app| app.employee_id == employee_id)
            .filter(|app| Some(app.id) != exclude)
            .filter(|app| app.status.blocks_calendar())
            .filter(|app| app.date_range().overlaps(&range))
            .collect()
    }

    /// Fails with [`LeaveError::Overlap`] when `conflicts` is non-empty.
    pub fn ensure_free(conflicts: &[&LeaveApplication]) -> Result<(), LeaveError> {
        if conflicts.is_empty() {
            return Ok(());
        }
        Err(LeaveError::Overlap {
            conflicting: conflicts.iter().map(|app| app.id).collect(),
        })
    }
}
