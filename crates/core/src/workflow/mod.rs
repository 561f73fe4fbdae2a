//! Leave application workflow.
//!
//! This module implements the application lifecycle state machine, the
//! approval authority rules and overlap detection.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (LeaveApplication, LeaveStatus, Actor, Decision)
//! - `error` - The leave error taxonomy
//! - `overlap` - Inclusive date ranges and conflict detection
//! - `service` - State transition rules

pub mod error;
pub mod overlap;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;
#[cfg(test)]
pub(crate) mod test_support;

pub use error::LeaveError;
pub use overlap::{DateRange, OverlapChecker};
pub use service::LeaveWorkflowService;
pub use types::{
    Actor, ApprovalStamp, Decision, EmployeeProfile, EmployeeRole, LeaveApplication, LeaveStatus,
    LeaveTransition, NotificationKind, Rejection, SubmitLeave,
};
