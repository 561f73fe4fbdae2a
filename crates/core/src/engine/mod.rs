//! Leave lifecycle orchestration.
//!
//! # Modules
//!
//! - `ports` - Entitlement gate and notifier traits
//! - `store` - Storage trait with the atomic write paths
//! - `memory` - `DashMap` backed store
//! - `outbox` - Fire-and-forget notification delivery
//! - `service` - The `LeaveEngine`

pub mod memory;
pub mod outbox;
pub mod ports;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use memory::InMemoryLeaveStore;
pub use outbox::NotificationOutbox;
pub use ports::{
    AllowAllGate, Capability, Entitlement, EntitlementGate, LogNotifier, Notification, Notifier,
    NotifyError,
};
pub use service::{CarryForwardSummary, LeaveEngine};
pub use store::LeaveStore;
