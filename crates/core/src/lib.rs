//! Core leave lifecycle logic for Leavemark.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage, entitlement checks and notification delivery are reached through
//! the ports in [`engine::ports`] and [`engine::store`].
//!
//! # Modules
//!
//! - `ledger` - Leave balance buckets and their reserve/commit/release arithmetic
//! - `workflow` - Application state machine, approval authority, overlap detection
//! - `engine` - Orchestration over the store, the entitlement gate and the outbox

pub mod engine;
pub mod ledger;
pub mod workflow;
