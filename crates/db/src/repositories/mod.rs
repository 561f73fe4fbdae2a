//! Repository abstractions for data access.
//!
//! Repositories implement the engine's ports on top of `SeaORM`, hiding the
//! query details from the rest of the application.

mod mapping;

pub mod leave;
pub mod subscription;

pub use leave::LeaveRepository;
pub use subscription::{SubscriptionRepository, plan_allows};
