//! `SeaORM` entity definitions.

pub mod companies;
pub mod employees;
pub mod leave_applications;
pub mod leave_balances;
pub mod leave_policies;
pub mod plans;
pub mod sea_orm_active_enums;
pub mod subscriptions;
