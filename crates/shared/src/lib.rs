//! Shared types, errors, and configuration for Leavemark.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and token service
//! - SMTP email delivery

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;


pub use auth::Claims;
pub use config::{AppConfig, EmailConfig, LeaveConfig};
pub use email::{EmailError, EmailService, LeaveStatusEmail};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
