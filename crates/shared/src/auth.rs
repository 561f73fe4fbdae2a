//! Identity claims carried by access tokens.
//!
//! The leave engine never looks up sessions; the HTTP layer turns a verified
//! token into these claims and hands the acting employee, company and role to
//! the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CompanyId, EmployeeId};

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (employee ID).
    pub sub: Uuid,
    /// Company ID (tenant context).
    pub org: Uuid,
    /// Employee's role in the company, e.g. `HR_ADMIN`.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for an employee.
    #[must_use]
    pub fn new(
        employee_id: EmployeeId,
        company_id: CompanyId,
        role: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: employee_id.into_inner(),
            org: company_id.into_inner(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the employee ID from claims.
    #[must_use]
    pub const fn employee_id(&self) -> EmployeeId {
        EmployeeId::from_uuid(self.sub)
    }

    /// Returns the company ID from claims.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        CompanyId::from_uuid(self.org)
    }
}
