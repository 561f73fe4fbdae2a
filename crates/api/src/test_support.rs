//! Router test harness over the in-memory store.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header::AUTHORIZATION},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use leavemark_core::engine::{AllowAllGate, InMemoryLeaveStore, LeaveEngine, NotificationOutbox};
use leavemark_core::ledger::{BalanceKey, LeaveBalance, LeavePolicy, LeaveType};
use leavemark_core::workflow::{EmployeeProfile, EmployeeRole, LeaveApplication, LeaveStatus};
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId, LeavePolicyId};
use leavemark_shared::{JwtConfig, JwtService};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::{AppState, create_router};

fn person(
    company_id: CompanyId,
    manager_id: Option<EmployeeId>,
    role: EmployeeRole,
    name: &str,
) -> EmployeeProfile {
    EmployeeProfile {
        id: EmployeeId::new(),
        company_id,
        manager_id,
        role,
        email: format!("{}@example.com", name.to_lowercase()),
        full_name: name.to_string(),
    }
}

/// A company with a manager, an HR admin, an employee reporting to the
/// manager and an employee without a manager. Both employees hold 12 days
/// of casual leave for 2025.
pub struct TestApp {
    pub router: Router,
    pub jwt: Arc<JwtService>,
    pub manager: EmployeeProfile,
    pub hr: EmployeeProfile,
    pub employee: EmployeeProfile,
    pub orphan: EmployeeProfile,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryLeaveStore::new());
        let company = CompanyId::new();
        let manager = person(company, None, EmployeeRole::Manager, "Meera");
        let hr = person(company, None, EmployeeRole::HrAdmin, "Hari");
        let employee = person(company, Some(manager.id), EmployeeRole::Employee, "Esha");
        let orphan = person(company, None, EmployeeRole::Employee, "Omar");

        for p in [&manager, &hr, &employee, &orphan] {
            store.upsert_employee(p.clone());
        }
        store.upsert_policy(LeavePolicy {
            id: LeavePolicyId::new(),
            company_id: company,
            leave_type: LeaveType::CasualLeave,
            annual_quota: dec!(12),
            carry_forward: true,
            max_carry_forward: dec!(5),
            half_day_allowed: true,
            requires_hr_approval: false,
            active: true,
        });
        for p in [&employee, &orphan] {
            store.upsert_balance(
                LeaveBalance::with_quota(
                    BalanceKey::new(p.id, LeaveType::CasualLeave, 2025),
                    dec!(12),
                )
                .unwrap(),
            );
        }

        let engine = LeaveEngine::new(
            store,
            Arc::new(AllowAllGate),
            NotificationOutbox::disabled(),
        );
        let jwt = Arc::new(JwtService::new(JwtConfig::default()));
        let router = create_router(AppState {
            engine,
            jwt_service: jwt.clone(),
        });

        Self {
            router,
            jwt,
            manager,
            hr,
            employee,
            orphan,
        }
    }

    pub fn token_for(&self, profile: &EmployeeProfile) -> String {
        self.jwt
            .generate_access_token(profile.id, profile.company_id, profile.role.as_str())
            .unwrap()
    }

    /// A valid HR token for some other company.
    pub fn outsider_token(&self) -> String {
        self.jwt
            .generate_access_token(EmployeeId::new(), CompanyId::new(), "HR_ADMIN")
            .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A pending casual leave application, for pure tests.
pub fn sample_application() -> LeaveApplication {
    let now = chrono::Utc::now();
    LeaveApplication {
        id: LeaveApplicationId::new(),
        employee_id: EmployeeId::new(),
        company_id: CompanyId::new(),
        leave_type: LeaveType::CasualLeave,
        start_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
        number_of_days: dec!(3),
        is_half_day: false,
        reason: "Family event".to_string(),
        attachment_ref: None,
        status: LeaveStatus::Pending,
        requires_hr_approval: false,
        reviewing_manager_id: Some(EmployeeId::new()),
        manager_approval: None,
        hr_approval: None,
        rejection: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}
