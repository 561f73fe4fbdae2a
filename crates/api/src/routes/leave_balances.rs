//! Leave balance routes and year-end maintenance.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use leavemark_core::ledger::{LeaveBalance, LeaveType};
use leavemark_core::workflow::LeaveError;
use leavemark_shared::types::EmployeeId;

/// Creates the leave balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leave-balances/me", get(my_balances))
        .route(
            "/employees/{employee_id}/leave-balances/{leave_type}/{year}",
            get(get_balance),
        )
        .route("/leave-balances/initialize", post(initialize_balances))
        .route("/leave-balances/carry-forward", post(carry_forward))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing the caller's balances.
#[derive(Debug, Deserialize)]
pub struct BalancesQuery {
    /// Calendar year (default: current year).
    pub year: Option<i32>,
}

/// Request body for initializing an employee's balances.
#[derive(Debug, Deserialize)]
pub struct InitializeBalancesRequest {
    /// Employee to initialize.
    pub employee_id: Uuid,
    /// Calendar year.
    pub year: i32,
}

/// Request body for the year-end carry-forward.
#[derive(Debug, Deserialize)]
pub struct CarryForwardRequest {
    /// Year whose unused days move into the next year.
    pub year: i32,
}

/// Response for a balance bucket.
#[derive(Debug, Serialize)]
pub struct LeaveBalanceResponse {
    /// Owner.
    pub employee_id: Uuid,
    /// Leave type.
    pub leave_type: String,
    /// Calendar year.
    pub year: i32,
    /// Days granted for the year.
    pub total_quota: String,
    /// Days consumed.
    pub used: String,
    /// Days reserved by pending applications.
    pub pending: String,
    /// Days brought over from the previous year.
    pub carried_forward: String,
    /// Days still available. May be negative.
    pub available: String,
}

impl From<LeaveBalance> for LeaveBalanceResponse {
    fn from(balance: LeaveBalance) -> Self {
        Self {
            employee_id: balance.employee_id.into_inner(),
            leave_type: balance.leave_type.as_str().to_string(),
            year: balance.year,
            total_quota: balance.total_quota.to_string(),
            used: balance.used.to_string(),
            pending: balance.pending.to_string(),
            carried_forward: balance.carried_forward.to_string(),
            available: balance.available.to_string(),
        }
    }
}

/// Only the employee or an HR reviewer of the same company may read or
/// initialize an employee's balances.
async fn ensure_can_manage(
    state: &AppState,
    auth: &AuthUser,
    employee_id: EmployeeId,
) -> Result<(), ApiError> {
    if employee_id == auth.employee_id() {
        return Ok(());
    }
    let actor = auth.hr_actor()?;
    match state.engine.store().find_employee(employee_id).await? {
        Some(employee) if employee.company_id == actor.company_id => Ok(()),
        _ => Err(LeaveError::EmployeeNotFound(employee_id).into()),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/leave-balances/me` - The caller's buckets for a year.
async fn my_balances(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<BalancesQuery>,
) -> Result<Json<Value>, ApiError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let balances: Vec<LeaveBalanceResponse> = state
        .engine
        .list_balances(auth.employee_id(), year)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "year": year, "balances": balances })))
}

/// GET `/employees/{employee_id}/leave-balances/{leave_type}/{year}` - One
/// bucket; all zeros when it does not exist yet.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((employee_id, leave_type, year)): Path<(Uuid, String, i32)>,
) -> Result<Json<LeaveBalanceResponse>, ApiError> {
    let employee_id = EmployeeId::from_uuid(employee_id);
    let leave_type = LeaveType::parse(&leave_type)
        .ok_or_else(|| ApiError::validation(format!("Unknown leave type '{leave_type}'")))?;
    ensure_can_manage(&state, &auth, employee_id).await?;

    let balance = state
        .engine
        .get_balance(employee_id, leave_type, year)
        .await?;
    Ok(Json(balance.into()))
}

/// POST `/leave-balances/initialize` - Grant annual quotas (HR only).
async fn initialize_balances(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<InitializeBalancesRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.hr_actor()?;
    let employee_id = EmployeeId::from_uuid(payload.employee_id);
    ensure_can_manage(&state, &auth, employee_id).await?;

    let balances: Vec<LeaveBalanceResponse> = state
        .engine
        .initialize_balances(employee_id, payload.year)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "year": payload.year, "balances": balances })))
}

/// POST `/leave-balances/carry-forward` - Year-end carry-over for the
/// caller's company (HR only).
async fn carry_forward(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CarryForwardRequest>,
) -> Result<Json<Value>, ApiError> {
    let actor = auth.hr_actor()?;
    let summary = state
        .engine
        .carry_forward(actor.company_id, payload.year)
        .await?;
    info!(
        company_id = %actor.company_id,
        from_year = summary.from_year,
        buckets = summary.buckets_updated,
        "Carry-forward requested"
    );
    Ok(Json(json!({
        "from_year": summary.from_year,
        "to_year": summary.to_year,
        "buckets_updated": summary.buckets_updated,
    })))
}
