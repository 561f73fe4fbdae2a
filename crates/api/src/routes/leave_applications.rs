//! Leave application routes.
//!
//! Submission, the two approval stages, cancellation and the review queues.
//! The acting employee, company and role always come from the token.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use leavemark_core::ledger::LeaveType;
use leavemark_core::workflow::{DateRange, Decision, LeaveApplication, SubmitLeave};
use leavemark_shared::types::LeaveApplicationId;

/// Creates the leave application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leave-applications", post(submit_leave))
        .route("/leave-applications/me", get(list_my_applications))
        .route("/leave-applications/pending/manager", get(pending_for_manager))
        .route("/leave-applications/pending/hr", get(pending_for_hr))
        .route("/leave-applications/date-range", get(company_calendar))
        .route("/leave-applications/{application_id}", get(get_application))
        .route(
            "/leave-applications/{application_id}/manager-decision",
            post(manager_decision),
        )
        .route(
            "/leave-applications/{application_id}/hr-decision",
            post(hr_decision),
        )
        .route("/leave-applications/{application_id}/cancel", post(cancel_leave))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a leave application.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitLeaveRequest {
    /// Leave type, e.g. `SICK_LEAVE`.
    pub leave_type: String,
    /// First day of leave (YYYY-MM-DD).
    pub start_date: NaiveDate,
    /// Last day of leave (YYYY-MM-DD).
    pub end_date: NaiveDate,
    /// Days to charge.
    pub number_of_days: Decimal,
    /// Half-day request.
    #[serde(default)]
    pub is_half_day: bool,
    /// Applicant's reason.
    #[validate(length(min = 1, max = 1000, message = "must be 1 to 1000 characters"))]
    pub reason: String,
    /// Optional supporting document reference.
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub attachment_ref: Option<String>,
}

impl SubmitLeaveRequest {
    fn into_command(self) -> Result<SubmitLeave, ApiError> {
        let leave_type = LeaveType::parse(&self.leave_type).ok_or_else(|| {
            ApiError::validation(format!("Unknown leave type '{}'", self.leave_type))
        })?;
        Ok(SubmitLeave {
            leave_type,
            start_date: self.start_date,
            end_date: self.end_date,
            number_of_days: self.number_of_days,
            is_half_day: self.is_half_day,
            reason: self.reason,
            attachment_ref: self.attachment_ref,
        })
    }
}

/// Request body for a manager or HR decision.
#[derive(Debug, Deserialize, Validate)]
pub struct DecisionRequest {
    /// Approve (`true`) or reject (`false`).
    pub approved: bool,
    /// Optional reason, kept only for rejections.
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub rejection_reason: Option<String>,
}

/// Query parameters for the company leave calendar.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    /// First day of the window (YYYY-MM-DD).
    pub start_date: NaiveDate,
    /// Last day of the window (YYYY-MM-DD).
    pub end_date: NaiveDate,
}

/// Approval stamp in responses.
#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    /// Approver.
    pub approved_by: Uuid,
    /// Approval time.
    pub approved_at: String,
}

/// Rejection details in responses.
#[derive(Debug, Serialize)]
pub struct RejectionResponse {
    /// Who rejected.
    pub rejected_by: Uuid,
    /// Optional reason.
    pub reason: Option<String>,
    /// Rejection time.
    pub rejected_at: String,
}

/// Response for a leave application.
#[derive(Debug, Serialize)]
pub struct LeaveApplicationResponse {
    /// Application ID.
    pub id: Uuid,
    /// Applicant.
    pub employee_id: Uuid,
    /// Leave type.
    pub leave_type: String,
    /// First day of leave.
    pub start_date: String,
    /// Last day of leave.
    pub end_date: String,
    /// Days charged.
    pub number_of_days: String,
    /// Half-day request.
    pub is_half_day: bool,
    /// Applicant's reason.
    pub reason: String,
    /// Supporting document reference.
    pub attachment_ref: Option<String>,
    /// Status.
    pub status: String,
    /// Whether HR must sign off.
    pub requires_hr_approval: bool,
    /// Manager whose decision is expected.
    pub reviewing_manager_id: Option<Uuid>,
    /// Manager stage approval.
    pub manager_approval: Option<ApprovalResponse>,
    /// HR stage approval.
    pub hr_approval: Option<ApprovalResponse>,
    /// Rejection details.
    pub rejection: Option<RejectionResponse>,
    /// Concurrency version.
    pub version: i32,
    /// Submission time.
    pub created_at: String,
    /// Last update time.
    pub updated_at: String,
}

impl From<LeaveApplication> for LeaveApplicationResponse {
    fn from(app: LeaveApplication) -> Self {
        let stamp = |s: leavemark_core::workflow::ApprovalStamp| ApprovalResponse {
            approved_by: s.approver_id.into_inner(),
            approved_at: s.approved_at.to_rfc3339(),
        };
        Self {
            id: app.id.into_inner(),
            employee_id: app.employee_id.into_inner(),
            leave_type: app.leave_type.as_str().to_string(),
            start_date: app.start_date.to_string(),
            end_date: app.end_date.to_string(),
            number_of_days: app.number_of_days.to_string(),
            is_half_day: app.is_half_day,
            reason: app.reason,
            attachment_ref: app.attachment_ref,
            status: app.status.as_str().to_string(),
            requires_hr_approval: app.requires_hr_approval,
            reviewing_manager_id: app.reviewing_manager_id.map(|m| m.into_inner()),
            manager_approval: app.manager_approval.map(stamp),
            hr_approval: app.hr_approval.map(stamp),
            rejection: app.rejection.map(|r| RejectionResponse {
                rejected_by: r.rejected_by.into_inner(),
                reason: r.reason,
                rejected_at: r.rejected_at.to_rfc3339(),
            }),
            version: app.version,
            created_at: app.created_at.to_rfc3339(),
            updated_at: app.updated_at.to_rfc3339(),
        }
    }
}

fn list_response(applications: Vec<LeaveApplication>) -> Vec<LeaveApplicationResponse> {
    applications.into_iter().map(Into::into).collect()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/leave-applications` - Submit a leave application.
async fn submit_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SubmitLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveApplicationResponse>), ApiError> {
    payload.validate()?;
    let command = payload.into_command()?;

    let application = state
        .engine
        .submit_leave(auth.employee_id(), command)
        .await?;

    info!(
        application_id = %application.id,
        employee_id = %auth.employee_id(),
        "Leave application created"
    );
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// GET `/leave-applications/me` - The caller's applications, newest first.
async fn list_my_applications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let applications = state
        .engine
        .list_my_applications(auth.employee_id())
        .await?;
    let pending = state
        .engine
        .count_pending_applications(auth.employee_id())
        .await?;
    Ok(Json(json!({
        "applications": list_response(applications),
        "pending_count": pending,
    })))
}

/// GET `/leave-applications/pending/manager` - Applications awaiting the
/// caller's decision as manager.
async fn pending_for_manager(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let applications = state
        .engine
        .pending_for_manager(auth.employee_id())
        .await?;
    Ok(Json(json!({ "applications": list_response(applications) })))
}

/// GET `/leave-applications/pending/hr` - Applications of the company ready
/// for the HR decision.
async fn pending_for_hr(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let actor = auth.actor()?;
    let applications = state.engine.pending_for_hr(&actor).await?;
    Ok(Json(json!({ "applications": list_response(applications) })))
}

/// GET `/leave-applications/date-range` - HR view of every application in
/// the company touching the window.
async fn company_calendar(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Value>, ApiError> {
    let actor = auth.actor()?;
    let range = DateRange::new(query.start_date, query.end_date)?;
    let applications = state
        .engine
        .list_company_applications_in_range(&actor, range)
        .await?;
    Ok(Json(json!({
        "start_date": range.start().to_string(),
        "end_date": range.end().to_string(),
        "applications": list_response(applications),
    })))
}

/// GET `/leave-applications/{application_id}` - One application of the
/// caller's company.
async fn get_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<LeaveApplicationResponse>, ApiError> {
    let application = state
        .engine
        .get_application(LeaveApplicationId::from_uuid(application_id), auth.company_id())
        .await?;
    Ok(Json(application.into()))
}

/// POST `/leave-applications/{application_id}/manager-decision`
async fn manager_decision(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<LeaveApplicationResponse>, ApiError> {
    payload.validate()?;
    let actor = auth.actor()?;
    let application = state
        .engine
        .decide_as_manager(
            LeaveApplicationId::from_uuid(application_id),
            &actor,
            Decision::from_flag(payload.approved, payload.rejection_reason),
        )
        .await?;
    Ok(Json(application.into()))
}

/// POST `/leave-applications/{application_id}/hr-decision`
async fn hr_decision(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<LeaveApplicationResponse>, ApiError> {
    payload.validate()?;
    let actor = auth.actor()?;
    let application = state
        .engine
        .decide_as_hr(
            LeaveApplicationId::from_uuid(application_id),
            &actor,
            Decision::from_flag(payload.approved, payload.rejection_reason),
        )
        .await?;
    Ok(Json(application.into()))
}

/// POST `/leave-applications/{application_id}/cancel`
async fn cancel_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<LeaveApplicationResponse>, ApiError> {
    let actor = auth.actor()?;
    let application = state
        .engine
        .cancel_leave(LeaveApplicationId::from_uuid(application_id), &actor)
        .await?;
    Ok(Json(application.into()))
}
