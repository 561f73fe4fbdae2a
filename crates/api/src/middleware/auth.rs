//! Authentication middleware for protected routes.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, error::ApiError};
use leavemark_core::workflow::{Actor, EmployeeRole};
use leavemark_shared::types::{CompanyId, EmployeeId};
use leavemark_shared::{Claims, JwtError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "missing_token",
                "message": "Authorization header with Bearer token is required"
            })),
        )
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let (error, message) = match e {
                JwtError::Expired => ("token_expired", "Token has expired"),
                _ => ("invalid_token", "Invalid or malformed token"),
            };

            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response()
        }
    }
}

/// Extractor for the authenticated employee.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> Result<Json<Value>, ApiError> {
///     let actor = auth.actor()?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the employee ID from the claims.
    #[must_use]
    pub const fn employee_id(&self) -> EmployeeId {
        self.0.employee_id()
    }

    /// Returns the company ID from the claims.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.0.company_id()
    }

    /// Returns the raw role claim.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.0.role
    }

    /// Builds the engine's view of the caller.
    ///
    /// Tokens carrying an unknown role are refused.
    pub fn actor(&self) -> Result<Actor, ApiError> {
        let role = EmployeeRole::parse(&self.0.role)
            .ok_or_else(|| ApiError::forbidden(format!("Unknown role '{}'", self.0.role)))?;
        Ok(Actor::new(self.employee_id(), self.company_id(), role))
    }

    /// Like [`Self::actor`], but only for HR roles.
    pub fn hr_actor(&self) -> Result<Actor, ApiError> {
        let actor = self.actor()?;
        if !actor.role.is_hr() {
            return Err(ApiError::forbidden("HR role required"));
        }
        Ok(actor)
    }

    /// Returns the inner claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "unauthorized",
                        "message": "Authentication required"
                    })),
                )
            })
    }
}
