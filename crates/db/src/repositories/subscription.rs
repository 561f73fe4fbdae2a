//! Subscription repository and the plan-backed entitlement gate.
//!
//! A company is entitled through its latest ACTIVE or TRIAL subscription.
//! Submitting leave is allowed on every live plan; the other capabilities
//! follow the plan's feature flags.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;
use uuid::Uuid;

use leavemark_core::engine::{Capability, Entitlement, EntitlementGate};
use leavemark_core::workflow::LeaveError;
use leavemark_shared::types::CompanyId;

use crate::entities::{plans, sea_orm_active_enums::SubscriptionStatus, subscriptions};

use super::mapping::{db_err, to_db_time, to_utc};

/// Returns whether `plan` includes `capability`.
#[must_use]
pub fn plan_allows(plan: &plans::Model, capability: Capability) -> bool {
    match capability {
        Capability::CreateLeaveApplication => true,
        Capability::MultipleLeavePolicies => plan.has_multiple_leave_policies,
        Capability::AttendanceManagement => plan.has_attendance_management,
        Capability::ReportsDownload => plan.has_reports_download,
        Capability::AttendanceRateAnalytics => plan.has_attendance_rate_analytics,
    }
}

/// Evaluates a live subscription at `now`.
fn evaluate(
    subscription: &subscriptions::Model,
    plan: Option<&plans::Model>,
    capability: Capability,
    now: DateTime<Utc>,
) -> Entitlement {
    if subscription
        .ends_at
        .is_some_and(|ends_at| to_utc(ends_at) <= now)
    {
        return Entitlement::Denied("Subscription expired".to_string());
    }
    let Some(plan) = plan else {
        return Entitlement::Denied("Subscription plan not found".to_string());
    };
    if plan_allows(plan, capability) {
        Entitlement::Allowed
    } else {
        Entitlement::Denied(format!(
            "The {} plan does not include {capability}",
            plan.name
        ))
    }
}

/// Repository for subscriptions and plans.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    db: DatabaseConnection,
}

impl SubscriptionRepository {
    /// Creates a new subscription repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a plan by name.
    pub async fn find_plan(&self, name: &str) -> Result<Option<plans::Model>, sea_orm::DbErr> {
        plans::Entity::find()
            .filter(plans::Column::Name.eq(name))
            .one(&self.db)
            .await
    }

    /// Returns the company's latest live subscription with its plan.
    pub async fn current_subscription(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<(subscriptions::Model, Option<plans::Model>)>, sea_orm::DbErr> {
        subscriptions::Entity::find()
            .filter(subscriptions::Column::CompanyId.eq(company_id.into_inner()))
            .filter(
                subscriptions::Column::Status
                    .is_in([SubscriptionStatus::Active, SubscriptionStatus::Trial]),
            )
            .order_by_desc(subscriptions::Column::CreatedAt)
            .find_also_related(plans::Entity)
            .one(&self.db)
            .await
    }

    /// Starts a subscription of `company_id` on `plan_id`.
    pub async fn subscribe(
        &self,
        company_id: CompanyId,
        plan_id: Uuid,
        status: SubscriptionStatus,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<subscriptions::Model, sea_orm::DbErr> {
        let now = Utc::now();
        subscriptions::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id.into_inner()),
            plan_id: Set(plan_id),
            status: Set(status),
            starts_at: Set(to_db_time(now)),
            ends_at: Set(ends_at.map(to_db_time)),
            created_at: Set(to_db_time(now)),
            updated_at: Set(to_db_time(now)),
        }
        .insert(&self.db)
        .await
    }
}

#[async_trait]
impl EntitlementGate for SubscriptionRepository {
    async fn check_allowed(
        &self,
        company_id: CompanyId,
        capability: Capability,
    ) -> Result<Entitlement, LeaveError> {
        let entitlement = match self.current_subscription(company_id).await.map_err(db_err)? {
            None => Entitlement::Denied("No active subscription".to_string()),
            Some((subscription, plan)) => {
                evaluate(&subscription, plan.as_ref(), capability, Utc::now())
            }
        };
        debug!(%company_id, %capability, ?entitlement, "Entitlement checked");
        Ok(entitlement)
    }
}
