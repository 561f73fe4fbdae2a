//! Integration tests for the plan-backed entitlement gate.

mod common;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use leavemark_core::engine::{Capability, Entitlement, EntitlementGate};
use leavemark_db::entities::{companies, sea_orm_active_enums::SubscriptionStatus};
use leavemark_db::SubscriptionRepository;
use leavemark_shared::types::CompanyId;

use common::connect;

async fn create_company(db: &sea_orm::DatabaseConnection) -> CompanyId {
    let company = CompanyId::new();
    companies::ActiveModel {
        id: Set(company.into_inner()),
        name: Set(format!("Billing Co {company}")),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create company");
    company
}

async fn cleanup_company(db: &sea_orm::DatabaseConnection, company: CompanyId) {
    companies::Entity::delete_by_id(company.into_inner())
        .exec(db)
        .await
        .ok();
}

#[tokio::test]
async fn test_seeded_plans() {
    let Some(db) = connect().await else { return };
    let repo = SubscriptionRepository::new(db);

    let free = repo.find_plan("FREE").await.unwrap().expect("FREE plan");
    assert_eq!(free.max_employees, Some(10));
    assert!(!free.has_reports_download);

    let enterprise = repo
        .find_plan("ENTERPRISE")
        .await
        .unwrap()
        .expect("ENTERPRISE plan");
    assert_eq!(enterprise.max_employees, None);
    assert!(enterprise.has_attendance_rate_analytics);
}

#[tokio::test]
async fn test_company_without_subscription_is_denied() {
    let Some(db) = connect().await else { return };
    let company = create_company(&db).await;
    let repo = SubscriptionRepository::new(db.clone());

    let result = repo
        .check_allowed(company, Capability::CreateLeaveApplication)
        .await
        .unwrap();
    assert_eq!(
        result,
        Entitlement::Denied("No active subscription".to_string())
    );

    cleanup_company(&db, company).await;
}

#[tokio::test]
async fn test_trial_subscription_follows_plan_flags() {
    let Some(db) = connect().await else { return };
    let company = create_company(&db).await;
    let repo = SubscriptionRepository::new(db.clone());

    let free = repo.find_plan("FREE").await.unwrap().unwrap();
    repo.subscribe(company, free.id, SubscriptionStatus::Trial, None)
        .await
        .unwrap();

    assert_eq!(
        repo.check_allowed(company, Capability::CreateLeaveApplication)
            .await
            .unwrap(),
        Entitlement::Allowed
    );
    assert!(matches!(
        repo.check_allowed(company, Capability::ReportsDownload)
            .await
            .unwrap(),
        Entitlement::Denied(_)
    ));

    cleanup_company(&db, company).await;
}

#[tokio::test]
async fn test_latest_live_subscription_wins() {
    let Some(db) = connect().await else { return };
    let company = create_company(&db).await;
    let repo = SubscriptionRepository::new(db.clone());

    let free = repo.find_plan("FREE").await.unwrap().unwrap();
    let professional = repo.find_plan("PROFESSIONAL").await.unwrap().unwrap();
    repo.subscribe(company, free.id, SubscriptionStatus::Active, None)
        .await
        .unwrap();
    repo.subscribe(company, professional.id, SubscriptionStatus::Active, None)
        .await
        .unwrap();

    assert_eq!(
        repo.check_allowed(company, Capability::ReportsDownload)
            .await
            .unwrap(),
        Entitlement::Allowed
    );

    cleanup_company(&db, company).await;
}

#[tokio::test]
async fn test_lapsed_or_cancelled_subscription_is_denied() {
    let Some(db) = connect().await else { return };
    let company = create_company(&db).await;
    let repo = SubscriptionRepository::new(db.clone());

    let starter = repo.find_plan("STARTER").await.unwrap().unwrap();
    let lapsed = repo
        .subscribe(company, starter.id, SubscriptionStatus::Active, None)
        .await
        .unwrap();
    // Backdate so the end date can precede now.
    let mut active: leavemark_db::entities::subscriptions::ActiveModel = lapsed.into();
    active.starts_at = Set((Utc::now() - Duration::days(60)).fixed_offset());
    active.ends_at = Set(Some((Utc::now() - Duration::days(1)).fixed_offset()));
    active.update(&db).await.unwrap();

    assert_eq!(
        repo.check_allowed(company, Capability::CreateLeaveApplication)
            .await
            .unwrap(),
        Entitlement::Denied("Subscription expired".to_string())
    );

    let other = create_company(&db).await;
    repo.subscribe(other, starter.id, SubscriptionStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(
        repo.check_allowed(other, Capability::CreateLeaveApplication)
            .await
            .unwrap(),
        Entitlement::Denied("No active subscription".to_string())
    );

    cleanup_company(&db, company).await;
    cleanup_company(&db, other).await;
}
