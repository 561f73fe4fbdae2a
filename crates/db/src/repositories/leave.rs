//! Postgres implementation of the leave store.
//!
//! Every write runs in its own SQL transaction:
//! - submissions lock the employee row before the overlap query, so two
//!   submissions of one employee are serialized
//! - transitions update the application with `WHERE version = $expected`
//!   and move balance days with single conditional statements
//!   (`pending = pending - d WHERE pending >= d`)
//!
//! A failed step drops the transaction, which rolls everything back.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    JoinType,
};
use tracing::{debug, warn};
use uuid::Uuid;

use leavemark_core::engine::LeaveStore;
use leavemark_core::ledger::{
    BalanceKey, LedgerError, LedgerOp, LeaveBalance, LeavePolicy, LeaveType,
};
use leavemark_core::workflow::{
    DateRange, EmployeeProfile, LeaveApplication, LeaveError, LeaveTransition, OverlapChecker,
};
use leavemark_shared::types::{CompanyId, EmployeeId, LeaveApplicationId};

use crate::entities::{
    employees, leave_applications, leave_balances, leave_policies,
    sea_orm_active_enums::{LeaveStatus as DbLeaveStatus, LeaveType as DbLeaveType},
};

use super::mapping::{
    application_to_core, balance_to_core, db_err, employee_to_core, policy_to_core, to_db_time,
};

/// Leave repository backed by Postgres.
#[derive(Debug, Clone)]
pub struct LeaveRepository {
    db: DatabaseConnection,
}

impl LeaveRepository {
    /// Creates a new leave repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn key_filter(key: &BalanceKey) -> Condition {
        Condition::all()
            .add(leave_balances::Column::EmployeeId.eq(key.employee_id.into_inner()))
            .add(leave_balances::Column::LeaveType.eq(DbLeaveType::from(key.leave_type)))
            .add(leave_balances::Column::Year.eq(key.year))
    }

    fn key_conflict() -> OnConflict {
        OnConflict::columns([
            leave_balances::Column::EmployeeId,
            leave_balances::Column::LeaveType,
            leave_balances::Column::Year,
        ])
        .to_owned()
    }

    fn new_bucket(key: &BalanceKey, total_quota: Decimal, pending: Decimal) -> leave_balances::ActiveModel {
        let now = to_db_time(Utc::now());
        leave_balances::ActiveModel {
            id: Set(Uuid::now_v7()),
            employee_id: Set(key.employee_id.into_inner()),
            leave_type: Set(key.leave_type.into()),
            year: Set(key.year),
            total_quota: Set(total_quota),
            used: Set(Decimal::ZERO),
            pending: Set(pending),
            carried_forward: Set(Decimal::ZERO),
            available: NotSet,
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    async fn load_bucket(
        txn: &DatabaseTransaction,
        key: &BalanceKey,
    ) -> Result<Option<leave_balances::Model>, LeaveError> {
        leave_balances::Entity::find()
            .filter(Self::key_filter(key))
            .one(txn)
            .await
            .map_err(db_err)
    }

    /// Inserts a missing bucket; a concurrent insert of the same key wins
    /// silently.
    async fn insert_bucket_if_missing(
        txn: &DatabaseTransaction,
        key: &BalanceKey,
        total_quota: Decimal,
    ) -> Result<(), LeaveError> {
        leave_balances::Entity::insert(Self::new_bucket(key, total_quota, Decimal::ZERO))
            .on_conflict(Self::key_conflict().do_nothing().to_owned())
            .exec_without_returning(txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Applies one ledger move with a single statement and returns the
    /// resulting bucket.
    async fn apply_ledger(
        txn: &DatabaseTransaction,
        key: &BalanceKey,
        op: LedgerOp,
    ) -> Result<LeaveBalance, LeaveError> {
        let days = op.days();
        if days <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveDays(days).into());
        }
        let now = to_db_time(Utc::now());

        match op {
            LedgerOp::Reserve(_) => {
                leave_balances::Entity::insert(Self::new_bucket(key, Decimal::ZERO, days))
                    .on_conflict(
                        Self::key_conflict()
                            .value(
                                leave_balances::Column::Pending,
                                Expr::col((leave_balances::Entity, leave_balances::Column::Pending))
                                    .add(days),
                            )
                            .value(leave_balances::Column::UpdatedAt, Expr::value(now))
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await
                    .map_err(db_err)?;
            }
            LedgerOp::Commit(_) | LedgerOp::Release(_) => {
                let mut update = leave_balances::Entity::update_many()
                    .col_expr(
                        leave_balances::Column::Pending,
                        Expr::col(leave_balances::Column::Pending).sub(days),
                    )
                    .col_expr(leave_balances::Column::UpdatedAt, Expr::value(now));
                if matches!(op, LedgerOp::Commit(_)) {
                    update = update.col_expr(
                        leave_balances::Column::Used,
                        Expr::col(leave_balances::Column::Used).add(days),
                    );
                }
                let result = update
                    .filter(Self::key_filter(key))
                    .filter(leave_balances::Column::Pending.gte(days))
                    .exec(txn)
                    .await
                    .map_err(db_err)?;

                if result.rows_affected == 0 {
                    return Err(match Self::load_bucket(txn, key).await? {
                        None => LedgerError::BucketMissing(*key),
                        Some(row) => LedgerError::Underflow {
                            key: *key,
                            field: "pending",
                            current: row.pending,
                            requested: days,
                        },
                    }
                    .into());
                }
            }
        }

        let row = Self::load_bucket(txn, key)
            .await?
            .ok_or(LedgerError::BucketMissing(*key))?;
        debug!(balance = %key, op = op.name(), days = %days, "Ledger move applied");
        Ok(balance_to_core(row))
    }

    fn application_active_model(app: &LeaveApplication) -> leave_applications::ActiveModel {
        leave_applications::ActiveModel {
            id: Set(app.id.into_inner()),
            employee_id: Set(app.employee_id.into_inner()),
            company_id: Set(app.company_id.into_inner()),
            leave_type: Set(app.leave_type.into()),
            start_date: Set(app.start_date),
            end_date: Set(app.end_date),
            number_of_days: Set(app.number_of_days),
            is_half_day: Set(app.is_half_day),
            reason: Set(app.reason.clone()),
            attachment_ref: Set(app.attachment_ref.clone()),
            status: Set(app.status.into()),
            requires_hr_approval: Set(app.requires_hr_approval),
            reviewing_manager_id: Set(app.reviewing_manager_id.map(EmployeeId::into_inner)),
            manager_approved_by: Set(app.manager_approval.map(|s| s.approver_id.into_inner())),
            manager_approved_at: Set(app.manager_approval.map(|s| to_db_time(s.approved_at))),
            hr_approved_by: Set(app.hr_approval.map(|s| s.approver_id.into_inner())),
            hr_approved_at: Set(app.hr_approval.map(|s| to_db_time(s.approved_at))),
            rejected_by: Set(app.rejection.as_ref().map(|r| r.rejected_by.into_inner())),
            rejection_reason: Set(app.rejection.as_ref().and_then(|r| r.reason.clone())),
            rejected_at: Set(app.rejection.as_ref().map(|r| to_db_time(r.rejected_at))),
            version: Set(app.version),
            created_at: Set(to_db_time(app.created_at)),
            updated_at: Set(to_db_time(app.updated_at)),
        }
    }

    /// Columns a transition may change. Identity, dates and the approval
    /// chain configuration are fixed at submission.
    fn transition_active_model(app: &LeaveApplication) -> leave_applications::ActiveModel {
        let full = Self::application_active_model(app);
        leave_applications::ActiveModel {
            status: full.status,
            manager_approved_by: full.manager_approved_by,
            manager_approved_at: full.manager_approved_at,
            hr_approved_by: full.hr_approved_by,
            hr_approved_at: full.hr_approved_at,
            rejected_by: full.rejected_by,
            rejection_reason: full.rejection_reason,
            rejected_at: full.rejected_at,
            version: full.version,
            updated_at: full.updated_at,
            ..Default::default()
        }
    }

    async fn list_applications(
        &self,
        condition: Condition,
        newest_first: bool,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        let query = leave_applications::Entity::find().filter(condition);
        let query = if newest_first {
            query.order_by_desc(leave_applications::Column::CreatedAt)
        } else {
            query.order_by_asc(leave_applications::Column::CreatedAt)
        };
        let rows = query.all(&self.db).await.map_err(db_err)?;
        Ok(rows.into_iter().map(application_to_core).collect())
    }
}

#[async_trait]
impl LeaveStore for LeaveRepository {
    async fn find_employee(&self, id: EmployeeId) -> Result<Option<EmployeeProfile>, LeaveError> {
        let row = employees::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(employee_to_core))
    }

    async fn find_policy(
        &self,
        company_id: CompanyId,
        leave_type: LeaveType,
    ) -> Result<Option<LeavePolicy>, LeaveError> {
        let row = leave_policies::Entity::find()
            .filter(leave_policies::Column::CompanyId.eq(company_id.into_inner()))
            .filter(leave_policies::Column::LeaveType.eq(DbLeaveType::from(leave_type)))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(policy_to_core))
    }

    async fn list_active_policies(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<LeavePolicy>, LeaveError> {
        let rows = leave_policies::Entity::find()
            .filter(leave_policies::Column::CompanyId.eq(company_id.into_inner()))
            .filter(leave_policies::Column::Active.eq(true))
            .order_by_asc(leave_policies::Column::LeaveType)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(policy_to_core).collect())
    }

    async fn find_application(
        &self,
        id: LeaveApplicationId,
    ) -> Result<Option<LeaveApplication>, LeaveError> {
        let row = leave_applications::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(application_to_core))
    }

    async fn insert_application(
        &self,
        application: &LeaveApplication,
        reserve: LedgerOp,
    ) -> Result<LeaveBalance, LeaveError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Serializes submissions of one employee until commit without
        // blocking foreign-key checks against the row.
        employees::Entity::find_by_id(application.employee_id.into_inner())
            .lock(LockType::NoKeyUpdate)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LeaveError::EmployeeNotFound(application.employee_id))?;

        let existing: Vec<LeaveApplication> = leave_applications::Entity::find()
            .filter(
                leave_applications::Column::EmployeeId.eq(application.employee_id.into_inner()),
            )
            .filter(
                leave_applications::Column::Status
                    .is_in([DbLeaveStatus::Pending, DbLeaveStatus::Approved]),
            )
            .filter(leave_applications::Column::StartDate.lte(application.end_date))
            .filter(leave_applications::Column::EndDate.gte(application.start_date))
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(application_to_core)
            .collect();
        let conflicts = OverlapChecker::find_conflicts(
            &existing,
            application.employee_id,
            application.date_range(),
            None,
        );
        OverlapChecker::ensure_free(&conflicts)?;

        leave_applications::Entity::insert(Self::application_active_model(application))
            .exec_without_returning(&txn)
            .await
            .map_err(db_err)?;

        let balance = Self::apply_ledger(&txn, &application.balance_key(), reserve).await?;

        txn.commit().await.map_err(db_err)?;
        Ok(balance)
    }

    async fn apply_transition(
        &self,
        transition: &LeaveTransition,
    ) -> Result<Option<LeaveBalance>, LeaveError> {
        let application = &transition.application;
        let txn = self.db.begin().await.map_err(db_err)?;

        let result = leave_applications::Entity::update_many()
            .set(Self::transition_active_model(application))
            .filter(leave_applications::Column::Id.eq(application.id.into_inner()))
            .filter(leave_applications::Column::Version.eq(transition.expected_version))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            let exists = leave_applications::Entity::find_by_id(application.id.into_inner())
                .one(&txn)
                .await
                .map_err(db_err)?
                .is_some();
            if !exists {
                return Err(LeaveError::ApplicationNotFound(application.id));
            }
            warn!(
                application_id = %application.id,
                expected_version = transition.expected_version,
                "Version check failed"
            );
            return Err(LeaveError::ConcurrentModification(application.id));
        }

        let balance = match transition.ledger {
            Some(op) => Some(Self::apply_ledger(&txn, &application.balance_key(), op).await?),
            None => None,
        };

        txn.commit().await.map_err(db_err)?;
        Ok(balance)
    }

    async fn list_applications_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        self.list_applications(
            Condition::all()
                .add(leave_applications::Column::EmployeeId.eq(employee_id.into_inner())),
            true,
        )
        .await
    }

    async fn list_pending_for_manager(
        &self,
        manager_id: EmployeeId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        self.list_applications(
            Condition::all()
                .add(leave_applications::Column::Status.eq(DbLeaveStatus::Pending))
                .add(leave_applications::Column::ReviewingManagerId.eq(manager_id.into_inner()))
                .add(leave_applications::Column::ManagerApprovedAt.is_null()),
            false,
        )
        .await
    }

    async fn list_pending_for_hr(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        self.list_applications(
            Condition::all()
                .add(leave_applications::Column::CompanyId.eq(company_id.into_inner()))
                .add(leave_applications::Column::Status.eq(DbLeaveStatus::Pending))
                .add(leave_applications::Column::RequiresHrApproval.eq(true))
                .add(
                    Condition::any()
                        .add(leave_applications::Column::ReviewingManagerId.is_null())
                        .add(leave_applications::Column::ManagerApprovedAt.is_not_null()),
                ),
            false,
        )
        .await
    }

    async fn list_applications_in_range(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        let rows = leave_applications::Entity::find()
            .filter(leave_applications::Column::CompanyId.eq(company_id.into_inner()))
            .filter(leave_applications::Column::StartDate.lte(range.end()))
            .filter(leave_applications::Column::EndDate.gte(range.start()))
            .order_by_asc(leave_applications::Column::StartDate)
            .order_by_asc(leave_applications::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(application_to_core).collect())
    }

    async fn find_balance(&self, key: &BalanceKey) -> Result<Option<LeaveBalance>, LeaveError> {
        let row = leave_balances::Entity::find()
            .filter(Self::key_filter(key))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(balance_to_core))
    }

    async fn list_balances(
        &self,
        employee_id: EmployeeId,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let rows = leave_balances::Entity::find()
            .filter(leave_balances::Column::EmployeeId.eq(employee_id.into_inner()))
            .filter(leave_balances::Column::Year.eq(year))
            .order_by_asc(leave_balances::Column::LeaveType)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(balance_to_core).collect())
    }

    async fn list_company_balances(
        &self,
        company_id: CompanyId,
        leave_type: LeaveType,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let rows = leave_balances::Entity::find()
            .join(JoinType::InnerJoin, leave_balances::Relation::Employees.def())
            .filter(employees::Column::CompanyId.eq(company_id.into_inner()))
            .filter(leave_balances::Column::LeaveType.eq(DbLeaveType::from(leave_type)))
            .filter(leave_balances::Column::Year.eq(year))
            .order_by_asc(leave_balances::Column::EmployeeId)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(balance_to_core).collect())
    }

    async fn ensure_quota(
        &self,
        key: &BalanceKey,
        quota: Decimal,
    ) -> Result<LeaveBalance, LeaveError> {
        if quota < Decimal::ZERO {
            return Err(LedgerError::NegativeCounter {
                key: *key,
                field: "total_quota",
                value: quota,
            }
            .into());
        }
        let txn = self.db.begin().await.map_err(db_err)?;
        Self::insert_bucket_if_missing(&txn, key, quota).await?;
        leave_balances::Entity::update_many()
            .col_expr(leave_balances::Column::TotalQuota, Expr::value(quota))
            .col_expr(
                leave_balances::Column::UpdatedAt,
                Expr::value(to_db_time(Utc::now())),
            )
            .filter(Self::key_filter(key))
            .filter(leave_balances::Column::TotalQuota.eq(Decimal::ZERO))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let row = Self::load_bucket(&txn, key)
            .await?
            .ok_or(LedgerError::BucketMissing(*key))?;
        txn.commit().await.map_err(db_err)?;
        Ok(balance_to_core(row))
    }

    async fn set_carried_forward(
        &self,
        key: &BalanceKey,
        quota_if_missing: Decimal,
        carried_forward: Decimal,
    ) -> Result<LeaveBalance, LeaveError> {
        if carried_forward < Decimal::ZERO {
            return Err(LedgerError::NegativeCounter {
                key: *key,
                field: "carried_forward",
                value: carried_forward,
            }
            .into());
        }
        let txn = self.db.begin().await.map_err(db_err)?;
        Self::insert_bucket_if_missing(&txn, key, quota_if_missing).await?;
        leave_balances::Entity::update_many()
            .col_expr(
                leave_balances::Column::CarriedForward,
                Expr::value(carried_forward),
            )
            .col_expr(
                leave_balances::Column::UpdatedAt,
                Expr::value(to_db_time(Utc::now())),
            )
            .filter(Self::key_filter(key))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let row = Self::load_bucket(&txn, key)
            .await?
            .ok_or(LedgerError::BucketMissing(*key))?;
        txn.commit().await.map_err(db_err)?;
        Ok(balance_to_core(row))
    }
}
