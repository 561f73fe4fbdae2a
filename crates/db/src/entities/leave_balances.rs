//! `SeaORM` Entity for leave_balances table.
//!
//! `available` is a stored generated column. Never set it from an
//! `ActiveModel`; leave it `NotSet`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::LeaveType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "leave_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub year: i32,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub total_quota: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub used: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub pending: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub carried_forward: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub available: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employees::Entity",
        from = "Column::EmployeeId",
        to = "super::employees::Column::Id"
    )]
    Employees,
}

impl Related<super::employees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
