//! `SeaORM` Entity for the central payment index table.
//!
//! One denormalized row per displayable request across all tenants.
//! The rebuild path writes into `payment_index_shadow` (same shape) and
//! swaps it in; both names bind to this entity via `Entity::table_name`
//! overrides in raw SQL, so only the primary table is modeled here.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_index")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_id: i64,
    pub kind: String,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    pub title: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub category: Option<String>,
    pub method: Option<String>,
    pub wordcamp_name: Option<String>,
    pub date_paid: Option<Date>,
    pub sponsor_name: Option<String>,
    pub due_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
