//! `SeaORM` Entity for the Quick-Checks sequence counter.
//!
//! A single-row table. `locked_until` implements the short-lived lock:
//! a reservation first claims the row by setting `locked_until` in the
//! future, and a claim whose timestamp has passed is stale and may be
//! taken over.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "check_sequence")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i16,
    pub next_number: i64,
    pub locked_until: Option<DateTimeWithTimeZone>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
